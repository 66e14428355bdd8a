mod document;
mod entity;
mod selection;
mod span;
mod text_range;

pub use document::Document;
pub use entity::Entity;
pub use selection::TextSelection;
pub use span::{Node, Overlap, OverlappedSpan, Span, SpanKey, SpanSeed};
pub use text_range::TextRange;
