//! Spanlight Core - Platform-agnostic span annotation engine
//!
//! This crate owns the span bookkeeping for annotated text fields: the
//! store that keeps spans per field, the boundary snapping applied to raw
//! selections, overlap level assignment, and the layout engine that projects
//! spans onto highlight ranges and label chips. Hosts (the terminal CLI and
//! the browser build) plug in through the traits in [`layout::host`].

pub mod answers;
pub mod config;
pub mod cursor;
pub mod error;
pub mod layout;
pub mod markup;
pub mod model;
pub mod search;
pub mod snapping;
pub mod store;
pub mod text;

pub use answers::{from_json, to_answers, to_json, to_seeds, AnswerDocument, LabelOption, SpanAnswer};
pub use config::{Configuration, LayoutOptions};
pub use cursor::CursorState;
pub use error::{Error, Result};
pub use layout::host::{Chip, HighlightSurface, LayoutHost, RawSelection, Rect, SearchSurface};
pub use layout::{highlight_name, LayoutEngine, RenderFrame};
pub use model::{Document, Entity, Node, Overlap, OverlappedSpan, Span, SpanKey, SpanSeed, TextRange, TextSelection};
pub use search::{QueryHighlighter, SearchMode, SEARCH_HIGHLIGHT};
pub use store::{shared, SharedStore, SpanStore};
