//! Capabilities a host platform provides to the layout engine and the
//! query highlighter.
//!
//! Node ids name text containers. Offsets are char offsets into the full
//! text of a container; hosts translate to their native units.

use serde::{Deserialize, Serialize};

use crate::model::{Entity, OverlappedSpan, TextRange};

/// Axis-aligned box in host units
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// The user's current selection inside a container
///
/// `anchor` is where the selection started and `focus` where it ended, so
/// `focus` may come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSelection {
    pub anchor: usize,
    pub focus: usize,
}

impl RawSelection {
    pub fn range(&self) -> TextRange {
        TextRange::new(self.anchor, self.focus)
    }
}

/// A positioned label attached to one span
#[derive(Debug, Clone, PartialEq)]
pub struct Chip {
    pub span: OverlappedSpan,
    pub entity: Entity,
    /// Position relative to the container
    pub bounds: Rect,
    pub hovered: bool,
}

/// Named multi-range highlights over text containers
///
/// The same name may be registered for several nodes; hosts keep the
/// union so one style rule covers every field.
pub trait HighlightSurface {
    /// Whether native range highlights are available
    fn supports_highlights(&self) -> bool;

    /// Full text of a container, `None` when it does not exist
    fn text(&self, node: &str) -> Option<String>;

    /// Replace the ranges `node` contributes to highlight `name`
    fn register_highlight(&mut self, node: &str, name: &str, ranges: &[TextRange]);

    /// Drop the ranges `node` contributes to highlight `name`
    fn clear_highlight(&mut self, node: &str, name: &str);
}

/// Everything the layout engine needs from a host
pub trait LayoutHost: HighlightSurface {
    /// Box of the container itself
    fn container_box(&self, node: &str) -> Option<Rect>;

    /// Box covering chars `from..to` of the container
    fn range_box(&self, node: &str, from: usize, to: usize) -> Option<Rect>;

    /// Current user selection, if it lies inside the container
    fn selection(&self, node: &str) -> Option<RawSelection>;

    fn clear_selection(&mut self);

    fn set_line_height(&mut self, node: &str, line_height: f64);

    /// Replace every chip of the container
    fn render_chips(&mut self, node: &str, chips: &[Chip]);
}

/// Markup access used when native highlights are missing
pub trait SearchSurface: HighlightSurface {
    fn markup(&self, field: &str) -> Option<String>;

    fn set_markup(&mut self, field: &str, markup: &str);
}
