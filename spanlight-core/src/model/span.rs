use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Entity, TextRange};
use crate::text;

/// A text field that spans are attached to
///
/// Two nodes are the same node when their ids match; the text handle is
/// shared so cloning spans never copies field content.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    text: Arc<str>,
    len: usize,
}

impl Node {
    pub fn new(id: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let len = text::char_len(&text);
        Self {
            id: id.into(),
            text,
            len,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the field text in chars
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

/// Identity of a stored span
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanKey {
    pub from: usize,
    pub to: usize,
    pub entity_id: String,
    pub node_id: String,
}

/// A normalized annotated interval of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
    pub entity: Entity,
    pub text: String,
    pub node: Node,
}

impl Span {
    /// Build a span over `node`, taking its text from the field content
    pub fn new(node: &Node, from: usize, to: usize, entity: Entity) -> Self {
        Self {
            from,
            to,
            text: text::slice_chars(node.text(), from, to),
            entity,
            node: node.clone(),
        }
    }

    pub fn key(&self) -> SpanKey {
        SpanKey {
            from: self.from,
            to: self.to,
            entity_id: self.entity.id.clone(),
            node_id: self.node.id.clone(),
        }
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.from, self.to)
    }

    /// Same field and intersecting intervals
    pub fn intersects(&self, other: &Span) -> bool {
        self.node == other.node && self.range().intersects(&other.range())
    }
}

/// Rendering lane of a span; `index` is always `level - 1`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Overlap {
    pub level: usize,
    pub index: usize,
}

impl Overlap {
    pub fn at_level(level: usize) -> Self {
        let level = level.max(1);
        Self {
            level,
            index: level - 1,
        }
    }
}

/// A stored span together with its derived lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlappedSpan {
    pub span: Span,
    pub overlap: Overlap,
}

impl OverlappedSpan {
    pub fn key(&self) -> SpanKey {
        self.span.key()
    }
}

/// A previously persisted span, before it is bound to a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanSeed {
    pub from: usize,
    pub to: usize,
    pub entity: Entity,
}

impl SpanSeed {
    pub fn into_span(self, node: &Node) -> Span {
        Span::new(node, self.from, self.to, self.entity)
    }
}
