use super::{Entity, Node};
use crate::text;

/// A raw candidate span straight from user interaction
///
/// Offsets are signed because hosts may report positions before the start
/// of the field; the store rejects those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSelection {
    pub from: isize,
    pub to: isize,
    pub text: String,
    pub entity: Entity,
    pub node: Node,
}

impl TextSelection {
    /// Selection over `node` whose text is read from the field content
    pub fn over(node: &Node, from: isize, to: isize, entity: Entity) -> Self {
        let text = if from >= 0 && to >= 0 {
            text::slice_chars(node.text(), from as usize, to as usize)
        } else {
            String::new()
        };
        Self {
            from,
            to,
            text,
            entity,
            node: node.clone(),
        }
    }
}
