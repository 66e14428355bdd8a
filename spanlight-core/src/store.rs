//! The span store: canonical spans of every mounted field.
//!
//! One store is shared by all fields of a record; spans are partitioned by
//! their node id. Operations never fail. Anything that leaves the store
//! untouched (invalid offsets, duplicates, unknown spans) returns `false`.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::Configuration;
use crate::model::{Entity, Overlap, OverlappedSpan, Span, SpanKey, TextSelection};
use crate::snapping;
use crate::text;

/// Store handle shared between the fields of one record
pub type SharedStore = Rc<RefCell<SpanStore>>;

/// Wrap a store so several layout engines can share it
pub fn shared(store: SpanStore) -> SharedStore {
    Rc::new(RefCell::new(store))
}

/// Spans of all fields, in insertion order
#[derive(Debug, Clone, Default)]
pub struct SpanStore {
    spans: Vec<OverlappedSpan>,
}

impl SpanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw selection according to `config` and store it
    pub fn add_span(&mut self, selection: TextSelection, config: &Configuration) -> bool {
        if selection.from < 0 || selection.to < 0 {
            debug!(from = selection.from, to = selection.to, "rejecting selection with negative offset");
            return false;
        }

        let TextSelection {
            from,
            to,
            text: selected,
            entity,
            node,
        } = selection;
        let (mut from, mut to) = (from as usize, to as usize);

        if !config.allow_character {
            if text::is_blank(&selected) {
                debug!(node = %node.id, from, to, "rejecting whitespace-only selection");
                return false;
            }
            let snapped = snapping::snap(node.text(), from, to, &selected);
            trace!(from, to, snapped_from = snapped.from, snapped_to = snapped.to, "snapped selection");
            from = snapped.from;
            to = snapped.to;
        }

        let len = node.len();
        let (from, to) = (from.min(len), to.min(len));
        if from >= to {
            debug!(node = %node.id, from, to, "rejecting empty selection");
            return false;
        }

        let span = Span::new(&node, from, to, entity);

        if !config.allow_overlap {
            let before = self.spans.len();
            self.spans.retain(|stored| !stored.span.intersects(&span));
            let superseded = before - self.spans.len();
            if superseded > 0 {
                debug!(node = %span.node.id, superseded, "new span supersedes overlapping spans");
            }
        }

        self.select(span)
    }

    /// Store an already shaped span without snapping
    ///
    /// Offsets are clamped to the field text. The lane is one above the
    /// highest lane among the stored spans it intersects.
    pub fn select(&mut self, span: Span) -> bool {
        let Span {
            from,
            to,
            entity,
            node,
            ..
        } = span;
        let len = node.len();
        let (from, to) = (from.min(len), to.min(len));
        if from >= to {
            debug!(node = %node.id, from, to, "rejecting empty span");
            return false;
        }

        let span = Span::new(&node, from, to, entity);
        let key = span.key();
        if self.contains(&key) {
            trace!(?key, "span already stored");
            return false;
        }

        let level = 1 + self
            .spans
            .iter()
            .filter(|stored| stored.span.intersects(&span))
            .map(|stored| stored.overlap.level)
            .max()
            .unwrap_or(0);
        trace!(?key, level, "storing span");

        self.spans.push(OverlappedSpan {
            span,
            overlap: Overlap::at_level(level),
        });
        true
    }

    /// Bulk import; lanes follow the order of `spans`
    pub fn load_spans<I>(&mut self, spans: I) -> usize
    where
        I: IntoIterator<Item = Span>,
    {
        let mut stored = 0;
        for span in spans {
            if self.select(span) {
                stored += 1;
            }
        }
        stored
    }

    /// Relabel a stored span in place
    ///
    /// When another span already carries the new label over the same
    /// interval, the relabeled span merges into it.
    pub fn replace_entity(&mut self, span: &Span, entity: Entity) -> bool {
        let key = span.key();
        let Some(pos) = self.position(&key) else {
            debug!(?key, "relabel of unknown span ignored");
            return false;
        };

        let target = SpanKey {
            entity_id: entity.id.clone(),
            ..key.clone()
        };
        if target != key && self.contains(&target) {
            debug!(?key, entity = %entity.id, "relabel collides with existing span, merging");
            self.spans.remove(pos);
            self.relevel(&key.node_id);
            return true;
        }

        self.spans[pos].span.entity = entity;
        true
    }

    /// Remove a span and recompute the lanes of its field
    pub fn remove_span(&mut self, span: &Span) -> bool {
        let key = span.key();
        let Some(pos) = self.position(&key) else {
            debug!(?key, "removal of unknown span ignored");
            return false;
        };
        self.spans.remove(pos);
        self.relevel(&key.node_id);
        true
    }

    /// Drop every span of every field
    pub fn clear(&mut self) {
        self.spans.clear();
    }

    /// Drop the spans of one field
    pub fn clear_node(&mut self, node_id: &str) -> usize {
        let before = self.spans.len();
        self.spans.retain(|stored| stored.span.node.id != node_id);
        before - self.spans.len()
    }

    /// Snapshot of all stored spans
    pub fn spans(&self) -> Vec<OverlappedSpan> {
        self.spans.clone()
    }

    /// Snapshot of the spans of one field
    pub fn spans_for(&self, node_id: &str) -> Vec<OverlappedSpan> {
        self.spans
            .iter()
            .filter(|stored| stored.span.node.id == node_id)
            .cloned()
            .collect()
    }

    /// Highest lane used in a field, 0 when it has no spans
    pub fn max_level(&self, node_id: &str) -> usize {
        self.spans
            .iter()
            .filter(|stored| stored.span.node.id == node_id)
            .map(|stored| stored.overlap.level)
            .max()
            .unwrap_or(0)
    }

    pub fn contains(&self, key: &SpanKey) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn position(&self, key: &SpanKey) -> Option<usize> {
        self.spans.iter().position(|stored| {
            stored.span.from == key.from
                && stored.span.to == key.to
                && stored.span.entity.id == key.entity_id
                && stored.span.node.id == key.node_id
        })
    }

    /// Re-add the spans of a field in their current order so lanes compact
    fn relevel(&mut self, node_id: &str) {
        let (field, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.spans)
            .into_iter()
            .partition(|stored| stored.span.node.id == node_id);
        self.spans = rest;
        for stored in field {
            self.select(stored.span);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::Node;

    const TEXT: &str = "This is Lorem Ipsum? This is a sentence.";

    fn node() -> Node {
        Node::new("field", TEXT)
    }

    fn per() -> Entity {
        Entity::new("per", "PER")
    }

    fn loc() -> Entity {
        Entity::new("loc", "LOC")
    }

    fn words() -> Configuration {
        Configuration::default()
    }

    fn overlapping_chars() -> Configuration {
        Configuration {
            allow_overlap: true,
            allow_character: true,
            ..Configuration::default()
        }
    }

    fn levels(store: &SpanStore) -> Vec<(usize, usize, String, usize)> {
        store
            .spans()
            .into_iter()
            .map(|s| (s.span.from, s.span.to, s.span.entity.id, s.overlap.level))
            .collect()
    }

    #[test]
    fn test_adding_same_span_twice_keeps_one() {
        let mut store = SpanStore::new();
        let config = overlapping_chars();
        assert!(store.add_span(TextSelection::over(&node(), 0, 4, per()), &config));
        assert!(!store.add_span(TextSelection::over(&node(), 0, 4, per()), &config));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_snapping_normalizes_selections() {
        let mut store = SpanStore::new();
        store.add_span(TextSelection::over(&node(), 5, 8, per()), &words());
        store.add_span(TextSelection::over(&node(), 21, 23, loc()), &words());

        let spans = store.spans();
        assert_eq!((spans[0].span.from, spans[0].span.to), (5, 7));
        assert_eq!(spans[0].span.text, "is");
        assert_eq!(spans[1].span.text, "This");
    }

    #[test]
    fn test_partial_word_expands() {
        let mut store = SpanStore::new();
        store.add_span(TextSelection::over(&node(), 5, 9, per()), &words());
        let span = &store.spans()[0].span;
        assert_eq!((span.from, span.to, span.text.as_str()), (5, 13, "is Lorem"));
    }

    #[test]
    fn test_bounded_phrase_is_kept() {
        let mut store = SpanStore::new();
        store.add_span(TextSelection::over(&node(), 8, 20, per()), &words());
        assert_eq!(store.spans()[0].span.text, "Lorem Ipsum?");
    }

    #[test]
    fn test_whitespace_selection_depends_on_character_mode() {
        let mut store = SpanStore::new();
        assert!(!store.add_span(TextSelection::over(&node(), 4, 5, per()), &words()));
        assert!(store.is_empty());

        assert!(store.add_span(TextSelection::over(&node(), 4, 5, per()), &overlapping_chars()));
        let span = &store.spans()[0].span;
        assert_eq!((span.from, span.to, span.text.as_str()), (4, 5, " "));
    }

    #[test]
    fn test_negative_offsets_are_rejected() {
        let mut store = SpanStore::new();
        for config in [words(), overlapping_chars()] {
            assert!(!store.add_span(TextSelection::over(&node(), -1, 4, per()), &config));
            assert!(!store.add_span(TextSelection::over(&node(), 2, -3, per()), &config));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_overlap_exclusion_supersedes() {
        let mut store = SpanStore::new();
        let config = Configuration {
            allow_character: true,
            ..Configuration::default()
        };
        store.add_span(TextSelection::over(&node(), 0, 7, per()), &config);
        store.add_span(TextSelection::over(&node(), 5, 13, loc()), &config);

        assert_eq!(levels(&store), vec![(5, 13, "loc".to_string(), 1)]);
    }

    #[test]
    fn test_overlap_exclusion_same_range_three_times() {
        let mut store = SpanStore::new();
        for _ in 0..3 {
            store.add_span(TextSelection::over(&node(), 8, 13, per()), &words());
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_overlap_stacking_assigns_levels() {
        let mut store = SpanStore::new();
        let config = overlapping_chars();
        store.add_span(TextSelection::over(&node(), 8, 13, per()), &config);
        store.add_span(TextSelection::over(&node(), 8, 13, loc()), &config);
        store.add_span(TextSelection::over(&node(), 21, 25, per()), &config);

        assert_eq!(
            levels(&store),
            vec![
                (8, 13, "per".to_string(), 1),
                (8, 13, "loc".to_string(), 2),
                (21, 25, "per".to_string(), 1),
            ]
        );
        assert_eq!(store.max_level("field"), 2);
    }

    #[test]
    fn test_touching_spans_do_not_stack() {
        let mut store = SpanStore::new();
        let config = overlapping_chars();
        store.add_span(TextSelection::over(&node(), 0, 4, per()), &config);
        store.add_span(TextSelection::over(&node(), 4, 7, loc()), &config);
        assert_eq!(store.max_level("field"), 1);
    }

    #[test]
    fn test_removal_relevels() {
        let mut store = SpanStore::new();
        let config = overlapping_chars();
        store.add_span(TextSelection::over(&node(), 8, 13, per()), &config);
        store.add_span(TextSelection::over(&node(), 8, 13, loc()), &config);

        let lower = store.spans()[0].span.clone();
        assert!(store.remove_span(&lower));
        assert_eq!(levels(&store), vec![(8, 13, "loc".to_string(), 1)]);
        assert!(!store.remove_span(&lower));
    }

    #[test]
    fn test_load_spans_clamps_out_of_range() {
        let mut store = SpanStore::new();
        let len = node().len();
        let span = Span {
            from: 31,
            to: 500,
            entity: per(),
            text: String::new(),
            node: node(),
        };
        assert_eq!(store.load_spans(vec![span]), 1);

        let stored = &store.spans()[0].span;
        assert_eq!((stored.from, stored.to), (31, len));
        assert_eq!(stored.text, "sentence.");
    }

    #[test]
    fn test_load_spans_levels_follow_list_order() {
        let mut store = SpanStore::new();
        let n = node();
        store.load_spans(vec![
            Span::new(&n, 0, 20, per()),
            Span::new(&n, 8, 13, loc()),
            Span::new(&n, 5, 7, loc()),
        ]);
        let lanes: Vec<usize> = store.spans().iter().map(|s| s.overlap.level).collect();
        assert_eq!(lanes, vec![1, 2, 2]);
    }

    #[test]
    fn test_replace_entity_in_place() {
        let mut store = SpanStore::new();
        let n = node();
        store.select(Span::new(&n, 0, 4, per()));

        let span = store.spans()[0].span.clone();
        assert!(store.replace_entity(&span, loc()));
        assert_eq!(store.spans()[0].span.entity, loc());
        assert!(!store.replace_entity(&span, loc()));
    }

    #[test]
    fn test_replace_entity_collision_keeps_keys_unique() {
        let mut store = SpanStore::new();
        let n = node();
        store.select(Span::new(&n, 0, 4, per()));
        store.select(Span::new(&n, 0, 4, loc()));

        let first = store.spans()[0].span.clone();
        assert!(store.replace_entity(&first, loc()));
        assert_eq!(levels(&store), vec![(0, 4, "loc".to_string(), 1)]);
    }

    #[test]
    fn test_fields_are_partitioned() {
        let mut store = SpanStore::new();
        let other = Node::new("other", TEXT);
        let config = words();
        store.add_span(TextSelection::over(&node(), 0, 4, per()), &config);
        store.add_span(TextSelection::over(&other, 0, 4, loc()), &config);

        assert_eq!(store.len(), 2);
        assert_eq!(store.max_level("other"), 1);
        assert_eq!(store.clear_node("field"), 1);
        assert_eq!(store.spans_for("other").len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = SpanStore::new();
        store.select(Span::new(&node(), 0, 4, per()));

        let mut snapshot = store.spans();
        snapshot[0].span.from = 3;
        snapshot.clear();
        assert_eq!(store.spans()[0].span.from, 0);
    }

    proptest! {
        #[test]
        fn exclusive_fields_never_overlap(
            picks in proptest::collection::vec((0isize..45, 0isize..45, any::<bool>()), 1..20)
        ) {
            let mut store = SpanStore::new();
            let n = node();
            for (a, b, first) in picks {
                let entity = if first { per() } else { loc() };
                store.add_span(TextSelection::over(&n, a.min(b), a.max(b), entity), &words());
            }
            let spans = store.spans();
            for (i, a) in spans.iter().enumerate() {
                prop_assert!(a.span.from < a.span.to && a.span.to <= n.len());
                prop_assert_eq!(a.overlap.level, 1);
                for b in &spans[i + 1..] {
                    prop_assert!(!a.span.intersects(&b.span));
                }
            }
        }

        #[test]
        fn stacked_levels_clear_every_intersecting_earlier_span(
            picks in proptest::collection::vec((0usize..45, 1usize..10), 1..20)
        ) {
            let mut store = SpanStore::new();
            let n = node();
            for (i, (from, width)) in picks.into_iter().enumerate() {
                let entity = Entity::new(format!("e{i}"), "E");
                store.select(Span::new(&n, from, from + width, entity));
            }
            let spans = store.spans();
            for (i, later) in spans.iter().enumerate() {
                for earlier in &spans[..i] {
                    if earlier.span.intersects(&later.span) {
                        prop_assert!(later.overlap.level > earlier.overlap.level);
                    }
                }
            }
        }
    }
}
