//! Layout engine: binds one text field to the shared span store and keeps
//! its highlights and label chips in sync with the stored spans.

pub mod host;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, trace};

use crate::config::{Configuration, LayoutOptions};
use crate::error::{Error, Result};
use crate::model::{Entity, Node, OverlappedSpan, Span, SpanKey, SpanSeed, TextRange, TextSelection};
use crate::store::SharedStore;
use host::{Chip, LayoutHost, Rect};

/// Highlight name used for spans of `entity_id`
///
/// Names only contain ASCII letters, digits, `-` and `_` so hosts can use
/// them as style identifiers. Any other character of the id, `-` and `_`
/// included, is written as `_<hex code point>_`, so distinct ids never
/// share a name and an id can never end in the hover suffix.
pub fn highlight_name(entity_id: &str, hovered: bool) -> String {
    let mut name = String::from("span-");
    for c in entity_id.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
        } else {
            name.push_str(&format!("_{:x}_", u32::from(c)));
        }
    }
    if hovered {
        name.push_str("-hover");
    }
    name
}

/// First ancestor of `start` that scrolls, walking up with `parent`
pub fn nearest_scrollable<N, P, S>(start: &N, mut parent: P, mut is_scrollable: S) -> Option<N>
where
    P: FnMut(&N) -> Option<N>,
    S: FnMut(&N) -> bool,
{
    let mut current = parent(start);
    while let Some(node) = current {
        if is_scrollable(&node) {
            return Some(node);
        }
        current = parent(&node);
    }
    None
}

/// Result of the last render of a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    pub max_level: usize,
    pub line_height: f64,
    pub highlights: BTreeMap<String, Vec<TextRange>>,
    pub chips: Vec<Chip>,
}

/// Layout engine for one annotated field
pub struct LayoutEngine<H: LayoutHost> {
    store: SharedStore,
    host: H,
    node_id: String,
    node: Option<Node>,
    config: Configuration,
    options: LayoutOptions,
    active: Option<Entity>,
    hovered: Option<SpanKey>,
    registered: BTreeSet<String>,
    frame: RenderFrame,
}

impl<H: LayoutHost> LayoutEngine<H> {
    pub fn new(store: SharedStore, host: H, node_id: impl Into<String>, config: Configuration) -> Self {
        Self {
            store,
            host,
            node_id: node_id.into(),
            node: None,
            config,
            options: LayoutOptions::default(),
            active: None,
            hovered: None,
            registered: BTreeSet::new(),
            frame: RenderFrame::default(),
        }
    }

    pub fn with_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_mounted(&self) -> bool {
        self.node.is_some()
    }

    /// The last computed frame
    pub fn frame(&self) -> &RenderFrame {
        &self.frame
    }

    /// Spans of this field
    pub fn spans(&self) -> Vec<OverlappedSpan> {
        self.store.borrow().spans_for(&self.node_id)
    }

    /// Attach to the container, load persisted spans and render
    ///
    /// Fails when the host has no native highlights or the container is
    /// missing; callers should then disable annotation for the field.
    pub fn mount(&mut self, initial: Vec<SpanSeed>) -> Result<()> {
        if !self.host.supports_highlights() {
            return Err(Error::unsupported("host cannot register range highlights"));
        }
        let text = self
            .host
            .text(&self.node_id)
            .ok_or_else(|| Error::container_not_found(self.node_id.as_str()))?;

        let node = Node::new(self.node_id.as_str(), text);
        let loaded = self
            .store
            .borrow_mut()
            .load_spans(initial.into_iter().map(|seed| seed.into_span(&node)));
        info!(node = %self.node_id, loaded, "mounted field");

        self.node = Some(node);
        self.render();
        Ok(())
    }

    /// Forget this field's spans and remove everything rendered for it
    pub fn unmount(&mut self) {
        let removed = self.store.borrow_mut().clear_node(&self.node_id);
        for name in std::mem::take(&mut self.registered) {
            self.host.clear_highlight(&self.node_id, &name);
        }
        self.host.render_chips(&self.node_id, &[]);
        self.node = None;
        self.hovered = None;
        self.frame = RenderFrame::default();
        info!(node = %self.node_id, removed, "unmounted field");
    }

    /// Label used for the next selection
    pub fn change_selected_entity(&mut self, entity: Entity) {
        debug!(node = %self.node_id, entity = %entity.id, "active entity changed");
        self.active = Some(entity);
    }

    pub fn selected_entity(&self) -> Option<&Entity> {
        self.active.as_ref()
    }

    /// Turn the host's current selection into a span
    pub fn on_selection(&mut self) -> bool {
        let Some(node) = self.node.clone() else {
            return false;
        };
        let Some(entity) = self.active.clone() else {
            debug!(node = %self.node_id, "selection ignored, no active entity");
            return false;
        };
        let Some(raw) = self.host.selection(&self.node_id) else {
            return false;
        };

        let range = raw.range();
        let selection = TextSelection::over(&node, range.start_offset as isize, range.end_offset as isize, entity);
        let added = self.store.borrow_mut().add_span(selection, &self.config);
        self.host.clear_selection();
        self.render();
        added
    }

    /// Mark a span as hovered, or clear the hover with `None`
    pub fn hover(&mut self, key: Option<SpanKey>) {
        if self.hovered != key {
            self.hovered = key;
            self.render();
        }
    }

    pub fn hovered(&self) -> Option<&SpanKey> {
        self.hovered.as_ref()
    }

    /// Chip action: delete the span
    pub fn remove(&mut self, span: &Span) -> bool {
        let removed = self.store.borrow_mut().remove_span(span);
        if self.hovered.as_ref() == Some(&span.key()) {
            self.hovered = None;
        }
        self.render();
        removed
    }

    /// Chip action: change the span's label
    ///
    /// A hovered span stays hovered under its new key. When the new label
    /// merges it into an existing span, the hover moves to that span.
    pub fn relabel(&mut self, span: &Span, entity: Entity) -> bool {
        let key = span.key();
        let target = SpanKey {
            entity_id: entity.id.clone(),
            ..key.clone()
        };
        let relabeled = self.store.borrow_mut().replace_entity(span, entity);
        if relabeled && self.hovered.as_ref() == Some(&key) {
            self.hovered = Some(target);
        }
        self.render();
        relabeled
    }

    /// Chip action: add a copy of the span with another label
    ///
    /// Fields that exclude overlaps refuse, since the copy would overlap
    /// the original.
    pub fn duplicate(&mut self, span: &Span, entity: Entity) -> bool {
        if !self.config.allow_overlap {
            debug!(node = %self.node_id, "duplicate refused, overlaps are not allowed");
            return false;
        }
        let copy = Span::new(&span.node, span.from, span.to, entity);
        let added = self.store.borrow_mut().select(copy);
        self.render();
        added
    }

    pub fn on_resize(&mut self) {
        trace!(node = %self.node_id, "resize");
        self.render();
    }

    pub fn on_scroll(&mut self) {
        trace!(node = %self.node_id, "scroll");
        self.render();
    }

    /// Re-project the stored spans onto highlights and chips
    pub fn render(&mut self) -> &RenderFrame {
        if self.node.is_none() {
            return &self.frame;
        }

        let spans = self.store.borrow().spans_for(&self.node_id);
        let max_level = spans.iter().map(|s| s.overlap.level).max().unwrap_or(0);
        let line_height = self.options.line_height(self.config.line_height, max_level);
        self.host.set_line_height(&self.node_id, line_height);

        let origin = self.host.container_box(&self.node_id).unwrap_or_default();
        let mut highlights: BTreeMap<String, Vec<TextRange>> = BTreeMap::new();
        let mut chips = Vec::with_capacity(spans.len());

        for stored in spans {
            let hovered = self.hovered.as_ref() == Some(&stored.key());
            highlights
                .entry(highlight_name(&stored.span.entity.id, hovered))
                .or_default()
                .push(stored.span.range());

            let Some(range_box) = self.host.range_box(&self.node_id, stored.span.from, stored.span.to) else {
                trace!(key = ?stored.key(), "span has no geometry");
                continue;
            };
            let lane_offset = if stored.overlap.level > 0 {
                self.options.level_gap * stored.overlap.index as f64
            } else {
                0.0
            };
            let bounds = Rect::new(
                range_box.left - origin.left,
                range_box.bottom() - origin.top + lane_offset,
                range_box.width,
                self.options.level_gap,
            );
            chips.push(Chip {
                entity: stored.span.entity.clone(),
                span: stored,
                bounds,
                hovered,
            });
        }

        for name in std::mem::take(&mut self.registered) {
            self.host.clear_highlight(&self.node_id, &name);
        }
        for (name, ranges) in &highlights {
            self.host.register_highlight(&self.node_id, name, ranges);
            self.registered.insert(name.clone());
        }
        self.host.render_chips(&self.node_id, &chips);

        self.frame = RenderFrame {
            max_level,
            line_height,
            highlights,
            chips,
        };
        &self.frame
    }
}
