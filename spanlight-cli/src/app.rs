use spanlight_core::{
    shared, Configuration, CursorState, Document, LabelOption, LayoutEngine, LayoutOptions, OverlappedSpan,
    QueryHighlighter, RawSelection, SearchMode, SpanSeed, SpanStore,
};
use tracing::warn;

use crate::surface::TerminalSurface;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Visual,
    Search,
    Help,
}

/// Focus area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Chips,
}

/// Lanes are one terminal row each and the text row holds no lane
pub const TERMINAL_LAYOUT: LayoutOptions = LayoutOptions {
    level_gap: 1.0,
    level_threshold: 0,
};

/// Terminal application state around one annotated document
pub struct App {
    pub document: Document,
    pub engine: LayoutEngine<TerminalSurface>,
    pub search: QueryHighlighter,
    pub labels: Vec<LabelOption>,
    pub cursor: CursorState,
    pub mode: Mode,
    pub focus: Focus,
    pub running: bool,

    /// Whether the field accepted annotation at mount
    pub annotatable: bool,

    // Selection state
    pub selection_anchor: Option<usize>,

    pub active_label: usize,
    pub chip_selected: usize,

    // Search input state
    pub input_buffer: String,
    pub query: String,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    pub fn new(
        document: Document,
        labels: Vec<LabelOption>,
        config: Configuration,
        seeds: Vec<SpanSeed>,
        native_highlights: bool,
    ) -> Self {
        let node = document.node();
        let surface = TerminalSurface::new(node.id.as_str(), document.content.as_str(), native_highlights);
        let store = shared(SpanStore::new());
        let config = Configuration {
            line_height: 1.0,
            ..config
        };
        let engine = LayoutEngine::new(store, surface, node.id.as_str(), config).with_options(TERMINAL_LAYOUT);

        let mut cursor = CursorState::new();
        cursor.set_content(&document.content);

        let mut app = Self {
            document,
            engine,
            search: QueryHighlighter::new(SearchMode::WholeWord),
            labels,
            cursor,
            mode: Mode::Normal,
            focus: Focus::Editor,
            running: true,
            annotatable: false,
            selection_anchor: None,
            active_label: 0,
            chip_selected: 0,
            input_buffer: String::new(),
            query: String::new(),
            status_message: None,
        };

        match app.engine.mount(seeds) {
            Ok(()) => {
                app.annotatable = true;
                app.select_label(0);
            }
            Err(e) => {
                warn!(error = %e, "annotation disabled");
                app.set_status(&format!("Annotation disabled: {}", e));
            }
        }
        app
    }

    pub fn surface(&self) -> &TerminalSurface {
        self.engine.host()
    }

    pub fn spans(&self) -> Vec<OverlappedSpan> {
        self.engine.spans()
    }

    /// Editor area changed size
    pub fn resize(&mut self, width: u16, height: u16) {
        if self.engine.host_mut().set_viewport(width, height) {
            self.engine.on_resize();
        }
        self.scroll_to_cursor();
    }

    fn scroll_to_cursor(&mut self) {
        let offset = self.cursor.offset();
        if self.engine.host_mut().ensure_visible(offset) {
            self.engine.on_scroll();
        }
    }

    /// Apply a cursor motion, keeping the cursor visible and the selection current
    pub fn move_cursor(&mut self, motion: impl FnOnce(&mut CursorState)) {
        motion(&mut self.cursor);
        self.scroll_to_cursor();
        self.update_selection();
    }

    /// Enter visual/selection mode
    pub fn enter_visual_mode(&mut self) {
        if !self.annotatable {
            self.set_status("Annotation is disabled for this document");
            return;
        }
        self.mode = Mode::Visual;
        self.selection_anchor = Some(self.cursor.offset());
        self.update_selection();
    }

    pub fn cancel_visual_mode(&mut self) {
        self.mode = Mode::Normal;
        self.selection_anchor = None;
        self.engine.host_mut().set_selection(None);
    }

    /// Update the host selection from the anchor to just past the cursor
    pub fn update_selection(&mut self) {
        if self.mode != Mode::Visual {
            return;
        }
        let Some(anchor) = self.selection_anchor else {
            return;
        };
        let cursor = self.cursor.offset();
        let selection = if cursor >= anchor {
            RawSelection {
                anchor,
                focus: cursor + 1,
            }
        } else {
            RawSelection {
                anchor: anchor + 1,
                focus: cursor,
            }
        };
        self.engine.host_mut().set_selection(Some(selection));
    }

    /// Turn the visual selection into a span with the active label
    pub fn commit_selection(&mut self) -> bool {
        let added = self.engine.on_selection();
        self.mode = Mode::Normal;
        self.selection_anchor = None;
        self.engine.host_mut().set_selection(None);
        if added {
            self.set_status("Span added");
        } else {
            self.set_status("Selection ignored");
        }
        added
    }

    pub fn select_label(&mut self, index: usize) {
        if let Some(option) = self.labels.get(index) {
            self.active_label = index;
            self.engine.change_selected_entity(option.entity());
        }
    }

    pub fn active_label(&self) -> Option<&LabelOption> {
        self.labels.get(self.active_label)
    }

    /// Color index of a label, by entity id
    pub fn label_index(&self, entity_id: &str) -> Option<usize> {
        self.labels.iter().position(|l| l.id == entity_id)
    }

    fn selected_span(&self) -> Option<OverlappedSpan> {
        self.spans().into_iter().nth(self.chip_selected)
    }

    fn hover_selected(&mut self) {
        let key = if self.focus == Focus::Chips {
            self.selected_span().map(|s| s.key())
        } else {
            None
        };
        self.engine.hover(key);
        if let Some(span) = self.selected_span() {
            if self.focus == Focus::Chips {
                self.cursor.set_cursor_offset(span.span.from);
                self.scroll_to_cursor();
            }
        }
    }

    /// Toggle focus between editor and chip list
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Editor => Focus::Chips,
            Focus::Chips => Focus::Editor,
        };
        self.clamp_chip_selection();
        self.hover_selected();
    }

    pub fn next_chip(&mut self) {
        let count = self.spans().len();
        if count > 0 {
            self.chip_selected = (self.chip_selected + 1) % count;
            self.hover_selected();
        }
    }

    pub fn prev_chip(&mut self) {
        let count = self.spans().len();
        if count > 0 {
            self.chip_selected = if self.chip_selected == 0 {
                count - 1
            } else {
                self.chip_selected - 1
            };
            self.hover_selected();
        }
    }

    fn clamp_chip_selection(&mut self) {
        let count = self.spans().len();
        if self.chip_selected >= count {
            self.chip_selected = count.saturating_sub(1);
        }
    }

    pub fn delete_selected_span(&mut self) -> bool {
        let Some(selected) = self.selected_span() else {
            return false;
        };
        let removed = self.engine.remove(&selected.span);
        self.clamp_chip_selection();
        self.hover_selected();
        if removed {
            self.set_status("Span deleted");
        }
        removed
    }

    pub fn relabel_selected_span(&mut self) -> bool {
        let (Some(selected), Some(label)) = (self.selected_span(), self.active_label().cloned()) else {
            return false;
        };
        let relabeled = self.engine.relabel(&selected.span, label.entity());
        self.clamp_chip_selection();
        self.hover_selected();
        if relabeled {
            self.set_status(&format!("Relabeled as {}", label.text));
        }
        relabeled
    }

    pub fn duplicate_selected_span(&mut self) -> bool {
        let (Some(selected), Some(label)) = (self.selected_span(), self.active_label().cloned()) else {
            return false;
        };
        let added = self.engine.duplicate(&selected.span, label.entity());
        if added {
            self.set_status(&format!("Duplicated as {}", label.text));
        } else {
            self.set_status("Duplicate not allowed here");
        }
        added
    }

    pub fn start_search(&mut self) {
        self.input_buffer = self.query.clone();
        self.mode = Mode::Search;
    }

    /// Highlight the typed query
    pub fn run_search(&mut self) -> usize {
        self.query = std::mem::take(&mut self.input_buffer);
        self.mode = Mode::Normal;
        let field = self.engine.node_id().to_string();
        let found = self.search.highlight(self.engine.host_mut(), &field, &self.query);
        self.set_status(&format!("{} match(es)", found));
        found
    }

    pub fn clear_search(&mut self) {
        self.query.clear();
        let field = self.engine.node_id().to_string();
        self.search.clear(self.engine.host_mut(), &field);
    }

    /// Set status message
    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Get title for display
    pub fn title(&self) -> String {
        self.document
            .filename
            .clone()
            .unwrap_or_else(|| self.document.title.clone())
    }
}

#[cfg(test)]
mod tests {
    use spanlight_core::{Entity, HighlightSurface, TextRange, SEARCH_HIGHLIGHT};

    use super::*;

    const TEXT: &str = "Ada Lovelace wrote notes in London.";

    fn labels() -> Vec<LabelOption> {
        vec![
            LabelOption::new("per", "PER", "Person"),
            LabelOption::new("loc", "LOC", "Location"),
        ]
    }

    fn app(config: Configuration, native: bool) -> App {
        let doc = Document::new("notes".into(), TEXT.into());
        let mut app = App::new(doc, labels(), config, vec![], native);
        app.resize(40, 10);
        app
    }

    fn select(app: &mut App, from: usize, to_inclusive: usize) {
        app.cursor.set_cursor_offset(from);
        app.enter_visual_mode();
        app.move_cursor(|c| c.set_cursor_offset(to_inclusive));
    }

    #[test]
    fn test_visual_selection_adds_snapped_span() {
        let mut app = app(Configuration::default(), true);
        select(&mut app, 5, 7);
        assert!(app.commit_selection());

        let spans = app.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span.text, "Lovelace");
        assert_eq!(spans[0].span.entity.id, "per");
        assert_eq!(app.engine.store().borrow().len(), 1);
        assert_eq!(app.surface().chips().len(), 1);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_stacked_spans_grow_line_height() {
        let config = Configuration {
            allow_overlap: true,
            ..Configuration::default()
        };
        let mut app = app(config, true);
        select(&mut app, 0, 11);
        app.commit_selection();

        app.focus = Focus::Chips;
        app.select_label(1);
        assert!(app.duplicate_selected_span());
        assert_eq!(app.surface().line_height(), 3);

        let tops: Vec<f64> = app.surface().chips().iter().map(|c| c.bounds.top).collect();
        assert_eq!(tops, vec![1.0, 2.0]);
    }

    #[test]
    fn test_chip_actions_relabel_and_delete() {
        let mut app = app(Configuration::default(), true);
        select(&mut app, 28, 30);
        app.commit_selection();

        app.toggle_focus();
        assert!(app.engine.hovered().is_some());

        app.select_label(1);
        assert!(app.relabel_selected_span());
        assert_eq!(app.spans()[0].span.entity, Entity::new("loc", "Location"));
        assert_eq!(app.engine.hovered(), Some(&app.spans()[0].key()));

        assert!(app.delete_selected_span());
        assert!(app.spans().is_empty());
        assert!(app.surface().chips().is_empty());
    }

    #[test]
    fn test_search_highlights_matches() {
        let mut app = app(Configuration::default(), true);
        app.start_search();
        app.input_buffer = "london, ada".into();
        assert_eq!(app.run_search(), 2);
        assert_eq!(
            app.surface().search_ranges(),
            vec![TextRange::new(0, 3), TextRange::new(28, 34)]
        );

        app.clear_search();
        assert!(app.surface().search_ranges().is_empty());
    }

    #[test]
    fn test_without_native_highlights_annotation_is_disabled() {
        let mut app = app(Configuration::default(), false);
        assert!(!app.annotatable);
        assert!(!app.surface().supports_highlights());

        app.enter_visual_mode();
        assert_eq!(app.mode, Mode::Normal);

        app.input_buffer = "notes".into();
        assert_eq!(app.run_search(), 1);
        assert_eq!(app.surface().search_ranges(), vec![TextRange::new(19, 24)]);
        assert!(app.surface().highlights_at(19).all(|name| name != SEARCH_HIGHLIGHT));
    }
}
