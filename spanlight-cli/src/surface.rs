//! Terminal implementation of the spanlight host traits.
//!
//! Text is hard-wrapped to the editor width. Every visual line takes
//! `line_height` rows: the text itself on the first row, chip lanes below.
//! Geometry is reported in cells relative to the scrolled viewport.

use std::collections::BTreeMap;

use spanlight_core::markup;
use spanlight_core::{Chip, HighlightSurface, LayoutHost, RawSelection, Rect, SearchSurface, TextRange, SEARCH_HIGHLIGHT};

pub struct TerminalSurface {
    node_id: String,
    text: String,
    chars: Vec<char>,
    native: bool,
    width: usize,
    height: usize,
    scroll: usize,
    line_height: usize,
    /// (visual line, column) of every char
    positions: Vec<(usize, usize)>,
    /// Char offsets shown on each visual line, newlines excluded
    lines: Vec<Vec<usize>>,
    highlights: BTreeMap<String, Vec<TextRange>>,
    chips: Vec<Chip>,
    selection: Option<RawSelection>,
    markup: Option<String>,
}

impl TerminalSurface {
    /// `native` false simulates a host without range highlights
    pub fn new(node_id: impl Into<String>, text: impl Into<String>, native: bool) -> Self {
        let text = text.into();
        let mut surface = Self {
            node_id: node_id.into(),
            chars: text.chars().collect(),
            text,
            native,
            width: 80,
            height: 24,
            scroll: 0,
            line_height: 1,
            positions: Vec::new(),
            lines: Vec::new(),
            highlights: BTreeMap::new(),
            chips: Vec::new(),
            selection: None,
            markup: None,
        };
        surface.relayout();
        surface
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Resize the viewport; returns true when the wrap width changed
    pub fn set_viewport(&mut self, width: u16, height: u16) -> bool {
        let width = usize::from(width).max(1);
        self.height = usize::from(height);
        if width == self.width {
            return false;
        }
        self.width = width;
        self.relayout();
        true
    }

    fn relayout(&mut self) {
        self.positions.clear();
        self.lines = vec![Vec::new()];
        for (offset, &c) in self.chars.iter().enumerate() {
            let mut line = self.lines.len() - 1;
            if c == '\n' {
                self.positions.push((line, self.lines[line].len()));
                self.lines.push(Vec::new());
                continue;
            }
            if self.lines[line].len() >= self.width {
                self.lines.push(Vec::new());
                line += 1;
            }
            self.positions.push((line, self.lines[line].len()));
            self.lines[line].push(offset);
        }
    }

    pub fn line_height(&self) -> usize {
        self.line_height
    }

    pub fn visual_lines(&self) -> &[Vec<usize>] {
        &self.lines
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(offset).copied()
    }

    /// Visual line of a char offset; the end of text maps to the last line
    pub fn line_of(&self, offset: usize) -> usize {
        self.positions
            .get(offset)
            .map(|&(line, _)| line)
            .unwrap_or(self.lines.len() - 1)
    }

    /// First viewport row of a visual line, before scrolling
    pub fn row_of_line(&self, line: usize) -> usize {
        line * self.line_height
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Scroll so `offset` is visible; returns true when the scroll moved
    pub fn ensure_visible(&mut self, offset: usize) -> bool {
        let row = self.row_of_line(self.line_of(offset));
        let previous = self.scroll;
        if row < self.scroll {
            self.scroll = row;
        } else if self.height > 0 && row + self.line_height > self.scroll + self.height {
            self.scroll = (row + self.line_height).saturating_sub(self.height);
        }
        self.scroll != previous
    }

    pub fn set_selection(&mut self, selection: Option<RawSelection>) {
        self.selection = selection;
    }

    pub fn current_selection(&self) -> Option<RawSelection> {
        self.selection
    }

    pub fn chips(&self) -> &[Chip] {
        &self.chips
    }

    /// Highlight names covering `offset`
    pub fn highlights_at(&self, offset: usize) -> impl Iterator<Item = &str> {
        self.highlights
            .iter()
            .filter(move |(_, ranges)| ranges.iter().any(|r| r.contains(offset)))
            .map(|(name, _)| name.as_str())
    }

    /// Current search matches, from native highlights or from marker markup
    pub fn search_ranges(&self) -> Vec<TextRange> {
        if self.native {
            return self.highlights.get(SEARCH_HIGHLIGHT).cloned().unwrap_or_default();
        }
        self.markup
            .as_deref()
            .map(|markup| markup::marked_ranges(markup, SEARCH_HIGHLIGHT).1)
            .unwrap_or_default()
    }
}

impl HighlightSurface for TerminalSurface {
    fn supports_highlights(&self) -> bool {
        self.native
    }

    fn text(&self, node: &str) -> Option<String> {
        (node == self.node_id).then(|| self.text.clone())
    }

    fn register_highlight(&mut self, node: &str, name: &str, ranges: &[TextRange]) {
        if node == self.node_id {
            self.highlights.insert(name.to_string(), ranges.to_vec());
        }
    }

    fn clear_highlight(&mut self, node: &str, name: &str) {
        if node == self.node_id {
            self.highlights.remove(name);
        }
    }
}

impl LayoutHost for TerminalSurface {
    fn container_box(&self, node: &str) -> Option<Rect> {
        (node == self.node_id).then(|| Rect::new(0.0, 0.0, self.width as f64, self.height as f64))
    }

    fn range_box(&self, node: &str, from: usize, to: usize) -> Option<Rect> {
        if node != self.node_id || from >= to || to > self.chars.len() {
            return None;
        }
        let cells: Vec<(usize, usize)> = (from..to)
            .filter(|&offset| self.chars[offset] != '\n')
            .map(|offset| self.positions[offset])
            .collect();
        let first_line = cells.iter().map(|&(line, _)| line).min()?;
        let last_line = cells.iter().map(|&(line, _)| line).max()?;
        let left = cells.iter().map(|&(_, col)| col).min()?;
        let right = cells.iter().map(|&(_, col)| col + 1).max()?;

        let top = self.row_of_line(first_line) as f64 - self.scroll as f64;
        let height = ((last_line - first_line) * self.line_height + 1) as f64;
        Some(Rect::new(left as f64, top, (right - left) as f64, height))
    }

    fn selection(&self, node: &str) -> Option<RawSelection> {
        if node == self.node_id {
            self.selection
        } else {
            None
        }
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn set_line_height(&mut self, node: &str, line_height: f64) {
        if node == self.node_id {
            self.line_height = line_height.round().max(1.0) as usize;
        }
    }

    fn render_chips(&mut self, node: &str, chips: &[Chip]) {
        if node == self.node_id {
            self.chips = chips.to_vec();
        }
    }
}

impl SearchSurface for TerminalSurface {
    fn markup(&self, field: &str) -> Option<String> {
        if field != self.node_id {
            return None;
        }
        Some(
            self.markup
                .clone()
                .unwrap_or_else(|| markup::escape_html(&self.text)),
        )
    }

    fn set_markup(&mut self, field: &str, markup: &str) {
        if field == self.node_id {
            self.markup = Some(markup.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_at_width_and_newlines() {
        let mut surface = TerminalSurface::new("doc", "abcdef\ngh", true);
        surface.set_viewport(4, 10);

        let lines: Vec<usize> = surface.visual_lines().iter().map(Vec::len).collect();
        assert_eq!(lines, vec![4, 2, 2]);
        assert_eq!(surface.line_of(5), 1);
        assert_eq!(surface.line_of(7), 2);
    }

    #[test]
    fn test_range_box_spans_lines() {
        let mut surface = TerminalSurface::new("doc", "abcdef\ngh", true);
        surface.set_viewport(4, 10);
        surface.set_line_height("doc", 3.0);

        assert_eq!(surface.range_box("doc", 1, 3), Some(Rect::new(1.0, 0.0, 2.0, 1.0)));
        // "def\ng" covers lines 0..=2
        assert_eq!(surface.range_box("doc", 3, 8), Some(Rect::new(0.0, 0.0, 4.0, 7.0)));
        assert_eq!(surface.range_box("other", 1, 3), None);
    }

    #[test]
    fn test_ensure_visible_scrolls_by_rows() {
        let text = "one\ntwo\nthree\nfour\nfive";
        let mut surface = TerminalSurface::new("doc", text, true);
        surface.set_viewport(20, 4);
        surface.set_line_height("doc", 2.0);

        assert!(!surface.ensure_visible(0));
        let five = text.find("five").unwrap();
        assert!(surface.ensure_visible(five));
        assert_eq!(surface.scroll(), 6);
        assert_eq!(surface.range_box("doc", five, five + 4).unwrap().top, 2.0);
    }

    #[test]
    fn test_fallback_search_ranges_come_from_markup() {
        let mut surface = TerminalSurface::new("doc", "a b a", false);
        let marked = markup::mark_matches("a b a", &[TextRange::new(0, 1)], SEARCH_HIGHLIGHT);
        surface.set_markup("doc", &marked);
        assert_eq!(surface.search_ranges(), vec![TextRange::new(0, 1)]);
    }
}
