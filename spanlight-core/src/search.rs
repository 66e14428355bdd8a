//! Highlighting of free-text search matches inside a field.
//!
//! Independent of the span store. Hosts with native range highlights get
//! every match under [`SEARCH_HIGHLIGHT`]; other hosts get `<mark>` markup.

use tracing::debug;

use crate::layout::host::SearchSurface;
use crate::markup;
use crate::model::TextRange;

/// Highlight name (and marker class) shared by all search matches
pub const SEARCH_HIGHLIGHT: &str = "search-text-highlight";

/// Characters besides whitespace that separate query words
pub const QUERY_SEPARATORS: &[char] = &[',', ';', '|'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Matches must be surrounded by non-alphanumeric chars or the text edge
    #[default]
    WholeWord,
    Substring,
}

/// Split a query into words
pub fn split_query(query: &str) -> Vec<String> {
    query
        .split(|c: char| c.is_whitespace() || QUERY_SEPARATORS.contains(&c))
        .filter(|word| !word.is_empty())
        .map(String::from)
        .collect()
}

fn fold(c: char) -> char {
    // One char in, one char out, so offsets survive case folding
    c.to_lowercase().next().unwrap_or(c)
}

/// Case-insensitive matches of `words` in `text`, leftmost first
///
/// At each position the longest matching word wins and the scan resumes
/// after it, so ranges are sorted and never overlap.
pub fn find_matches(text: &str, words: &[String], mode: SearchMode) -> Vec<TextRange> {
    let haystack: Vec<char> = text.chars().map(fold).collect();
    let mut needles: Vec<Vec<char>> = words
        .iter()
        .map(|word| word.chars().map(fold).collect::<Vec<char>>())
        .filter(|needle| !needle.is_empty())
        .collect();
    needles.sort_by_key(|needle| std::cmp::Reverse(needle.len()));

    let is_edge = |index: Option<usize>| match index {
        Some(i) => haystack.get(i).map_or(true, |c| !c.is_alphanumeric()),
        None => true,
    };

    let mut matches = Vec::new();
    let mut start = 0;
    while start < haystack.len() {
        let found = needles.iter().find(|needle| {
            let end = start + needle.len();
            end <= haystack.len()
                && haystack[start..end] == needle[..]
                && (mode == SearchMode::Substring || (is_edge(start.checked_sub(1)) && is_edge(Some(end))))
        });
        match found {
            Some(needle) => {
                matches.push(TextRange::new(start, start + needle.len()));
                start += needle.len();
            }
            None => start += 1,
        }
    }
    matches
}

/// Highlights search matches of one query per field
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryHighlighter {
    mode: SearchMode,
}

impl QueryHighlighter {
    pub fn new(mode: SearchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Highlight `query` in `field`, replacing any previous search state
    ///
    /// Returns the number of matches. An empty query or a missing field
    /// leaves the field cleared.
    pub fn highlight<S: SearchSurface>(&self, host: &mut S, field: &str, query: &str) -> usize {
        self.clear(host, field);

        let words = split_query(query);
        if words.is_empty() {
            return 0;
        }
        let Some(text) = host.text(field) else {
            debug!(field, "search target not found");
            return 0;
        };

        let matches = find_matches(&text, &words, self.mode);
        if matches.is_empty() {
            return 0;
        }

        if host.supports_highlights() {
            host.register_highlight(field, SEARCH_HIGHLIGHT, &matches);
        } else {
            debug!(field, "no native highlights, wrapping matches in markers");
            host.set_markup(field, &markup::mark_matches(&text, &matches, SEARCH_HIGHLIGHT));
        }
        matches.len()
    }

    /// Remove search highlights from `field`; safe to call repeatedly
    pub fn clear<S: SearchSurface>(&self, host: &mut S, field: &str) {
        if host.supports_highlights() {
            host.clear_highlight(field, SEARCH_HIGHLIGHT);
            return;
        }
        if let Some(current) = host.markup(field) {
            let unwrapped = markup::unwrap_markers(&current, SEARCH_HIGHLIGHT);
            if unwrapped != current {
                host.set_markup(field, &unwrapped);
            }
        }
    }
}
