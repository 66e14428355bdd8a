//! Inline marker markup, the fallback for hosts without range highlights.

use crate::model::TextRange;

const CLOSE: &str = "</mark>";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn open_tag(class: &str) -> String {
    format!("<mark class=\"{class}\">")
}

/// Escape `text` and wrap every range in a `<mark>` of `class`
///
/// `ranges` must be sorted and must not overlap.
pub fn mark_matches(text: &str, ranges: &[TextRange], class: &str) -> String {
    let open = open_tag(class);
    let mut markup = String::with_capacity(text.len() + ranges.len() * (open.len() + CLOSE.len()));
    let mut pending = ranges.iter().peekable();
    let mut inside: Option<&TextRange> = None;
    let mut buf = [0u8; 4];

    for (offset, c) in text.chars().enumerate() {
        if let Some(range) = inside {
            if range.end_offset == offset {
                markup.push_str(CLOSE);
                inside = None;
            }
        }
        if inside.is_none() {
            if let Some(range) = pending.next_if(|r| r.start_offset == offset) {
                markup.push_str(&open);
                inside = Some(range);
            }
        }
        markup.push_str(&escape_html(c.encode_utf8(&mut buf)));
    }
    if inside.is_some() {
        markup.push_str(CLOSE);
    }
    markup
}

/// Replace each `<mark>` of `class` with its inner markup
pub fn unwrap_markers(markup: &str, class: &str) -> String {
    let open = open_tag(class);
    let mut unwrapped = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find(&open) {
        unwrapped.push_str(&rest[..start]);
        let inner = &rest[start + open.len()..];
        match inner.find(CLOSE) {
            Some(end) => {
                unwrapped.push_str(&inner[..end]);
                rest = &inner[end + CLOSE.len()..];
            }
            None => {
                unwrapped.push_str(inner);
                rest = "";
            }
        }
    }
    unwrapped.push_str(rest);
    unwrapped
}

fn unescape_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "#39" => Some('\''),
        _ => None,
    }
}

/// Plain text and marked ranges of markup produced by [`mark_matches`]
///
/// Tags other than markers of `class` are kept as text.
pub fn marked_ranges(markup: &str, class: &str) -> (String, Vec<TextRange>) {
    let open = open_tag(class);
    let mut text = String::with_capacity(markup.len());
    let mut ranges = Vec::new();
    let mut offset = 0;
    let mut start = None;
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with(&open) {
            start = Some(offset);
            rest = &rest[open.len()..];
            continue;
        }
        if let (true, Some(from)) = (rest.starts_with(CLOSE), start) {
            ranges.push(TextRange::new(from, offset));
            start = None;
            rest = &rest[CLOSE.len()..];
            continue;
        }
        if c == '&' {
            if let Some(end) = rest.find(';') {
                if let Some(decoded) = unescape_entity(&rest[1..end]) {
                    text.push(decoded);
                    offset += 1;
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        }
        text.push(c);
        offset += 1;
        rest = &rest[c.len_utf8()..];
    }
    (text, ranges)
}
