//! Boundary snapping for raw selections.
//!
//! A selection that starts or ends inside a word grows to cover the whole
//! word; a single stray whitespace char picked up at either edge is dropped
//! instead. Edges that already sit next to whitespace or a symbol stay put,
//! so a deliberate multi-word selection comes back unchanged.

use std::collections::VecDeque;

use crate::text::is_boundary;

/// Result of snapping a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapped {
    pub from: usize,
    pub to: usize,
    pub text: String,
}

/// Snap `from..to` (whose content is `text`) to word boundaries of `full`.
///
/// Offsets count chars. The result is always clamped to `0..=len(full)`.
pub fn snap(full: &str, from: usize, to: usize, text: &str) -> Snapped {
    let chars: Vec<char> = full.chars().collect();
    let len = chars.len();
    let mut from = from.min(len);
    let mut to = to.min(len);
    let mut grown: VecDeque<char> = text.chars().collect();

    while from > 0 {
        let before = chars[from - 1];
        if is_boundary(before) {
            break;
        }
        if grown.front().is_some_and(|c| c.is_whitespace()) {
            from += 1;
            grown.pop_front();
            break;
        }
        from -= 1;
        grown.push_front(chars[from]);
    }

    while to < len {
        let at = chars[to];
        if is_boundary(at) {
            break;
        }
        if grown.back().is_some_and(|c| c.is_whitespace()) {
            to = to.saturating_sub(1);
            grown.pop_back();
            break;
        }
        grown.push_back(at);
        to += 1;
    }

    Snapped {
        from: from.min(len),
        to: to.min(len),
        text: grown.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::text::slice_chars;

    const TEXT: &str = "This is Lorem Ipsum? This is a sentence with 123x digits.";

    fn snap_slice(from: usize, to: usize) -> Snapped {
        snap(TEXT, from, to, &slice_chars(TEXT, from, to))
    }

    #[test]
    fn test_trailing_space_is_dropped() {
        let snapped = snap_slice(5, 8);
        assert_eq!(snapped, Snapped { from: 5, to: 7, text: "is".into() });
    }

    #[test]
    fn test_partial_word_expands_right() {
        let snapped = snap_slice(5, 9);
        assert_eq!(snapped, Snapped { from: 5, to: 13, text: "is Lorem".into() });
    }

    #[test]
    fn test_partial_word_expands_left() {
        let snapped = snap_slice(10, 13);
        assert_eq!(snapped.text, "Lorem");
        assert_eq!((snapped.from, snapped.to), (8, 13));
    }

    #[test]
    fn test_bounded_phrase_is_unchanged() {
        let snapped = snap_slice(8, 20);
        assert_eq!(snapped, Snapped { from: 8, to: 20, text: "Lorem Ipsum?".into() });
    }

    #[test]
    fn test_leading_space_is_dropped() {
        let snapped = snap_slice(13, 17);
        assert_eq!(snapped.text, "Ipsum");
        assert_eq!((snapped.from, snapped.to), (14, 19));
    }

    #[test]
    fn test_digits_join_words() {
        let start = TEXT.find("123x").unwrap();
        let snapped = snap_slice(start + 1, start + 2);
        assert_eq!(snapped.text, "123x");
    }

    #[test]
    fn test_snaps_at_text_edges() {
        let snapped = snap_slice(1, 2);
        assert_eq!(snapped, Snapped { from: 0, to: 4, text: "This".into() });

        let end = TEXT.chars().count();
        let snapped = snap_slice(end - 3, end - 2);
        assert_eq!(snapped.text, "digits");
    }

    #[test]
    fn test_out_of_range_offsets_are_clamped() {
        let snapped = snap("short", 2, 40, "ort");
        assert_eq!(snapped.to, 5);
        assert_eq!(snapped.from, 0);
    }

    proptest! {
        #[test]
        fn snapping_stays_in_bounds_and_is_stable(
            text in "[a-c1 ,.?\n]{1,40}",
            a in 0usize..40,
            b in 0usize..40,
        ) {
            let len = text.chars().count();
            let (from, to) = (a.min(b).min(len), a.max(b).min(len));
            let once = snap(&text, from, to, &slice_chars(&text, from, to));
            prop_assert!(once.from <= len && once.to <= len);

            let twice = snap(&text, once.from, once.to, &slice_chars(&text, once.from, once.to));
            prop_assert_eq!((twice.from, twice.to), (once.from, once.to));
        }
    }
}
