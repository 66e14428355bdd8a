//! Character-offset helpers shared by the store, the snapping pass and the hosts.
//!
//! Every offset in this crate counts Unicode scalar values. Hosts that speak
//! UTF-16 (the DOM) convert at their boundary with the functions below.

/// Number of chars in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Chars `from..to` of `text`; out-of-range bounds are clamped.
pub fn slice_chars(text: &str, from: usize, to: usize) -> String {
    if from >= to {
        return String::new();
    }
    text.chars().skip(from).take(to - from).collect()
}

/// Anything that is neither a letter nor a digit.
pub fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric()
}

/// A char that ends a word: whitespace, newlines and symbols.
pub fn is_boundary(c: char) -> bool {
    c.is_whitespace() || is_symbol(c)
}

/// True when `text` is empty or only whitespace.
pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Convert a UTF-16 code unit offset into a char offset.
///
/// An offset that falls inside a surrogate pair resolves to the char that
/// owns it; offsets past the end resolve to the char length.
pub fn utf16_to_char_offset(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (index, c) in text.chars().enumerate() {
        if units >= utf16_offset {
            return index;
        }
        units += c.len_utf16();
        if units > utf16_offset {
            return index;
        }
    }
    char_len(text)
}

/// Convert a char offset into a UTF-16 code unit offset.
pub fn char_to_utf16_offset(text: &str, char_offset: usize) -> usize {
    text.chars().take(char_offset).map(char::len_utf16).sum()
}
