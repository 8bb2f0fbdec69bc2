//! Local encoding of plaintext into character codes, before anything is shared.
//!
//! Every byte of the (UTF-8) input is one character, so pattern and text lengths are counted in
//! bytes.

/// The numeric code of a single character.
pub type CharCode = u8;

/// Encodes the pattern, one code per character, preserving order.
pub fn encode_pattern(pattern: &str) -> Vec<CharCode> {
    pattern.bytes().collect()
}

/// Encodes every contiguous window of `window_size` characters of the text, left to right.
///
/// Returns no windows if the text is shorter than a window (or the window size is 0).
pub fn encode_windows(text: &str, window_size: usize) -> Vec<Vec<CharCode>> {
    if window_size == 0 {
        return vec![];
    }
    text.as_bytes()
        .windows(window_size)
        .map(<[CharCode]>::to_vec)
        .collect()
}

/// The number of windows of size `pattern_len` in a text of length `text_len`.
pub fn window_count(pattern_len: usize, text_len: usize) -> usize {
    if pattern_len == 0 {
        0
    } else {
        (text_len + 1).saturating_sub(pattern_len)
    }
}
