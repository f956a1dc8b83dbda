//! Text statistics over a document's plain projection.

/// Reading speed used for time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes to read `words` words, rounded up. Zero words take zero minutes.
pub fn reading_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

/// The first `max_chars` characters of `text`, with `...` appended when it
/// was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
