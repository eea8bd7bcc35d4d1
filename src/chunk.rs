//! Sentence-aware text chunking for embedding and retrieval.
//!
//! Long prose is split into chunks that pack whole sentences up to a
//! character budget, with the tail of each chunk repeated at the start of
//! the next so that statements near a boundary stay retrievable.
//!
//! | Parameter   | Default | Meaning                                   |
//! |-------------|---------|-------------------------------------------|
//! | `max_chars` | 1200    | Target upper bound on chunk length        |
//! | `overlap`   | 200     | Tail characters carried into next chunk   |
//!
//! A sentence longer than `max_chars` is kept intact as its own chunk
//! rather than split mid-sentence, so chunks can exceed the budget in
//! that case.

/// Split text into sentences on `.`, `!`, or `?` followed by whitespace.
///
/// Returns trimmed, non-empty sentences. Empty or whitespace-only input
/// yields an empty vec.
pub fn split_sentences(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let last = current.trim();
    if !last.is_empty() {
        sentences.push(last.to_string());
    }
    sentences
}

/// Pack sentences greedily into chunks of at most `max_chars` characters,
/// seeding each new chunk with the last `overlap` characters of the
/// previous one.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();
        if current_chars + sentence_chars + 1 <= max_chars {
            if current.is_empty() {
                current = sentence;
                current_chars = sentence_chars;
            } else {
                current.push(' ');
                current.push_str(&sentence);
                current_chars += sentence_chars + 1;
            }
        } else {
            if !current.is_empty() {
                chunks.push(current.clone());
            }
            let tail = char_tail(&current, overlap);
            let mut next = String::with_capacity(tail.len() + sentence.len() + 1);
            next.push_str(tail);
            if !tail.is_empty() {
                next.push(' ');
            }
            next.push_str(&sentence);
            current = next.trim().to_string();
            current_chars = current.chars().count();
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Normalize markdown before storage: CRLF to LF, outer whitespace trimmed.
pub fn clean_markdown(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

/// Last `n` characters of `s`, respecting char boundaries.
fn char_tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let total = s.chars().count();
    if total <= n {
        return s;
    }
    match s.char_indices().nth(total - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
