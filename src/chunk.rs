//! Text chunking.
//!
//! The baseline contract splits extracted text on line breaks: every line
//! becomes one chunk, including empty lines. Joining the chunks with `'\n'`
//! reconstructs the input exactly. A length-bounded paragraph mode is
//! available behind `chunking.mode = "bounded"` as an explicit alternative;
//! it is never substituted silently.

use crate::config::ChunkingConfig;

/// Approximate chars-per-token ratio used by the bounded mode.
const CHARS_PER_TOKEN: usize = 4;

/// Split text into chunks according to the configured mode.
pub fn chunk_text(config: &ChunkingConfig, text: &str) -> Vec<String> {
    match config.mode.as_str() {
        "bounded" => chunk_bounded(text, config.max_tokens),
        _ => chunk_lines(text),
    }
}

/// Line-based split: one chunk per line, empty lines retained.
pub fn chunk_lines(text: &str) -> Vec<String> {
    text.split('\n').map(|line| line.to_string()).collect()
}

/// Paragraph-boundary packing under a `max_tokens` budget.
///
/// Paragraphs (`\n\n`) are accumulated until adding the next one would
/// exceed the budget; oversized paragraphs are hard-split at the nearest
/// newline or space boundary below the limit.
pub fn chunk_bounded(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;
    let mut chunks = Vec::new();
    let mut current = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current.is_empty() {
            trimmed.len()
        } else {
            current.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if trimmed.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = floor_char_boundary(remaining, remaining.len().min(max_chars));
                let actual = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                chunks.push(remaining[..actual].trim().to_string());
                remaining = &remaining[actual..];
            }
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(trimmed);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    if chunks.is_empty() {
        chunks.push(text.trim().to_string());
    }

    chunks
}

/// Largest byte index <= `at` that lands on a char boundary.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    let mut i = at;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
