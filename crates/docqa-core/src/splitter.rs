//! Recursive character splitter.
//!
//! Splits on the coarsest separator present (`"\n\n"`, `"\n"`, `" "`, then single
//! characters), merges the pieces back into windows of at most `max_size` characters and
//! carries up to `overlap` characters of trailing context into the next window.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_size: 1000, overlap: 50 }
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// `overlap` is clamped below `max_size`; `max_size` is at least 1.
    pub fn new(config: &ChunkingConfig) -> Self {
        let max_size = config.max_size.max(1);
        Self { max_size, overlap: config.overlap.min(max_size - 1) }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (idx, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len().saturating_sub(1), ""));
        let finer = &separators[(idx + 1).min(separators.len())..];

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut out = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.max_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                out.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if finer.is_empty() {
                out.push(piece.to_string());
            } else {
                out.extend(self.split_with(piece, finer));
            }
        }
        if !pending.is_empty() {
            out.extend(self.merge(&pending, separator));
        }
        out
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };
            if total + len + joiner > self.max_size && !window.is_empty() {
                push_joined(&mut docs, &window, separator);
                // Drop from the front until the remainder fits as overlap and leaves room.
                loop {
                    let joiner = if window.is_empty() { 0 } else { sep_len };
                    let overflow = total > 0 && total + len + joiner > self.max_size;
                    if total <= self.overlap && !overflow {
                        break;
                    }
                    let Some(front) = window.pop_front() else { break };
                    let trailing = if window.is_empty() { 0 } else { sep_len };
                    total -= char_len(front) + trailing;
                }
            }
            let joiner = if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
            total += len + joiner;
        }
        push_joined(&mut docs, &window, separator);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(max_size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(&ChunkingConfig { max_size, overlap })
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = splitter(1000, 50).split("The Sun is the center of our solar system.");
        assert_eq!(chunks, vec!["The Sun is the center of our solar system."]);
    }

    #[test]
    fn paragraphs_merge_until_full() {
        let text = "alpha beta\n\ngamma delta\n\nepsilon zeta";
        let chunks = splitter(24, 0).split(text);
        assert_eq!(chunks, vec!["alpha beta\n\ngamma delta", "epsilon zeta"]);
    }

    #[test]
    fn windows_respect_max_size() {
        let text = "word ".repeat(400);
        let chunks = splitter(100, 20).split(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 100, "chunk too long: {}", c.len());
        }
    }

    #[test]
    fn consecutive_windows_overlap() {
        let text: String = (0..60).map(|i| format!("w{i:02} ")).collect();
        let chunks = splitter(40, 12).split(&text);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().expect("word");
            assert!(pair[0].contains(first_word), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(25);
        let chunks = splitter(10, 0).split(&text);
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "héllo wörld ünïcode ".repeat(20);
        let chunks = splitter(16, 4).split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(splitter(10, 2).split("   ").is_empty());
        assert!(splitter(10, 2).split("").is_empty());
    }
}
