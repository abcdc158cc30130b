//! Batch validation applied before a chunk set becomes a generation.

use std::collections::HashSet;

use tracing::warn;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Validate a batch for indexing.
///
/// - an empty batch is rejected
/// - chunks whose trimmed text is empty are dropped
/// - blank ids get a fresh UUID; colliding ids get a `#n` suffix until unique
pub fn prepare_chunks(chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
    if chunks.is_empty() {
        return Err(Error::validation("nothing to index: chunk batch is empty"));
    }
    let submitted = chunks.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(submitted);
    let mut out = Vec::with_capacity(submitted);
    for mut chunk in chunks {
        if chunk.text.trim().is_empty() {
            warn!(id = %chunk.id, "dropping chunk with empty text");
            continue;
        }
        if chunk.id.trim().is_empty() {
            chunk.id = uuid::Uuid::new_v4().to_string();
        }
        if seen.contains(&chunk.id) {
            let base = chunk.id.clone();
            let mut n = 2usize;
            while seen.contains(&format!("{base}#{n}")) {
                n += 1;
            }
            chunk.id = format!("{base}#{n}");
            warn!(original = %base, renamed = %chunk.id, "duplicate chunk id");
        }
        seen.insert(chunk.id.clone());
        out.push(chunk);
    }
    if out.is_empty() {
        return Err(Error::validation(format!(
            "nothing to index: all {submitted} chunks had empty text"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_rejected() {
        let err = prepare_chunks(vec![]).expect_err("empty");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn blank_text_is_dropped() {
        let out = prepare_chunks(vec![Chunk::new("a", "  \n"), Chunk::new("b", "kept")]).expect("ok");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "b");
    }

    #[test]
    fn only_blank_text_is_rejected() {
        let err = prepare_chunks(vec![Chunk::new("a", " ")]).expect_err("nothing left");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn duplicate_ids_are_suffixed() {
        let out = prepare_chunks(vec![
            Chunk::new("x", "one"),
            Chunk::new("x", "two"),
            Chunk::new("x#2", "three"),
            Chunk::new("x", "four"),
        ])
        .expect("ok");
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["x", "x#2", "x#2#2", "x#3"]);
    }

    #[test]
    fn blank_ids_are_generated() {
        let out = prepare_chunks(vec![Chunk::new("", "one"), Chunk::new(" ", "two")]).expect("ok");
        assert_ne!(out[0].id, out[1].id);
        assert!(!out[0].id.trim().is_empty());
    }
}
