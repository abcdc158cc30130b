//! Smoothed TF-IDF over the chunk batch of one generation.
//!
//! The model is fitted once and never updated: `idf(t) = ln((N + 1) / (df(t) + 1)) + 1`,
//! chunk rows are `tf × idf` and L2-normalized, and a query is scored against every row by
//! sparse dot product (cosine).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use docqa_core::error::Result;
use docqa_core::traits::{ensure_positive_k, sort_hits};
use docqa_core::types::{Chunk, ChunkId, SearchHit, SourceKind};

use crate::tantivy_utils::tokenize;

/// Sparse row: `(term index, weight)` sorted by term index.
type SparseRow = Vec<(usize, f32)>;

#[derive(Debug, Clone, Default)]
pub struct TfIdfModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    ids: Vec<ChunkId>,
    rows: Vec<SparseRow>,
}

impl TfIdfModel {
    pub fn fit(chunks: &[Chunk]) -> Self {
        let tokenized: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let distinct: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in distinct {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = chunks.len() as f32;
        let mut vocabulary = HashMap::with_capacity(df.len());
        let mut idf = Vec::with_capacity(df.len());
        for (index, (term, count)) in df.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), index);
            idf.push(((n + 1.0) / (count as f32 + 1.0)).ln() + 1.0);
        }

        let mut model = Self { vocabulary, idf, ids: Vec::with_capacity(chunks.len()), rows: Vec::new() };
        model.rows = tokenized.iter().map(|tokens| model.weigh(tokens)).collect();
        model.ids = chunks.iter().map(|c| c.id.clone()).collect();
        model
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    /// Query vector under the fitted vocabulary; unknown tokens are ignored.
    pub fn vectorize(&self, text: &str) -> SparseRow {
        self.weigh(&tokenize(text))
    }

    pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        ensure_positive_k(k)?;
        if self.ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.vectorize(text);
        let mut hits: Vec<SearchHit> = self
            .ids
            .iter()
            .zip(&self.rows)
            .map(|(id, row)| SearchHit { id: id.clone(), score: dot(&query, row), source: SourceKind::Lexical })
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    fn weigh(&self, tokens: &[String]) -> SparseRow {
        let mut tf: BTreeMap<usize, f32> = BTreeMap::new();
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *tf.entry(index).or_insert(0.0) += 1.0;
            }
        }
        let mut row: SparseRow = tf.into_iter().map(|(i, count)| (i, count * self.idf[i])).collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }
}

fn dot(a: &[(usize, f32)], b: &[(usize, f32)]) -> f32 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_is_smoothed() {
        let chunks = vec![Chunk::new("a", "the cat sat"), Chunk::new("b", "the dog ran")];
        let model = TfIdfModel::fit(&chunks);
        assert_eq!(model.vocabulary_len(), 5);
        assert!((model.idf("the").unwrap() - 1.0).abs() < 1e-6);
        assert!((model.idf("cat").unwrap() - (1.5f32.ln() + 1.0)).abs() < 1e-6);
        assert_eq!(model.idf("bird"), None);
    }

    #[test]
    fn rows_are_unit_length() {
        let model = TfIdfModel::fit(&[Chunk::new("a", "red red green blue")]);
        let q = model.vectorize("red green blue");
        let norm = q.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sparse_dot_matches_shared_terms_only() {
        assert_eq!(dot(&[(0, 1.0), (2, 2.0)], &[(1, 5.0), (2, 3.0)]), 6.0);
        assert_eq!(dot(&[], &[(1, 5.0)]), 0.0);
    }
}
