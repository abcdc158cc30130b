//! docqa-text
//!
//! Lexical side of the hybrid index. `TfIdfModel` is the default scorer; `Bm25Index`
//! (tantivy, in RAM) is the alternative. Both share the analyzer in `tantivy_utils`.

pub mod bm25;
pub mod tantivy_utils;
pub mod tfidf;

use docqa_core::config::LexicalScoring;
use docqa_core::error::Result;
use docqa_core::traits::RankedIndex;
use docqa_core::types::{Chunk, SearchHit};

pub use bm25::Bm25Index;
pub use tfidf::TfIdfModel;

/// Lexical index of one generation; the scoring discipline is fixed at build time.
pub enum LexicalIndex {
    TfIdf(TfIdfModel),
    Bm25(Bm25Index),
}

impl LexicalIndex {
    pub fn build(chunks: &[Chunk], scoring: LexicalScoring) -> Result<Self> {
        Ok(match scoring {
            LexicalScoring::TfIdf => LexicalIndex::TfIdf(TfIdfModel::fit(chunks)),
            LexicalScoring::Bm25 => LexicalIndex::Bm25(Bm25Index::build(chunks)?),
        })
    }

    pub fn empty() -> Self {
        LexicalIndex::TfIdf(TfIdfModel::default())
    }

    pub fn scoring(&self) -> LexicalScoring {
        match self {
            LexicalIndex::TfIdf(_) => LexicalScoring::TfIdf,
            LexicalIndex::Bm25(_) => LexicalScoring::Bm25,
        }
    }
}

impl RankedIndex for LexicalIndex {
    fn len(&self) -> usize {
        match self {
            LexicalIndex::TfIdf(m) => m.len(),
            LexicalIndex::Bm25(b) => b.len(),
        }
    }

    fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        match self {
            LexicalIndex::TfIdf(m) => m.query(text, k),
            LexicalIndex::Bm25(b) => b.query(text, k),
        }
    }
}
