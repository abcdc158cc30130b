//! In-memory dense index over one generation's chunk vectors.
//!
//! Vectors are produced once at build time (batched through the embedder) or restored from a
//! persisted snapshot; queries embed the query text and rank every entry by cosine similarity.

use std::sync::Arc;

use indicatif::ProgressBar;
use tracing::{debug, info};

use docqa_core::error::{Error, Result};
use docqa_core::traits::{ensure_positive_k, sort_hits, Embedder, RankedIndex};
use docqa_core::types::{Chunk, ChunkId, SearchHit, SourceKind};

#[derive(Debug, Clone, PartialEq)]
pub struct DenseEntry {
    pub chunk_id: ChunkId,
    pub vector: Vec<f32>,
}

pub struct DenseIndex {
    embedder: Arc<dyn Embedder>,
    dim: usize,
    entries: Vec<DenseEntry>,
    norms: Vec<f32>,
}

impl DenseIndex {
    pub fn empty(embedder: Arc<dyn Embedder>) -> Self {
        let dim = embedder.dim();
        Self { embedder, dim, entries: Vec::new(), norms: Vec::new() }
    }

    /// Embed every chunk text in batches of `batch_size`. Any count or dimension mismatch
    /// aborts the build.
    pub fn build(chunks: &[Chunk], embedder: Arc<dyn Embedder>, batch_size: usize, progress: &ProgressBar) -> Result<Self> {
        let dim = embedder.dim();
        let batch_size = batch_size.max(1);
        progress.set_length(chunks.len() as u64);
        progress.set_position(0);
        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                if vector.len() != dim {
                    return Err(Error::embedding(format!(
                        "vector for chunk '{}' has dimension {} (expected {dim})",
                        chunk.id,
                        vector.len()
                    )));
                }
                entries.push(DenseEntry { chunk_id: chunk.id.clone(), vector });
            }
            progress.inc(batch.len() as u64);
            debug!(done = entries.len(), total = chunks.len(), "embedded batch");
        }
        info!(entries = entries.len(), dim, embedder = %embedder.id(), "dense index built");
        Ok(Self::assemble(embedder, dim, entries))
    }

    /// Rebuild from stored vectors without calling the embedder.
    pub fn from_entries(entries: Vec<DenseEntry>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dim = embedder.dim();
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
            return Err(Error::IndexState(format!(
                "stored vector for '{}' has dimension {} but the embedder produces {dim}",
                bad.chunk_id,
                bad.vector.len()
            )));
        }
        Ok(Self::assemble(embedder, dim, entries))
    }

    fn assemble(embedder: Arc<dyn Embedder>, dim: usize, entries: Vec<DenseEntry>) -> Self {
        let norms = entries.iter().map(|e| l2(&e.vector)).collect();
        Self { embedder, dim, entries, norms }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[DenseEntry] {
        &self.entries
    }

    pub fn embedder_id(&self) -> String {
        self.embedder.id()
    }

    /// Rank entries against an already embedded query.
    pub fn query_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        ensure_positive_k(k)?;
        if query.len() != self.dim {
            return Err(Error::embedding(format!(
                "query vector has dimension {} (expected {})",
                query.len(),
                self.dim
            )));
        }
        let qn = l2(query);
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .zip(&self.norms)
            .map(|(e, &en)| {
                let score = if qn == 0.0 || en == 0.0 { 0.0 } else { dot(query, &e.vector) / (qn * en) };
                SearchHit { id: e.chunk_id.clone(), score, source: SourceKind::Dense }
            })
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }
}

impl RankedIndex for DenseIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        ensure_positive_k(k)?;
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(text)?;
        self.query_vector(&query, k)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}
