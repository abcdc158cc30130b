//! Rank fusion of the dense and lexical sub-rankings.
//!
//! Default: each list is min-max rescaled to `[0, 1]` and combined as
//! `w_dense * dense + w_lexical * lexical`, where a chunk missing from a list contributes 0
//! for that list. Ordering is fused score descending, then chunk id ascending.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use docqa_core::config::{FusionStrategy, RetrievalSettings};
use docqa_core::error::{Error, Result};
use docqa_core::traits::{ensure_positive_k, RankedIndex};
use docqa_core::types::{RankedCandidate, SearchHit};

use crate::generation::{ChunkStore, Generation};

/// Lists whose score spread is below this are treated as all-equal.
const DEGENERATE_SPREAD: f32 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub dense: f32,
    pub lexical: f32,
}

impl FusionWeights {
    /// `w_lexical` is always `1 - w_dense`.
    pub fn new(w_dense: f32) -> Result<Self> {
        if !w_dense.is_finite() || !(0.0..=1.0).contains(&w_dense) {
            return Err(Error::validation(format!("w_dense must be in [0, 1], got {w_dense}")));
        }
        Ok(Self { dense: w_dense, lexical: 1.0 - w_dense })
    }

    pub fn lexical_only() -> Self {
        Self { dense: 0.0, lexical: 1.0 }
    }

    pub fn dense_only() -> Self {
        Self { dense: 1.0, lexical: 0.0 }
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { dense: 0.5, lexical: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    pub k: usize,
    pub k_expand: usize,
    pub weights: FusionWeights,
    pub strategy: FusionStrategy,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { k: 10, k_expand: 10, weights: FusionWeights::default(), strategy: FusionStrategy::MinMax }
    }
}

impl FusionConfig {
    pub fn from_settings(settings: &RetrievalSettings) -> Result<Self> {
        ensure_positive_k(settings.k)?;
        Ok(Self {
            k: settings.k,
            k_expand: settings.k_expand,
            weights: FusionWeights::new(settings.w_dense)?,
            strategy: settings.fusion,
        })
    }

    /// Depth of each sub-ranking. Independent of the requested `k`, so normalization bounds
    /// never move as `k` grows and a shorter result is always a prefix of a longer one.
    pub fn depth(&self, corpus_len: usize) -> usize {
        corpus_len.max(self.k_expand).max(1)
    }
}

/// Min-max rescaling of one ranked list, in list order.
///
/// A degenerate list (spread below `1e-9`) maps every entry to `1.0` when the shared score is
/// positive and to `0.0` otherwise.
pub fn min_max_normalize(hits: &[SearchHit]) -> Vec<f32> {
    let Some(first) = hits.first() else { return Vec::new() };
    let (min, max) = hits
        .iter()
        .fold((first.score, first.score), |(lo, hi), h| (lo.min(h.score), hi.max(h.score)));
    let spread = max - min;
    if spread < DEGENERATE_SPREAD {
        let value = if max > 0.0 { 1.0 } else { 0.0 };
        return vec![value; hits.len()];
    }
    hits.iter().map(|h| (h.score - min) / spread).collect()
}

fn contributions(hits: &[SearchHit], weight: f32, strategy: FusionStrategy) -> Vec<f32> {
    match strategy {
        FusionStrategy::MinMax => min_max_normalize(hits).into_iter().map(|n| weight * n).collect(),
        FusionStrategy::ReciprocalRank { k } => (1..=hits.len())
            .map(|rank| weight / (k as f32 + rank as f32))
            .collect(),
    }
}

/// Merge two sub-rankings into at most `k` candidates.
pub fn fuse(
    dense: &[SearchHit],
    lexical: &[SearchHit],
    weights: FusionWeights,
    strategy: FusionStrategy,
    k: usize,
) -> Vec<RankedCandidate> {
    let mut by_id: BTreeMap<&str, RankedCandidate> = BTreeMap::new();
    let blank = |id: &str| RankedCandidate {
        chunk_id: id.to_string(),
        dense_rank: None,
        dense_score: None,
        lexical_rank: None,
        lexical_score: None,
        fused_score: 0.0,
    };

    for (i, (hit, part)) in dense.iter().zip(contributions(dense, weights.dense, strategy)).enumerate() {
        let c = by_id.entry(hit.id.as_str()).or_insert_with(|| blank(&hit.id));
        if c.dense_rank.is_none() {
            c.dense_rank = Some(i + 1);
            c.dense_score = Some(hit.score);
            c.fused_score += part;
        }
    }
    for (i, (hit, part)) in lexical.iter().zip(contributions(lexical, weights.lexical, strategy)).enumerate() {
        let c = by_id.entry(hit.id.as_str()).or_insert_with(|| blank(&hit.id));
        if c.lexical_rank.is_none() {
            c.lexical_rank = Some(i + 1);
            c.lexical_score = Some(hit.score);
            c.fused_score += part;
        }
    }

    let mut fused: Vec<RankedCandidate> = by_id.into_values().collect();
    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    fused.truncate(k);
    fused
}

/// Queries both sub-indices of one generation snapshot and fuses the results.
pub struct FusionRetriever {
    store: Arc<ChunkStore>,
    config: FusionConfig,
}

impl FusionRetriever {
    pub fn new(store: Arc<ChunkStore>, config: FusionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedCandidate>> {
        let generation = self.store.current();
        self.retrieve_in(&generation, query, k)
    }

    /// Same as `retrieve`, against a snapshot the caller already holds.
    pub fn retrieve_in(&self, generation: &Generation, query: &str, k: usize) -> Result<Vec<RankedCandidate>> {
        ensure_positive_k(k)?;
        if generation.is_empty() {
            return Ok(Vec::new());
        }
        let depth = self.config.depth(generation.len());
        let dense = generation.dense().query(query, depth)?;
        let lexical = generation.lexical().query(query, depth)?;
        let fused = fuse(&dense, &lexical, self.config.weights, self.config.strategy, k);
        debug!(
            generation = %generation.id(),
            depth,
            dense = dense.len(),
            lexical = lexical.len(),
            fused = fused.len(),
            "retrieved"
        );
        Ok(fused)
    }
}
