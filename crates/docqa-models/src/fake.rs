//! Offline collaborators: a hash embedder for tests and a passage-echo generator.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use docqa_core::error::Result;
use docqa_core::traits::{Embedder, Generator};

/// Deterministic bag-of-words hash embedder. Shared tokens give nearby vectors.
#[derive(Debug, Clone)]
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn id(&self) -> String { format!("fake:d{}", self.dim) }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Answers with the context passage sharing the most words with the question.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

pub const NO_ANSWER: &str = "I don't know.";

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Generator for ExtractiveGenerator {
    fn generate(&self, _system: &str, question: &str, context: &str) -> Result<String> {
        let asked = words(question);
        let mut best: Option<(usize, &str)> = None;
        for passage in context.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            let overlap = words(passage).intersection(&asked).count();
            if best.map_or(true, |(score, _)| overlap > score) {
                best = Some((overlap, passage));
            }
        }
        Ok(best.map_or_else(|| NO_ANSWER.to_string(), |(_, passage)| passage.to_string()))
    }
}
