use crate::error::Result;
use crate::types::SearchHit;

/// Text → dense vector collaborator.
///
/// Implementations must be deterministic for identical input and return vectors of
/// exactly `dim()` components, one per input text, in input order.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Stable identifier for the provider/model (e.g. `ollama:mxbai-embed-large:d1024`).
    fn id(&self) -> String {
        format!("{}:d{}", std::any::type_name::<Self>(), self.dim())
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop()
            .ok_or_else(|| crate::error::Error::embedding("embedder returned no vector for query"))
    }
}

/// Prompt + context → prose collaborator. Request/response, no streaming.
pub trait Generator: Send + Sync {
    fn generate(&self, system: &str, question: &str, context: &str) -> Result<String>;
}

impl<F> Generator for F
where
    F: Fn(&str, &str, &str) -> Result<String> + Send + Sync,
{
    fn generate(&self, system: &str, question: &str, context: &str) -> Result<String> {
        self(system, question, context)
    }
}

/// PDF bytes → one text string per page.
pub trait PageExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// A ranked view over one generation's chunks. `k` must be positive.
pub trait RankedIndex: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// Shared ordering for ranked hits: score descending, ties by id ascending.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub fn ensure_positive_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(crate::error::Error::validation("k must be a positive integer"));
    }
    Ok(())
}
