//! Bounded waits around slow collaborators.
//!
//! The wrapped call runs on a helper thread; when the deadline passes the caller gets
//! `Error::Timeout` and the helper's eventual result is discarded.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::traits::{Embedder, Generator};

pub fn run_with_deadline<T, F>(operation: &'static str, limit: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let start = Instant::now();
    std::thread::Builder::new()
        .name(format!("docqa-{operation}"))
        .spawn(move || {
            let _ = tx.send(f());
        })?;
    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(operation, ?limit, "collaborator did not return in time");
            Err(Error::Timeout { operation, elapsed: start.elapsed() })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(match operation {
            "embed" => Error::embedding("embedding worker exited without a result"),
            _ => Error::generation("generation worker exited without a result"),
        }),
    }
}

pub struct BoundedEmbedder {
    inner: Arc<dyn Embedder>,
    limit: Duration,
}

impl BoundedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

impl Embedder for BoundedEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn id(&self) -> String { self.inner.id() }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        run_with_deadline("embed", self.limit, move || inner.embed_batch(&texts))
    }
}

pub struct BoundedGenerator {
    inner: Arc<dyn Generator>,
    limit: Duration,
}

impl BoundedGenerator {
    pub fn new(inner: Arc<dyn Generator>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

impl Generator for BoundedGenerator {
    fn generate(&self, system: &str, question: &str, context: &str) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let (system, question, context) = (system.to_string(), question.to_string(), context.to_string());
        run_with_deadline("generate", self.limit, move || inner.generate(&system, &question, &context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_call_passes_through() {
        let out = run_with_deadline("generate", Duration::from_secs(5), || Ok(7)).expect("value");
        assert_eq!(out, 7);
    }

    #[test]
    fn slow_generator_times_out() {
        let slow = |_: &str, _: &str, _: &str| -> Result<String> {
            std::thread::sleep(Duration::from_millis(500));
            Ok("late".to_string())
        };
        let bounded = BoundedGenerator::new(Arc::new(slow), Duration::from_millis(20));
        let err = bounded.generate("s", "q", "c").expect_err("should time out");
        assert!(err.is_timeout(), "got {err}");
    }
}
