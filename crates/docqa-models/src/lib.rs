//! docqa-models
//!
//! Embedding and generation collaborators: Ollama over HTTP, a local candle BGE-M3
//! encoder, and offline stand-ins for tests and air-gapped runs.

pub mod bge;
pub mod device;
pub mod fake;
pub mod ollama;
pub mod pool;
pub mod tokenize;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use docqa_core::config::{expand_path, EmbeddingProvider, EmbeddingSettings, GenerationProvider, GenerationSettings};
use docqa_core::error::Result;
use docqa_core::timeout::BoundedEmbedder;
use docqa_core::traits::{Embedder, Generator};

pub use bge::BgeEmbedder;
pub use fake::{ExtractiveGenerator, FakeEmbedder};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaGenerator};
pub use pool::masked_mean_l2;

/// `APP_USE_FAKE_EMBEDDINGS=1` (or `true`) forces the hash embedder regardless of settings.
pub fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let provider = if fake_embeddings_forced() { EmbeddingProvider::Fake } else { settings.provider };
    let timeout = Duration::from_secs(settings.timeout_secs);
    let embedder: Arc<dyn Embedder> = match provider {
        EmbeddingProvider::Fake => {
            info!(dim = settings.dim, "using FakeEmbedder");
            Arc::new(FakeEmbedder::new(settings.dim))
        }
        EmbeddingProvider::Ollama => {
            info!(model = %settings.model, url = %settings.base_url, "using Ollama embedder");
            let client = OllamaClient::new(&settings.base_url, timeout)?;
            Arc::new(OllamaEmbedder::new(client, settings.model.clone(), settings.dim))
        }
        EmbeddingProvider::Local => {
            let dir = bge::resolve_model_dir(settings.model_dir.as_deref().map(expand_path).as_deref())?;
            let model: Arc<dyn Embedder> = Arc::new(BgeEmbedder::load(&dir)?);
            Arc::new(BoundedEmbedder::new(model, timeout))
        }
    };
    Ok(embedder)
}

pub fn get_default_generator(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    let generator: Arc<dyn Generator> = match settings.provider {
        GenerationProvider::Extractive => {
            info!("using ExtractiveGenerator");
            Arc::new(ExtractiveGenerator)
        }
        GenerationProvider::Ollama => {
            info!(model = %settings.model, url = %settings.base_url, "using Ollama generator");
            let client = OllamaClient::new(&settings.base_url, Duration::from_secs(settings.timeout_secs))?;
            Arc::new(OllamaGenerator::new(client, settings.model.clone(), settings.temperature))
        }
    };
    Ok(generator)
}
