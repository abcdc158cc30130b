//! docqa-hybrid
//!
//! The retrieval-and-fusion engine: the chunk store with its swappable generation, the
//! fusion retriever, answer composition, session routing and the ingestion pipeline.

pub mod composer;
pub mod fusion;
pub mod generation;
pub mod pipeline;
pub mod router;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;

use docqa_core::config::Settings;
use docqa_core::data_processor::DataProcessor;
use docqa_core::error::Result;
use docqa_core::timeout::BoundedGenerator;
use docqa_core::traits::{Embedder, Generator};
use docqa_core::types::RankedCandidate;

pub use composer::AnswerComposer;
pub use fusion::{fuse, min_max_normalize, FusionConfig, FusionRetriever, FusionWeights};
pub use generation::{ChunkStore, Generation};
pub use pipeline::{IngestReport, IngestionPipeline};
pub use router::{Answer, SessionRouter, SessionState};

/// Everything wired together from `Settings`.
pub struct HybridEngine {
    store: Arc<ChunkStore>,
    retriever: FusionRetriever,
    router: SessionRouter,
    pipeline: IngestionPipeline,
}

impl HybridEngine {
    pub fn from_settings(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        progress: ProgressBar,
    ) -> Result<Self> {
        settings.validate()?;
        let r = &settings.retrieval;
        let fusion = FusionConfig::from_settings(r)?;
        let store = Arc::new(ChunkStore::new(embedder, r.lexical, r.embed_batch_size).with_progress(progress));
        let generator: Arc<dyn Generator> =
            Arc::new(BoundedGenerator::new(generator, Duration::from_secs(settings.generation.timeout_secs)));
        let router = SessionRouter::new(
            store.clone(),
            FusionRetriever::new(store.clone(), fusion.clone()),
            AnswerComposer::new(generator, r.max_context_chars),
        );
        let pipeline = IngestionPipeline::new(
            DataProcessor::new(&settings.chunking, settings.tabular.clone()),
            store.clone(),
        );
        Ok(Self { retriever: FusionRetriever::new(store.clone(), fusion), store, router, pipeline })
    }

    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.router.state()
    }

    pub fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        self.pipeline.ingest_paths(paths)
    }

    pub fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<RankedCandidate>> {
        self.retriever.retrieve(query, k.unwrap_or(self.retriever.config().k))
    }

    pub fn ask(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        match k {
            Some(k) => self.router.ask_with_k(question, k),
            None => self.router.ask(question),
        }
    }
}
