use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use docqa_core::data_processor::DataProcessor;
use docqa_core::error::{Error, Result};
use docqa_core::types::{Chunk, FileTypeMode, GenerationId};

use crate::generation::ChunkStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub generation: GenerationId,
    pub mode: FileTypeMode,
    pub files: usize,
    pub chunks: usize,
}

/// Parse uploads into chunks and rebuild the active generation from them.
pub struct IngestionPipeline {
    processor: DataProcessor,
    store: Arc<ChunkStore>,
}

impl IngestionPipeline {
    pub fn new(processor: DataProcessor, store: Arc<ChunkStore>) -> Self {
        Self { processor, store }
    }

    /// All files of one call form one generation; the last file decides the mode.
    pub fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let corpus = self.processor.process_paths(paths)?;
        let mode = corpus
            .mode
            .ok_or_else(|| Error::validation("no .pdf or .csv files to ingest"))?;
        let mut report = self.ingest_chunks(corpus.chunks, mode)?;
        report.files = corpus.files;
        Ok(report)
    }

    pub fn ingest_chunks(&self, chunks: Vec<Chunk>, mode: FileTypeMode) -> Result<IngestReport> {
        let generation = self.store.replace_all(chunks, mode)?;
        let report = IngestReport { generation: generation.id(), mode, files: 0, chunks: generation.len() };
        info!(generation = %report.generation, %mode, chunks = report.chunks, "ingest complete");
        Ok(report)
    }
}
