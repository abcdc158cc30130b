use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::splitter::{ChunkingConfig, TextSplitter};
use crate::tabular::{csv_to_chunks, TabularConfig};
use crate::traits::PageExtractor;
use crate::types::{Chunk, FileTypeMode, MetaValue};

/// Supported upload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Csv,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "csv" => Some(FileKind::Csv),
            _ => None,
        }
    }

    pub fn mode(self) -> FileTypeMode {
        match self {
            FileKind::Pdf => FileTypeMode::Document,
            FileKind::Csv => FileTypeMode::Tabular,
        }
    }
}

/// Default page extractor backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PageExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| Error::Ingest(format!("pdf text extraction: {e}")))
    }
}

/// Chunks produced from one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct ProcessedCorpus {
    pub chunks: Vec<Chunk>,
    /// Kind of the last processed file; `None` when no supported file was found.
    pub mode: Option<FileTypeMode>,
    pub files: usize,
}

pub struct DataProcessor {
    splitter: TextSplitter,
    tabular: TabularConfig,
    pages: Box<dyn PageExtractor>,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default(), TabularConfig::default())
    }
}

impl DataProcessor {
    pub fn new(chunking: &ChunkingConfig, tabular: TabularConfig) -> Self {
        Self { splitter: TextSplitter::new(chunking), tabular, pages: Box::new(PdfTextExtractor) }
    }

    pub fn with_page_extractor(mut self, pages: Box<dyn PageExtractor>) -> Self {
        self.pages = pages;
        self
    }

    /// Process files and directories (walked recursively) in sorted path order.
    pub fn process_paths(&self, paths: &[PathBuf]) -> Result<ProcessedCorpus> {
        let files = list_supported_files(paths)?;
        if files.is_empty() {
            info!("no .pdf or .csv files found");
            return Ok(ProcessedCorpus::default());
        }
        let mut corpus = ProcessedCorpus::default();
        for (file_index, (path, kind)) in files.iter().enumerate() {
            info!(file = %path.display(), "processing file {}/{}", file_index + 1, files.len());
            let bytes = fs::read(path)?;
            let chunks = self.process_bytes(&file_stem(path), *kind, &bytes)?;
            debug!(file = %path.display(), chunks = chunks.len(), "file processed");
            corpus.chunks.extend(chunks);
            corpus.mode = Some(kind.mode());
            corpus.files += 1;
        }
        info!(files = corpus.files, chunks = corpus.chunks.len(), "processed corpus");
        Ok(corpus)
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<ProcessedCorpus> {
        self.process_paths(&[data_dir.to_path_buf()])
    }

    pub fn process_bytes(&self, stem: &str, kind: FileKind, bytes: &[u8]) -> Result<Vec<Chunk>> {
        match kind {
            FileKind::Pdf => self.pdf_chunks(stem, bytes),
            FileKind::Csv => csv_to_chunks(stem, bytes, &self.tabular),
        }
    }

    fn pdf_chunks(&self, stem: &str, bytes: &[u8]) -> Result<Vec<Chunk>> {
        let pages = self.pages.extract_pages(bytes)?;
        let mut chunks = Vec::new();
        for (page, text) in pages.iter().enumerate() {
            for piece in self.splitter.split(text) {
                let chunk_index = chunks.len() as i64;
                chunks.push(
                    Chunk::new(format!("{stem}:{chunk_index}"), piece)
                        .with_meta("source", stem)
                        .with_meta("page", MetaValue::Int(page as i64))
                        .with_meta("chunk_index", chunk_index),
                );
            }
        }
        Ok(chunks)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string())
}

fn list_supported_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, FileKind)>> {
    let mut files = Vec::new();
    for root in paths {
        if !root.exists() {
            return Err(Error::NotFound(root.display().to_string()));
        }
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            match FileKind::from_path(entry.path()) {
                Some(kind) => files.push((entry.path().to_path_buf(), kind)),
                None => debug!(file = %entry.path().display(), "skipping unsupported file"),
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files.dedup_by(|a, b| a.0 == b.0);
    Ok(files)
}
