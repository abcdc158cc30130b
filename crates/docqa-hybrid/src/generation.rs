//! Chunk store and the atomically swappable active generation.
//!
//! A generation bundles the validated chunks with the dense and lexical indices built from
//! exactly that chunk vector. Rebuilds happen off to the side under a single-writer lock and
//! become visible through one pointer swap; readers keep whatever `Arc<Generation>` they
//! already hold.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use indicatif::ProgressBar;
use tracing::{info, warn};

use docqa_core::chunk::prepare_chunks;
use docqa_core::config::LexicalScoring;
use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use docqa_core::types::{Chunk, ChunkId, FileTypeMode, GenerationId};
use docqa_text::LexicalIndex;
use docqa_vector::{DenseIndex, StoredGeneration};

pub struct Generation {
    id: GenerationId,
    mode: Option<FileTypeMode>,
    chunks: Vec<Chunk>,
    by_id: HashMap<ChunkId, usize>,
    dense: DenseIndex,
    lexical: LexicalIndex,
    fingerprint: String,
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("chunks", &self.chunks.len())
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl Generation {
    /// Generation `0`: no chunks, no mode.
    pub fn empty(embedder: Arc<dyn Embedder>) -> Self {
        Self::assemble(GenerationId(0), None, Vec::new(), DenseIndex::empty(embedder), LexicalIndex::empty())
    }

    fn assemble(
        id: GenerationId,
        mode: Option<FileTypeMode>,
        chunks: Vec<Chunk>,
        dense: DenseIndex,
        lexical: LexicalIndex,
    ) -> Self {
        let by_id = chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        let fingerprint = fingerprint(&chunks);
        Self { id, mode, chunks, by_id, dense, lexical, fingerprint }
    }

    pub fn id(&self) -> GenerationId {
        self.id
    }

    pub fn mode(&self) -> Option<FileTypeMode> {
        self.mode
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.by_id.get(id).map(|&i| &self.chunks[i])
    }

    pub fn dense(&self) -> &DenseIndex {
        &self.dense
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Snapshot for persistence: chunks in order plus their stored vectors.
    pub fn to_stored(&self) -> StoredGeneration {
        StoredGeneration {
            generation: self.id.0,
            mode: self.mode,
            embedder_id: self.dense.embedder_id(),
            fingerprint: self.fingerprint.clone(),
            dim: self.dense.dim(),
            chunks: self.chunks.clone(),
            entries: self.dense.entries().to_vec(),
            saved_at: None,
        }
    }
}

/// BLAKE3 over the ordered `(id, text)` pairs.
pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in chunks {
        hasher.update(c.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(c.text.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Owner of the active generation.
pub struct ChunkStore {
    active: RwLock<Arc<Generation>>,
    writer: Mutex<()>,
    embedder: Arc<dyn Embedder>,
    scoring: LexicalScoring,
    batch_size: usize,
    progress: ProgressBar,
}

impl ChunkStore {
    pub fn new(embedder: Arc<dyn Embedder>, scoring: LexicalScoring, batch_size: usize) -> Self {
        let empty = Arc::new(Generation::empty(embedder.clone()));
        Self {
            active: RwLock::new(empty),
            writer: Mutex::new(()),
            embedder,
            scoring,
            batch_size: batch_size.max(1),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report embedding progress of subsequent rebuilds on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn current(&self) -> Arc<Generation> {
        self.active.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Build a new generation from `chunks` and make it active. On any error the active
    /// generation is left untouched.
    pub fn replace_all(&self, chunks: Vec<Chunk>, mode: FileTypeMode) -> Result<Arc<Generation>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let chunks = prepare_chunks(chunks)?;
        let next_id = GenerationId(self.current().id().0 + 1);
        info!(generation = %next_id, chunks = chunks.len(), %mode, "building generation");

        let dense = DenseIndex::build(&chunks, self.embedder.clone(), self.batch_size, &self.progress)?;
        let lexical = LexicalIndex::build(&chunks, self.scoring)?;
        let generation = Arc::new(Generation::assemble(next_id, Some(mode), chunks, dense, lexical));
        self.progress.finish_and_clear();
        self.install(Arc::clone(&generation));
        Ok(generation)
    }

    /// Reinstall a persisted generation. Vectors are reused; the lexical model is refitted.
    pub fn restore(&self, stored: StoredGeneration) -> Result<Arc<Generation>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let expected = self.embedder.id();
        if stored.embedder_id != expected {
            return Err(Error::IndexState(format!(
                "snapshot was embedded with '{}' but the active embedder is '{expected}'",
                stored.embedder_id
            )));
        }
        if stored.chunks.len() != stored.entries.len() {
            return Err(Error::IndexState(format!(
                "snapshot has {} chunks but {} vectors",
                stored.chunks.len(),
                stored.entries.len()
            )));
        }
        if let Some((c, e)) = stored.chunks.iter().zip(&stored.entries).find(|(c, e)| c.id != e.chunk_id) {
            return Err(Error::IndexState(format!("vector '{}' is stored against chunk '{}'", e.chunk_id, c.id)));
        }
        let actual = fingerprint(&stored.chunks);
        if actual != stored.fingerprint {
            return Err(Error::IndexState(format!(
                "snapshot fingerprint {} does not match its chunks ({actual})",
                stored.fingerprint
            )));
        }

        let dense = DenseIndex::from_entries(stored.entries, self.embedder.clone())?;
        let lexical = LexicalIndex::build(&stored.chunks, self.scoring)?;
        let generation = Arc::new(Generation::assemble(
            GenerationId(stored.generation),
            stored.mode,
            stored.chunks,
            dense,
            lexical,
        ));
        if generation.is_empty() {
            warn!(generation = %generation.id(), "restored an empty generation");
        }
        self.install(Arc::clone(&generation));
        Ok(generation)
    }

    fn install(&self, generation: Arc<Generation>) {
        let previous = {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *active, generation.clone())
        };
        info!(from = %previous.id(), to = %generation.id(), chunks = generation.len(), "active generation swapped");
    }
}
