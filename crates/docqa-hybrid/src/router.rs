//! Per-question dispatch between "no corpus yet" and the two retrieval framings.

use std::sync::Arc;

use tracing::info;

use docqa_core::error::Result;
use docqa_core::types::{FileTypeMode, GenerationId, RankedCandidate};

use crate::composer::AnswerComposer;
use crate::fusion::FusionRetriever;
use crate::generation::ChunkStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoCorpus,
    Document,
    Tabular,
}

impl SessionState {
    /// The only transition: a successful ingest sets the framing of its last file.
    pub fn after_ingest(self, mode: FileTypeMode) -> Self {
        match mode {
            FileTypeMode::Document => SessionState::Document,
            FileTypeMode::Tabular => SessionState::Tabular,
        }
    }

    pub fn from_mode(mode: Option<FileTypeMode>) -> Self {
        mode.map_or(SessionState::NoCorpus, |m| SessionState::NoCorpus.after_ingest(m))
    }

    pub fn mode(self) -> Option<FileTypeMode> {
        match self {
            SessionState::NoCorpus => None,
            SessionState::Document => Some(FileTypeMode::Document),
            SessionState::Tabular => Some(FileTypeMode::Tabular),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Framing used; `None` when no corpus had been ingested.
    pub mode: Option<FileTypeMode>,
    pub generation: GenerationId,
    pub candidates: Vec<RankedCandidate>,
}

pub struct SessionRouter {
    store: Arc<ChunkStore>,
    retriever: FusionRetriever,
    composer: AnswerComposer,
}

impl SessionRouter {
    pub fn new(store: Arc<ChunkStore>, retriever: FusionRetriever, composer: AnswerComposer) -> Self {
        Self { store, retriever, composer }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_mode(self.store.current().mode())
    }

    pub fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_k(question, self.retriever.config().k)
    }

    /// Retrieval and context assembly run on one snapshot; the generator is called last.
    pub fn ask_with_k(&self, question: &str, k: usize) -> Result<Answer> {
        let snapshot = self.store.current();
        let state = SessionState::from_mode(snapshot.mode());
        let (candidates, mode) = match state.mode() {
            None => (Vec::new(), FileTypeMode::Document),
            Some(mode) => (self.retriever.retrieve_in(&snapshot, question, k)?, mode),
        };
        let passages: Vec<&str> = candidates
            .iter()
            .filter_map(|c| snapshot.get(&c.chunk_id))
            .map(|c| c.text.as_str())
            .collect();
        let text = self.composer.compose(question, &passages, mode)?;
        info!(generation = %snapshot.id(), ?state, candidates = candidates.len(), "answered");
        Ok(Answer { text, mode: state.mode(), generation: snapshot.id(), candidates })
    }
}
