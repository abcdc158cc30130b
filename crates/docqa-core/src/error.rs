use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed input at a call boundary (empty batch, `k == 0`, unknown column).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The embedding collaborator failed or returned vectors of the wrong shape.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The generation collaborator failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout { operation: &'static str, elapsed: Duration },

    /// A persisted or assembled generation is internally inconsistent.
    #[error("Inconsistent index state: {0}")]
    IndexState(String),

    #[error("Ingestion failed: {0}")]
    Ingest(String),

    #[error("Lexical index error: {0}")]
    Index(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn embedding(msg: impl std::fmt::Display) -> Self {
        Error::Embedding(msg.to_string())
    }

    pub fn generation(msg: impl std::fmt::Display) -> Self {
        Error::Generation(msg.to_string())
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Error::Storage(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
