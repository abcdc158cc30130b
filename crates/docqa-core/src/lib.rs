//! docqa-core
//!
//! Shared types, collaborator traits, the error taxonomy, configuration, and the
//! ingestion helpers (PDF pages, CSV rows, recursive splitter) used by every other crate.

pub mod chunk;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod splitter;
pub mod tabular;
pub mod timeout;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
