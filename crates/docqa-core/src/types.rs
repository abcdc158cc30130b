//! Domain types shared by the indices, the fusion layer and ingestion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ChunkId = String;
pub type Metadata = BTreeMap<String, MetaValue>;

/// A scalar metadata value. Informational only; never used in ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl MetaValue {
    /// Infer the narrowest scalar for a raw field value (CSV cells, page numbers).
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return MetaValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return MetaValue::Float(f);
            }
        }
        match trimmed {
            "true" | "True" | "TRUE" => MetaValue::Bool(true),
            "false" | "False" | "FALSE" => MetaValue::Bool(false),
            _ => MetaValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(v) => write!(f, "{v}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Bool(v) => write!(f, "{v}"),
            MetaValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

/// The atomic unit of retrieval.
///
/// - `id`: unique within a generation, stable for its lifetime
/// - `text`: the retrievable content (document excerpt or a table row rendered as prose)
/// - `metadata`: page number, rating, date, ... carried through to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Metadata::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Indicates which sub-index produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Lexical,
}

/// One entry of a single sub-index ranking.
///
/// `id` matches `Chunk::id`. `score` is index-specific but higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// A fused candidate. Ranks are 1-based positions in the sub-lists; scores are raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub chunk_id: ChunkId,
    pub dense_rank: Option<usize>,
    pub dense_score: Option<f32>,
    pub lexical_rank: Option<usize>,
    pub lexical_score: Option<f32>,
    pub fused_score: f32,
}

/// Answer-composition framing, decided by the type of the last ingested file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTypeMode {
    Document,
    Tabular,
}

impl FileTypeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FileTypeMode::Document => "document",
            FileTypeMode::Tabular => "tabular",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "document" => Some(FileTypeMode::Document),
            "tabular" => Some(FileTypeMode::Tabular),
            _ => None,
        }
    }
}

impl fmt::Display for FileTypeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenerationId(pub u64);

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}
