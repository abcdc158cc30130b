//! CSV rows → chunks.
//!
//! Content columns are joined with single spaces (declared order) into the chunk text;
//! metadata columns are kept as scalars and never reach the text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, MetaValue, Metadata};

pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularConfig {
    pub content_columns: Vec<String>,
    pub metadata_columns: Vec<String>,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            content_columns: vec!["Title".into(), "Review".into()],
            metadata_columns: vec!["Rating".into(), "Date".into()],
        }
    }
}

impl TabularConfig {
    /// Every requested column must exist in `headers`.
    pub fn validate_columns<S: AsRef<str>>(&self, headers: &[S]) -> Result<()> {
        if self.content_columns.is_empty() {
            return Err(Error::validation("at least one content column is required"));
        }
        let known = |name: &str| headers.iter().any(|h| h.as_ref() == name);
        for name in self.content_columns.iter().chain(&self.metadata_columns) {
            if !known(name) {
                return Err(Error::validation(format!("unknown column '{name}'")));
            }
        }
        Ok(())
    }

    /// Render one row. Returns `None` when every content cell is blank.
    pub fn row_to_chunk(&self, id: String, row: &Row) -> Option<Chunk> {
        let text = self
            .content_columns
            .iter()
            .filter_map(|c| row.get(c))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            return None;
        }
        let metadata: Metadata = self
            .metadata_columns
            .iter()
            .filter_map(|c| row.get(c).map(|v| (c, v)))
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(c, v)| (c.clone(), MetaValue::infer(v)))
            .collect();
        Some(Chunk { id, text, metadata })
    }
}

/// Parse CSV bytes (header row required) into header names and rows.
pub fn parse_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<Row>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Ingest(format!("csv header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::Ingest(format!("csv row {line}: {e}")))?;
        let row: Row = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }
    Ok((headers, rows))
}

/// Parse and render a whole CSV file. Chunk ids are `{stem}:{row}`.
pub fn csv_to_chunks(stem: &str, bytes: &[u8], config: &TabularConfig) -> Result<Vec<Chunk>> {
    let (headers, rows) = parse_csv(bytes)?;
    config.validate_columns(headers.as_slice())?;
    Ok(rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| config.row_to_chunk(format!("{stem}:{i}"), row))
        .collect())
}
