//! LanceDB persistence of a generation snapshot.
//!
//! A collection is two chunk tables, `<collection>_a` and `<collection>_b`, plus
//! `<collection>_meta`, a key/value table describing the committed generation. A save
//! rewrites the chunk table that is not committed and then overwrites the meta table, whose
//! `table` key points at the new rows. A save interrupted before the meta write leaves the
//! previous generation loadable. Nothing is ever upserted.

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray,
};
use chrono::Utc;
use lancedb::database::CreateTableMode;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use tracing::{debug, info};

use docqa_core::error::{Error, Result};
use docqa_core::types::{Chunk, FileTypeMode, Metadata};

use crate::dense::DenseEntry;
use crate::schema::{build_chunks_schema, build_meta_schema, chunk_table_names, meta_table_name};

/// Everything needed to reinstall a generation without re-embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGeneration {
    pub generation: u64,
    pub mode: Option<FileTypeMode>,
    pub embedder_id: String,
    pub fingerprint: String,
    pub dim: usize,
    /// Chunks in ingestion order; `entries[i]` holds the vector of `chunks[i]`.
    pub chunks: Vec<Chunk>,
    pub entries: Vec<DenseEntry>,
    pub saved_at: Option<String>,
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(Error::storage)
}

pub async fn save_generation(conn: &Connection, collection: &str, snapshot: &StoredGeneration) -> Result<()> {
    let meta_name = meta_table_name(collection);
    let committed = read_meta(conn, &meta_name).await?.remove("table");
    let [first, second] = chunk_table_names(collection);
    let target = if committed.as_deref() == Some(first.as_str()) { second } else { first };

    write_chunks(conn, &target, snapshot).await?;

    let saved_at = Utc::now().to_rfc3339();
    let pairs = [
        ("generation", snapshot.generation.to_string()),
        ("mode", snapshot.mode.map(|m| m.as_str().to_string()).unwrap_or_else(|| "none".to_string())),
        ("embedder_id", snapshot.embedder_id.clone()),
        ("fingerprint", snapshot.fingerprint.clone()),
        ("dim", snapshot.dim.to_string()),
        ("table", target.clone()),
        ("saved_at", saved_at),
    ];
    write_meta(conn, &meta_name, &pairs).await?;
    info!(collection, table = %target, generation = snapshot.generation, rows = snapshot.chunks.len(), "generation saved");
    Ok(())
}

/// Recreate `table` with the snapshot's chunk rows. Does not touch the meta table.
pub async fn write_chunks(conn: &Connection, table: &str, snapshot: &StoredGeneration) -> Result<()> {
    if snapshot.chunks.len() != snapshot.entries.len() {
        return Err(Error::IndexState(format!(
            "{} chunks but {} vectors",
            snapshot.chunks.len(),
            snapshot.entries.len()
        )));
    }
    let dim = i32::try_from(snapshot.dim).map_err(|_| Error::IndexState(format!("dimension {} too large", snapshot.dim)))?;
    let schema = build_chunks_schema(dim);

    let mut ids = Vec::with_capacity(snapshot.chunks.len());
    let mut ordinals = Vec::with_capacity(snapshot.chunks.len());
    let mut texts = Vec::with_capacity(snapshot.chunks.len());
    let mut metas = Vec::with_capacity(snapshot.chunks.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(snapshot.chunks.len());
    for (i, (chunk, entry)) in snapshot.chunks.iter().zip(&snapshot.entries).enumerate() {
        if chunk.id != entry.chunk_id || entry.vector.len() != snapshot.dim {
            return Err(Error::IndexState(format!("vector row {i} does not match chunk '{}'", chunk.id)));
        }
        ids.push(chunk.id.clone());
        ordinals.push(i as i32);
        texts.push(chunk.text.clone());
        metas.push(serde_json::to_string(&chunk.metadata).map_err(Error::storage)?);
        vectors.push(Some(entry.vector.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Int32Array::from(ordinals)),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(metas)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
        ],
    )
    .map_err(Error::storage)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    conn.create_table(table, reader)
        .mode(CreateTableMode::Overwrite)
        .execute()
        .await
        .map_err(Error::storage)?;
    debug!(table, rows = snapshot.chunks.len(), "chunk table written");
    Ok(())
}

async fn write_meta(conn: &Connection, table: &str, pairs: &[(&str, String)]) -> Result<()> {
    let now = Utc::now().timestamp_millis();
    let batch = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(pairs.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(pairs.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(vec![now; pairs.len()])),
        ],
    )
    .map_err(Error::storage)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), build_meta_schema()));
    conn.create_table(table, reader)
        .mode(CreateTableMode::Overwrite)
        .execute()
        .await
        .map_err(Error::storage)?;
    Ok(())
}

pub async fn read_meta(conn: &Connection, table: &str) -> Result<HashMap<String, String>> {
    let names = conn.table_names().execute().await.map_err(Error::storage)?;
    if !names.contains(&table.to_string()) {
        return Ok(HashMap::new());
    }
    let t = conn.open_table(table).execute().await.map_err(Error::storage)?;
    let mut out = HashMap::new();
    let mut stream = t.query().execute().await.map_err(Error::storage)?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await.map_err(Error::storage)? {
        let keys = string_column(&batch, "key")?;
        let values = string_column(&batch, "value")?;
        for i in 0..batch.num_rows() {
            out.insert(keys.value(i).to_string(), values.value(i).to_string());
        }
    }
    Ok(out)
}

/// `None` when the collection has never been saved.
pub async fn load_generation(conn: &Connection, collection: &str) -> Result<Option<StoredGeneration>> {
    let meta_name = meta_table_name(collection);
    let meta = read_meta(conn, &meta_name).await?;
    if meta.is_empty() {
        debug!(collection, "no persisted generation");
        return Ok(None);
    }
    let field = |key: &str| {
        meta.get(key)
            .cloned()
            .ok_or_else(|| Error::IndexState(format!("meta key '{key}' missing from {meta_name}")))
    };
    let generation: u64 = field("generation")?
        .parse()
        .map_err(|e| Error::IndexState(format!("bad generation: {e}")))?;
    let dim: usize = field("dim")?.parse().map_err(|e| Error::IndexState(format!("bad dim: {e}")))?;
    let mode = FileTypeMode::parse(&field("mode")?);
    let embedder_id = field("embedder_id")?;
    let fingerprint = field("fingerprint")?;
    let table = field("table")?;
    let saved_at = meta.get("saved_at").cloned();

    let names = conn.table_names().execute().await.map_err(Error::storage)?;
    if !names.contains(&table) {
        return Err(Error::IndexState(format!("{meta_name} points at missing table '{table}'")));
    }
    let t = conn.open_table(&table).execute().await.map_err(Error::storage)?;
    let count = t.count_rows(None).await.map_err(Error::storage)?;
    let mut rows: Vec<(i32, Chunk, DenseEntry)> = Vec::with_capacity(count);
    if count > 0 {
        let mut stream = t.query().limit(count).execute().await.map_err(Error::storage)?;
        while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await.map_err(Error::storage)? {
            read_chunk_rows(&batch, dim, &mut rows)?;
        }
    }
    rows.sort_by_key(|(ordinal, _, _)| *ordinal);
    let (chunks, entries): (Vec<Chunk>, Vec<DenseEntry>) = rows.into_iter().map(|(_, c, e)| (c, e)).unzip();
    Ok(Some(StoredGeneration { generation, mode, embedder_id, fingerprint, dim, chunks, entries, saved_at }))
}

fn read_chunk_rows(batch: &RecordBatch, dim: usize, rows: &mut Vec<(i32, Chunk, DenseEntry)>) -> Result<()> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let metas = string_column(batch, "metadata")?;
    let ordinals = batch
        .column_by_name("ordinal")
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| Error::IndexState("column 'ordinal' missing".into()))?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| Error::IndexState("column 'vector' missing".into()))?;
    for i in 0..batch.num_rows() {
        let id = ids.value(i).to_string();
        if vectors.is_null(i) {
            return Err(Error::IndexState(format!("chunk '{id}' has no vector")));
        }
        let list = vectors.value(i);
        let vector: Vec<f32> = list.as_primitive::<Float32Type>().values().iter().copied().collect();
        if vector.len() != dim {
            return Err(Error::IndexState(format!("chunk '{id}' has a {}-d vector, expected {dim}", vector.len())));
        }
        let metadata: Metadata = serde_json::from_str(metas.value(i))
            .map_err(|e| Error::IndexState(format!("bad metadata for '{id}': {e}")))?;
        let chunk = Chunk { id: id.clone(), text: texts.value(i).to_string(), metadata };
        rows.push((ordinals.value(i), chunk, DenseEntry { chunk_id: id, vector }));
    }
    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::IndexState(format!("column '{name}' missing")))
}
