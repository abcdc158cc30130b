use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Chunk rows of one generation; `ordinal` preserves the ingestion order.
pub fn build_chunks_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("ordinal", DataType::Int32, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("metadata", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}

pub fn meta_table_name(collection: &str) -> String {
	format!("{collection}_meta")
}

/// The two chunk tables of a collection. Saves alternate between them and the meta table
/// names the one holding the committed generation.
pub fn chunk_table_names(collection: &str) -> [String; 2] {
	[format!("{collection}_a"), format!("{collection}_b")]
}
