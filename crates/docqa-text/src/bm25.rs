use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument, Term};
use tracing::debug;

use docqa_core::error::{Error, Result};
use docqa_core::traits::{ensure_positive_k, sort_hits};
use docqa_core::types::{Chunk, SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, tokenize};

fn index_err(e: tantivy::TantivyError) -> Error {
	Error::Index(e.to_string())
}

/// In-RAM tantivy index scored with BM25. Built once per generation.
pub struct Bm25Index {
	reader: IndexReader,
	id_field: Field,
	text_field: Field,
	len: usize,
}

impl Bm25Index {
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let id_field = schema.get_field("id").map_err(index_err)?;
		let text_field = schema.get_field("text").map_err(index_err)?;

		let mut index_writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000).map_err(index_err)?;
		for c in chunks {
			index_writer
				.add_document(doc!(id_field => c.id.clone(), text_field => c.text.clone()))
				.map_err(index_err)?;
		}
		index_writer.commit().map_err(index_err)?;
		let reader = index.reader().map_err(index_err)?;
		debug!(docs = chunks.len(), "bm25 index committed");
		Ok(Self { reader, id_field, text_field, len: chunks.len() })
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Only chunks matching at least one query term are returned. The query is normalized like
	/// the indexed text and every token is an optional clause; operators have no meaning.
	pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
		ensure_positive_k(k)?;
		if self.len == 0 {
			return Ok(Vec::new());
		}
		let clauses: Vec<(Occur, Box<dyn Query>)> = tokenize(text)
			.into_iter()
			.map(|token| {
				let term = Term::from_field_text(self.text_field, &token);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		if clauses.is_empty() {
			return Ok(Vec::new());
		}
		let q = BooleanQuery::new(clauses);
		let searcher = self.reader.searcher();
		// Fetch every match so ties can be re-ordered by id before truncation.
		let top_docs = searcher.search(&q, &TopDocs::with_limit(self.len)).map_err(index_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
			let id = doc
				.get_first(self.id_field)
				.and_then(|v| v.as_str())
				.ok_or_else(|| Error::Index(format!("document {addr:?} has no stored id")))?;
			hits.push(SearchHit { id: id.to_string(), score, source: SourceKind::Lexical });
		}
		sort_hits(&mut hits);
		hits.truncate(k);
		Ok(hits)
	}
}
