use std::fs;
use std::path::Path;
use tempfile::TempDir;

use docqa_core::data_processor::{DataProcessor, FileKind};
use docqa_core::error::{Error, Result};
use docqa_core::splitter::ChunkingConfig;
use docqa_core::tabular::TabularConfig;
use docqa_core::traits::PageExtractor;
use docqa_core::types::{FileTypeMode, MetaValue};

/// Treats the uploaded bytes as UTF-8 with pages separated by form feeds.
struct FormFeedPages;

impl PageExtractor for FormFeedPages {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|e| Error::Ingest(e.to_string()))?;
        Ok(text.split('\u{c}').map(str::to_string).collect())
    }
}

fn processor() -> DataProcessor {
    DataProcessor::new(&ChunkingConfig { max_size: 1000, overlap: 50 }, TabularConfig::default())
        .with_page_extractor(Box::new(FormFeedPages))
}

#[test]
fn csv_rows_become_tabular_chunks() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("reviews.csv"),
        "Title,Review,Rating,Date\nGreat,Loved it,5,2024-01-01\nMeh,Too slow,2,2024-03-04\n",
    )
    .unwrap();

    let corpus = processor().process_directory(tmp.path()).expect("process");

    assert_eq!(corpus.mode, Some(FileTypeMode::Tabular));
    assert_eq!(corpus.files, 1);
    assert_eq!(corpus.chunks.len(), 2);
    assert_eq!(corpus.chunks[0].id, "reviews:0");
    assert_eq!(corpus.chunks[0].text, "Great Loved it");
    assert_eq!(corpus.chunks[0].metadata.get("Rating"), Some(&MetaValue::Int(5)));
    assert_eq!(corpus.chunks[0].metadata.get("Date"), Some(&MetaValue::Text("2024-01-01".into())));
    assert_eq!(corpus.chunks[0].metadata.len(), 2);
    assert!(!corpus.chunks[1].text.contains("2024"), "metadata never reaches the text");
}

#[test]
fn pdf_pages_carry_page_metadata() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("manual.pdf"), "first page text\u{c}second page text").unwrap();

    let corpus = processor().process_directory(tmp.path()).expect("process");

    assert_eq!(corpus.mode, Some(FileTypeMode::Document));
    assert_eq!(corpus.chunks.len(), 2);
    assert_eq!(corpus.chunks[0].id, "manual:0");
    assert_eq!(corpus.chunks[1].id, "manual:1");
    assert_eq!(corpus.chunks[1].metadata.get("page"), Some(&MetaValue::Int(1)));
    assert_eq!(corpus.chunks[1].metadata.get("source"), Some(&MetaValue::Text("manual".into())));
}

#[test]
fn mode_follows_the_last_file_in_path_order() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a_manual.pdf"), "page one").unwrap();
    fs::write(tmp.path().join("b_reviews.csv"), "Title,Review,Rating,Date\nOk,Fine,3,2024-01-01\n").unwrap();

    let corpus = processor().process_directory(tmp.path()).expect("process");
    assert_eq!(corpus.files, 2);
    assert_eq!(corpus.mode, Some(FileTypeMode::Tabular));

    let only_pdf = processor().process_paths(&[tmp.path().join("a_manual.pdf")]).expect("process");
    assert_eq!(only_pdf.mode, Some(FileTypeMode::Document));
}

#[test]
fn unsupported_files_are_ignored() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.txt"), "plain text").unwrap();

    let corpus = processor().process_directory(tmp.path()).expect("process");
    assert!(corpus.chunks.is_empty());
    assert_eq!(corpus.mode, None);
}

#[test]
fn missing_path_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = processor().process_paths(&[tmp.path().join("nope")]).expect_err("missing");
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn file_kind_is_case_insensitive() {
    assert_eq!(FileKind::from_path(Path::new("A.PDF")), Some(FileKind::Pdf));
    assert_eq!(FileKind::from_path(Path::new("rows.Csv")), Some(FileKind::Csv));
    assert_eq!(FileKind::from_path(Path::new("readme.md")), None);
}
