use docqa_core::config::LexicalScoring;
use docqa_core::error::Error;
use docqa_core::traits::RankedIndex;
use docqa_core::types::{Chunk, SourceKind};
use docqa_text::LexicalIndex;

fn ids(hits: &[docqa_core::types::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.id.as_str()).collect()
}

fn cats_and_dogs() -> Vec<Chunk> {
    vec![Chunk::new("a", "the cat sat"), Chunk::new("b", "the dog ran")]
}

#[test]
fn unique_term_outranks_shared_terms() {
    let index = LexicalIndex::build(&cats_and_dogs(), LexicalScoring::TfIdf).expect("build");
    let hits = index.query("cat", 10).expect("query");
    assert_eq!(ids(&hits), vec!["a", "b"]);
    assert!(hits[0].score > hits[1].score);
    assert_eq!(hits[1].score, 0.0);
    assert!(hits.iter().all(|h| h.source == SourceKind::Lexical));
}

#[test]
fn unknown_tokens_score_zero_and_tie_by_id() {
    let chunks = vec![Chunk::new("z", "alpha"), Chunk::new("m", "beta"), Chunk::new("c", "gamma")];
    let index = LexicalIndex::build(&chunks, LexicalScoring::TfIdf).expect("build");
    let hits = index.query("zebra", 2).expect("query");
    assert_eq!(ids(&hits), vec!["c", "m"]);
    assert!(hits.iter().all(|h| h.score == 0.0));
}

#[test]
fn query_is_case_and_punctuation_insensitive() {
    let index = LexicalIndex::build(&cats_and_dogs(), LexicalScoring::TfIdf).expect("build");
    let hits = index.query("DOG?!", 1).expect("query");
    assert_eq!(ids(&hits), vec!["b"]);
}

#[test]
fn empty_index_returns_nothing() {
    for scoring in [LexicalScoring::TfIdf, LexicalScoring::Bm25] {
        let index = LexicalIndex::build(&[], scoring).expect("build");
        assert!(index.is_empty());
        assert!(index.query("anything", 5).expect("query").is_empty());
    }
    assert!(LexicalIndex::empty().query("x", 1).expect("query").is_empty());
}

#[test]
fn zero_k_is_rejected() {
    for scoring in [LexicalScoring::TfIdf, LexicalScoring::Bm25] {
        let index = LexicalIndex::build(&cats_and_dogs(), scoring).expect("build");
        assert!(matches!(index.query("cat", 0), Err(Error::Validation(_))));
    }
}

#[test]
fn bm25_returns_only_matching_chunks() {
    let chunks = vec![
        Chunk::new("a", "rust ownership and borrowing"),
        Chunk::new("b", "the borrow checker enforces borrowing rules in rust"),
        Chunk::new("c", "gardening in spring"),
    ];
    let index = LexicalIndex::build(&chunks, LexicalScoring::Bm25).expect("build");
    assert_eq!(index.scoring(), LexicalScoring::Bm25);
    let hits = index.query("borrowing", 10).expect("query");
    let got = ids(&hits);
    assert_eq!(got.len(), 2);
    assert!(got.contains(&"a") && got.contains(&"b"));
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn bm25_ties_break_by_id() {
    let chunks = vec![Chunk::new("y", "same words here"), Chunk::new("x", "same words here")];
    let index = LexicalIndex::build(&chunks, LexicalScoring::Bm25).expect("build");
    let hits = index.query("words", 10).expect("query");
    assert_eq!(ids(&hits), vec!["x", "y"]);
}

#[test]
fn bm25_treats_operators_as_plain_words() {
    let index = LexicalIndex::build(&cats_and_dogs(), LexicalScoring::Bm25).expect("build");
    let plain = index.query("cat dog", 10).expect("plain");
    assert_eq!(ids(&plain), vec!["a", "b"]);

    for query in ["cat AND dog", "dog -cat", "cat +dog", "+cat OR \"dog\""] {
        let hits = index.query(query, 10).expect("query");
        assert_eq!(hits, plain, "{query:?}");
    }
    assert_eq!(ids(&index.query("cat AND (", 10).expect("unbalanced")), vec!["a"]);
    assert!(index.query("-- ++", 10).expect("no tokens").is_empty());
}
