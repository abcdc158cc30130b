use docqa_core::config::{EmbeddingProvider, EmbeddingSettings, GenerationProvider, GenerationSettings};
use docqa_models::{get_default_embedder, get_default_generator};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Fake, dim: 1024, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");
    assert_eq!(embedder.dim(), 1024);
    assert_eq!(embedder.id(), "fake:d1024");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_are_closer_than_disjoint_ones() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Fake, dim: 1024, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let q = embedder.embed("solar system planets").expect("q");
    let near = embedder.embed("the solar system has planets").expect("near");
    let far = embedder.embed("rust borrow checker").expect("far");
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&q, &near) > dot(&q, &far));
}

#[test]
fn extractive_generator_is_selectable() {
    let settings = GenerationSettings { provider: GenerationProvider::Extractive, ..Default::default() };
    let generator = get_default_generator(&settings).expect("generator");
    let out = generator.generate("sys", "cat?", "").expect("answer");
    assert_eq!(out, "I don't know.");
}
