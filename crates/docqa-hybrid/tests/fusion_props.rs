use std::collections::BTreeMap;

use proptest::prelude::*;

use docqa_core::config::FusionStrategy;
use docqa_core::traits::sort_hits;
use docqa_core::types::{SearchHit, SourceKind};
use docqa_hybrid::{fuse, min_max_normalize, FusionWeights};

fn ranked(scores: BTreeMap<u8, f32>, source: SourceKind) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = scores
        .into_iter()
        .map(|(id, score)| SearchHit { id: format!("c{id:02}"), score, source })
        .collect();
    sort_hits(&mut hits);
    hits
}

fn lists() -> impl Strategy<Value = (Vec<SearchHit>, Vec<SearchHit>)> {
    (
        prop::collection::btree_map(0u8..30, 0.0f32..10.0, 0..12),
        prop::collection::btree_map(0u8..30, 0.0f32..10.0, 0..12),
    )
        .prop_map(|(d, l)| (ranked(d, SourceKind::Dense), ranked(l, SourceKind::Lexical)))
}

proptest! {
    #[test]
    fn fused_scores_stay_within_weight_sum((dense, lexical) in lists(), w in 0.0f32..=1.0) {
        let weights = FusionWeights::new(w).unwrap();
        for c in fuse(&dense, &lexical, weights, FusionStrategy::MinMax, 50) {
            prop_assert!(c.fused_score >= 0.0);
            prop_assert!(c.fused_score <= weights.dense + weights.lexical + 1e-6);
        }
    }

    #[test]
    fn single_source_candidates_are_scaled_exactly((dense, lexical) in lists(), w in 0.0f32..=1.0) {
        let weights = FusionWeights::new(w).unwrap();
        let dense_norm = min_max_normalize(&dense);
        let lexical_norm = min_max_normalize(&lexical);
        for c in fuse(&dense, &lexical, weights, FusionStrategy::MinMax, 50) {
            match (c.dense_rank, c.lexical_rank) {
                (Some(r), None) => prop_assert_eq!(c.fused_score, weights.dense * dense_norm[r - 1]),
                (None, Some(r)) => prop_assert_eq!(c.fused_score, weights.lexical * lexical_norm[r - 1]),
                (Some(_), Some(_)) => {}
                (None, None) => prop_assert!(false, "candidate without a source"),
            }
        }
    }

    #[test]
    fn ordering_is_deterministic_and_prefix_stable((dense, lexical) in lists(), w in 0.0f32..=1.0, k in 1usize..25) {
        let weights = FusionWeights::new(w).unwrap();
        let full = fuse(&dense, &lexical, weights, FusionStrategy::MinMax, 50);
        prop_assert_eq!(&full, &fuse(&dense, &lexical, weights, FusionStrategy::MinMax, 50));
        let short = fuse(&dense, &lexical, weights, FusionStrategy::MinMax, k);
        prop_assert_eq!(&short[..], &full[..short.len()]);
        prop_assert_eq!(short.len(), k.min(full.len()));
        for pair in full.windows(2) {
            let ordered = pair[0].fused_score > pair[1].fused_score
                || (pair[0].fused_score == pair[1].fused_score && pair[0].chunk_id < pair[1].chunk_id);
            prop_assert!(ordered, "{:?} before {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn candidate_set_is_the_union_of_both_lists((dense, lexical) in lists()) {
        let fused = fuse(&dense, &lexical, FusionWeights::default(), FusionStrategy::MinMax, 100);
        let mut expected: Vec<&str> = dense.iter().chain(&lexical).map(|h| h.id.as_str()).collect();
        expected.sort_unstable();
        expected.dedup();
        let mut got: Vec<&str> = fused.iter().map(|c| c.chunk_id.as_str()).collect();
        got.sort_unstable();
        prop_assert_eq!(got, expected);
    }
}
