//! Reciprocal Rank Fusion (RRF).
//!
//! `score(d) = Σ_r 1 / (k + rank_r(d))`, with 1-indexed ranks. Only rank
//! positions matter, so rankers with incomparable score scales (BM25 vs
//! cosine similarity) can be merged without normalization.

use std::collections::HashMap;
use std::hash::Hash;

/// Standard `k` from Cormack, Clarke & Buettcher (SIGIR 2009).
pub const RRF_K: usize = 60;

/// Merge any number of ranked lists, best first.
///
/// Each input list must already be ordered best-first. Items present in
/// several lists accumulate contributions. Ties are broken by item order
/// (`Ord`) so the output is deterministic.
pub fn reciprocal_rank_fusion<T>(rankings: &[Vec<T>], k: usize) -> Vec<(T, f64)>
where
    T: Clone + Eq + Hash + Ord,
{
    let k_param = k as f64;
    let mut scores: HashMap<T, f64> = HashMap::new();

    for ranking in rankings {
        for (rank, item) in ranking.iter().enumerate() {
            let rank_position = (rank + 1) as f64;
            *scores.entry(item.clone()).or_insert(0.0) += 1.0 / (k_param + rank_position);
        }
    }

    let mut combined: Vec<(T, f64)> = scores.into_iter().collect();
    combined.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrf_items_in_both_lists_rank_first() {
        let vector = vec![1, 2, 3];
        let keyword = vec![3, 1, 4];

        let fused = reciprocal_rank_fusion(&[vector, keyword], RRF_K);

        let top: Vec<i32> = fused.iter().take(2).map(|(id, _)| *id).collect();
        assert!(top.contains(&1));
        assert!(top.contains(&3));
        assert_eq!(fused.len(), 4);
    }

    #[test]
    fn test_rrf_single_ranker_preserves_order() {
        let fused = reciprocal_rank_fusion(&[vec!["a", "b", "c"], vec![]], RRF_K);
        let order: Vec<&str> = fused.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rrf_all_empty() {
        let fused: Vec<(i32, f64)> = reciprocal_rank_fusion(&[vec![], vec![], vec![]], RRF_K);
        assert!(fused.is_empty());
    }

    #[test]
    fn test_rrf_score_value() {
        let fused = reciprocal_rank_fusion(&[vec!["x"], vec!["x"]], 60);
        assert!((fused[0].1 - 2.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_rrf_ties_break_by_item() {
        let fused = reciprocal_rank_fusion(&[vec!["b"], vec!["a"]], RRF_K);
        assert_eq!(fused[0].0, "a");
        assert_eq!(fused[1].0, "b");
    }

    #[test]
    fn test_rrf_three_rankers() {
        // "m" is mid-ranked everywhere; "t" tops one list only.
        let fused = reciprocal_rank_fusion(
            &[vec!["t", "m"], vec!["a", "m"], vec!["b", "m"]],
            RRF_K,
        );
        assert_eq!(fused[0].0, "m");
    }
}
