//! Reciprocal Rank Fusion of the lexical and vector ranked lists.
//!
//! Scores are rank-based only: each list contributes `1/(K + rank + 1)`
//! per document, accumulated by url. The raw engine scores never mix,
//! so BM25 and vector distance need no calibration against each other.

use std::cmp::Ordering;
use std::collections::HashMap;

use docsearch_core::types::{Provenance, RankedHit};

pub const DEFAULT_RRF_K: usize = 60;

#[derive(Debug, Clone)]
pub struct FusedHit {
    pub url: String,
    pub title: String,
    pub text: String,
    pub score: f64,
    pub provenance: Provenance,
    /// Best (lowest) rank this url reached in any contributing list.
    /// Breaks score ties deterministically.
    best_rank: usize,
}

/// Fuse two ranked lists. Either list may be empty, in which case the
/// other's order is preserved. The returned list is sorted by fused
/// score descending; ties fall back to best contributing rank, then to
/// first-seen order.
pub fn reciprocal_rank_fusion(
    lexical: &[RankedHit],
    vector: &[RankedHit],
    rrf_k: usize,
) -> Vec<FusedHit> {
    let mut fused: Vec<FusedHit> = Vec::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();

    accumulate(&mut fused, &mut by_url, lexical, Provenance::Lexical, rrf_k);
    accumulate(&mut fused, &mut by_url, vector, Provenance::Vector, rrf_k);

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.best_rank.cmp(&b.best_rank))
    });
    fused
}

fn accumulate(
    fused: &mut Vec<FusedHit>,
    by_url: &mut HashMap<String, usize>,
    hits: &[RankedHit],
    provenance: Provenance,
    rrf_k: usize,
) {
    for (rank, hit) in hits.iter().enumerate() {
        let contribution = 1.0 / ((rrf_k + rank + 1) as f64);
        match by_url.get(&hit.url) {
            Some(&i) => {
                let entry = &mut fused[i];
                entry.score += contribution;
                entry.best_rank = entry.best_rank.min(rank);
                // The lexical list carries full document text, the
                // vector list only a chunk; keep the longer body.
                if hit.text.len() > entry.text.len() {
                    entry.text = hit.text.clone();
                }
                if entry.provenance != provenance {
                    entry.provenance = Provenance::Both;
                }
            }
            None => {
                by_url.insert(hit.url.clone(), fused.len());
                fused.push(FusedHit {
                    url: hit.url.clone(),
                    title: hit.title.clone(),
                    text: hit.text.clone(),
                    score: contribution,
                    provenance,
                    best_rank: rank,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str, text: &str) -> RankedHit {
        RankedHit {
            url: url.to_string(),
            title: url.to_uppercase(),
            text: text.to_string(),
            score: 0.0,
        }
    }

    #[test]
    fn accumulates_scores_across_lists() {
        // lexical [A, B, C], vector [B, A]: A and B tie exactly on
        // score (1/61 + 1/62 each); both reached rank 0 in one list, so
        // the tie falls through to first-seen order, putting A first.
        let lexical = vec![hit("a", "alpha"), hit("b", "beta"), hit("c", "gamma")];
        let vector = vec![hit("b", "b-chunk"), hit("a", "a-chunk")];
        let fused = reciprocal_rank_fusion(&lexical, &vector, DEFAULT_RRF_K);

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].url, "a");
        assert_eq!(fused[1].url, "b");
        assert_eq!(fused[2].url, "c");
        assert!((fused[0].score - fused[1].score).abs() < 1e-12);
        assert!(fused[1].score > fused[2].score);
    }

    #[test]
    fn provenance_reflects_contributing_lists() {
        let lexical = vec![hit("a", "alpha"), hit("c", "gamma")];
        let vector = vec![hit("a", "a-chunk"), hit("v", "vee")];
        let fused = reciprocal_rank_fusion(&lexical, &vector, DEFAULT_RRF_K);

        let find = |url: &str| fused.iter().find(|h| h.url == url).unwrap();
        assert_eq!(find("a").provenance, Provenance::Both);
        assert_eq!(find("c").provenance, Provenance::Lexical);
        assert_eq!(find("v").provenance, Provenance::Vector);
    }

    #[test]
    fn keeps_the_longer_body() {
        let lexical = vec![hit("a", "the full document text, much longer than a chunk")];
        let vector = vec![hit("a", "short chunk")];
        let fused = reciprocal_rank_fusion(&lexical, &vector, DEFAULT_RRF_K);
        assert!(fused[0].text.starts_with("the full document"));

        // Same result when the vector list happens to carry more text.
        let lexical = vec![hit("a", "tiny")];
        let vector = vec![hit("a", "a chunk that is longer than the stored doc")];
        let fused = reciprocal_rank_fusion(&lexical, &vector, DEFAULT_RRF_K);
        assert!(fused[0].text.starts_with("a chunk"));
    }

    #[test]
    fn single_list_preserves_its_order() {
        let lexical = vec![hit("x", "1"), hit("y", "2"), hit("z", "3")];
        let fused = reciprocal_rank_fusion(&lexical, &[], DEFAULT_RRF_K);
        let urls: Vec<&str> = fused.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["x", "y", "z"]);
        assert!(fused.iter().all(|h| h.provenance == Provenance::Lexical));
    }

    #[test]
    fn empty_inputs_fuse_to_empty() {
        assert!(reciprocal_rank_fusion(&[], &[], DEFAULT_RRF_K).is_empty());
    }

    #[test]
    fn doubly_ranked_document_beats_single_top_rank() {
        // B appears at rank 1 in both lists: 2/62 > 1/61.
        let lexical = vec![hit("a", "alpha"), hit("b", "beta")];
        let vector = vec![hit("v", "vee"), hit("b", "b-chunk")];
        let fused = reciprocal_rank_fusion(&lexical, &vector, DEFAULT_RRF_K);
        assert_eq!(fused[0].url, "b");
    }
}
