//! Reciprocal Rank Fusion algorithm for combining ranked lists

use super::types::{FusionResult, FusionWeights, RankedHit, RetrievalMethod};
use ahash::AHashMap;
use thiserror::Error;

/// Standard RRF smoothing constant
pub const DEFAULT_RRF_K: f64 = 60.0;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid RRF constant {0}: must be finite and positive")]
    InvalidRrfK(f64),
}

/// Configuration for fusion algorithm
#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    /// RRF K constant; larger values flatten the advantage of top ranks
    pub rrf_k: f64,

    pub weights: FusionWeights,
}

impl FusionConfig {
    pub fn new(rrf_k: f64, weights: FusionWeights) -> Result<Self, FusionError> {
        if !rrf_k.is_finite() || rrf_k <= 0.0 {
            return Err(FusionError::InvalidRrfK(rrf_k));
        }

        Ok(Self { rrf_k, weights })
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            weights: FusionWeights::default(),
        }
    }
}

/// Apply Reciprocal Rank Fusion to the vector and keyword rankings
///
/// score(d) = w_v / (k + rank_v(d)) + w_k / (k + rank_k(d))
///
/// Only ranks are used; raw scores are carried through for provenance but
/// never compared. A document missing from one list takes the rank one past
/// that list's last entry. Documents are joined on their identity key; if a
/// key repeats within one list, its first (best-ranked) entry is used.
///
/// # Returns
/// Every document from either list, sorted by fusion score descending. Ties
/// keep vector order first, then keyword order for keyword-only documents.
pub fn reciprocal_rank_fusion(
    vector_hits: &[RankedHit],
    keyword_hits: &[RankedHit],
    config: &FusionConfig,
) -> Vec<FusionResult> {
    let mut order: Vec<String> = Vec::with_capacity(vector_hits.len() + keyword_hits.len());

    let mut vector_map: AHashMap<String, &RankedHit> = AHashMap::with_capacity(vector_hits.len());
    for hit in vector_hits {
        let key = hit.document.identity_key();
        if !vector_map.contains_key(&key) {
            order.push(key.clone());
            vector_map.insert(key, hit);
        }
    }

    let mut keyword_map: AHashMap<String, &RankedHit> =
        AHashMap::with_capacity(keyword_hits.len());
    for hit in keyword_hits {
        let key = hit.document.identity_key();
        if !keyword_map.contains_key(&key) {
            if !vector_map.contains_key(&key) {
                order.push(key.clone());
            }
            keyword_map.insert(key, hit);
        }
    }

    let absent_vector_rank = vector_hits.len() + 1;
    let absent_keyword_rank = keyword_hits.len() + 1;
    let weights = config.weights;

    let mut results: Vec<FusionResult> = order
        .iter()
        .filter_map(|key| {
            let vector = vector_map.get(key).copied();
            let keyword = keyword_map.get(key).copied();

            let method = match (vector, keyword) {
                (Some(_), Some(_)) => RetrievalMethod::Hybrid,
                (Some(_), None) => RetrievalMethod::Vector,
                (None, Some(_)) => RetrievalMethod::Keyword,
                (None, None) => return None,
            };

            let rank_vector = vector.map_or(absent_vector_rank, |h| h.rank);
            let rank_keyword = keyword.map_or(absent_keyword_rank, |h| h.rank);

            let rrf_vector = 1.0 / (config.rrf_k + rank_vector as f64);
            let rrf_keyword = 1.0 / (config.rrf_k + rank_keyword as f64);
            let fusion_score =
                weights.vector_weight() * rrf_vector + weights.keyword_weight() * rrf_keyword;

            let document = vector.or(keyword)?.document.clone();

            Some(FusionResult {
                document,
                vector_score: vector.map_or(0.0, |h| h.score),
                keyword_score: keyword.map_or(0.0, |h| h.score),
                fusion_score,
                rank_vector,
                rank_keyword,
                method,
            })
        })
        .collect();

    // Stable: equal scores keep insertion order.
    results.sort_by(|a, b| b.fusion_score.total_cmp(&a.fusion_score));

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Document, DocumentMetadata};

    fn doc(id: &str) -> Document {
        Document::with_metadata(
            format!("SELECT {}", id),
            DocumentMetadata {
                source: Some("test".to_string()),
                chunk: Some(id.to_string()),
                ..Default::default()
            },
        )
    }

    fn hits(ids: &[&str], base_score: f64) -> Vec<RankedHit> {
        RankedHit::ranked(
            ids.iter()
                .enumerate()
                .map(|(i, id)| (doc(id), base_score + i as f64)),
        )
    }

    fn find<'a>(results: &'a [FusionResult], id: &str) -> &'a FusionResult {
        results
            .iter()
            .find(|r| r.document.metadata.chunk.as_deref() == Some(id))
            .unwrap()
    }

    #[test]
    fn test_rrf_basic() {
        let vector = hits(&["1", "2", "3"], 0.1);
        let keyword = hits(&["2", "1", "4"], 5.0);

        let config = FusionConfig::new(60.0, FusionWeights::new(1.0, 1.0)).unwrap();
        let fused = reciprocal_rank_fusion(&vector, &keyword, &config);

        assert_eq!(fused.len(), 4);
        // 1 and 2 appear in both lists with mirrored ranks and tie; vector order wins.
        assert_eq!(fused[0].document.identity_key(), "test_1");
        assert_eq!(fused[1].document.identity_key(), "test_2");
        assert!((fused[0].fusion_score - fused[1].fusion_score).abs() < 1e-12);
    }

    #[test]
    fn test_absent_document_penalty() {
        let vector = hits(&["a", "b", "c", "d", "e"], 0.1);
        let keyword = hits(&["f", "g", "h", "i", "j"], 9.0);

        let config = FusionConfig::new(60.0, FusionWeights::new(0.7, 0.3)).unwrap();
        let fused = reciprocal_rank_fusion(&vector, &keyword, &config);

        let a = find(&fused, "a");
        assert_eq!(a.rank_vector, 1);
        assert_eq!(a.rank_keyword, 6);
        assert_eq!(a.method, RetrievalMethod::Vector);
        assert_eq!(a.keyword_score, 0.0);

        let expected = 0.7 / 61.0 + 0.3 / 66.0;
        assert!((a.fusion_score - expected).abs() < 1e-12);

        let f = find(&fused, "f");
        assert_eq!(f.rank_vector, 6);
        assert_eq!(f.method, RetrievalMethod::Keyword);
        assert_eq!(f.vector_score, 0.0);
    }

    #[test]
    fn test_method_tagging() {
        let vector = hits(&["x", "y"], 0.1);
        let keyword = hits(&["y", "z"], 2.0);

        let fused = reciprocal_rank_fusion(&vector, &keyword, &FusionConfig::default());

        assert_eq!(find(&fused, "y").method, RetrievalMethod::Hybrid);
        assert_eq!(find(&fused, "x").method, RetrievalMethod::Vector);
        assert_eq!(find(&fused, "z").method, RetrievalMethod::Keyword);

        let y = find(&fused, "y");
        assert!((y.vector_score - 1.1).abs() < 1e-12);
        assert_eq!(y.keyword_score, 2.0);
    }

    #[test]
    fn test_sorted_descending() {
        let vector = hits(&["1", "2", "3", "4", "5", "6"], 0.1);
        let keyword = hits(&["6", "5", "9", "1", "8"], 1.0);

        let fused = reciprocal_rank_fusion(&vector, &keyword, &FusionConfig::default());
        for pair in fused.windows(2) {
            assert!(pair[0].fusion_score >= pair[1].fusion_score);
        }
    }

    #[test]
    fn test_weighted() {
        let vector = hits(&["1"], 0.1);
        let keyword = hits(&["2"], 3.0);

        let config = FusionConfig::new(60.0, FusionWeights::new(0.7, 0.3)).unwrap();
        let fused = reciprocal_rank_fusion(&vector, &keyword, &config);
        assert_eq!(fused[0].document.identity_key(), "test_1");

        let config = FusionConfig::new(60.0, FusionWeights::new(0.3, 0.7)).unwrap();
        let fused = reciprocal_rank_fusion(&vector, &keyword, &config);
        assert_eq!(fused[0].document.identity_key(), "test_2");
    }

    #[test]
    fn test_single_list() {
        let keyword = hits(&["a", "b"], 1.0);
        let fused = reciprocal_rank_fusion(&[], &keyword, &FusionConfig::default());

        assert_eq!(fused.len(), 2);
        assert!(fused.iter().all(|r| r.method == RetrievalMethod::Keyword));
        assert!(fused.iter().all(|r| r.rank_vector == 1));
        assert_eq!(fused[0].document.identity_key(), "test_a");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reciprocal_rank_fusion(&[], &[], &FusionConfig::default()).is_empty());
    }

    #[test]
    fn test_duplicate_key_uses_first() {
        let vector = RankedHit::ranked(vec![(doc("a"), 0.1), (doc("a"), 0.5), (doc("b"), 0.9)]);
        let fused = reciprocal_rank_fusion(&vector, &[], &FusionConfig::default());

        assert_eq!(fused.len(), 2);
        let a = find(&fused, "a");
        assert_eq!(a.rank_vector, 1);
        assert_eq!(a.vector_score, 0.1);
    }

    #[test]
    fn test_invalid_rrf_k() {
        assert!(FusionConfig::new(0.0, FusionWeights::default()).is_err());
        assert!(FusionConfig::new(f64::INFINITY, FusionWeights::default()).is_err());
    }
}
