//! Shared retrieval types: ranked hits, fusion weights, fused results

use crate::corpus::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which retrieval method produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Vector,
    Keyword,
    Hybrid,
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMethod::Vector => write!(f, "vector"),
            RetrievalMethod::Keyword => write!(f, "keyword"),
            RetrievalMethod::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for RetrievalMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vector" => Ok(RetrievalMethod::Vector),
            "keyword" => Ok(RetrievalMethod::Keyword),
            "hybrid" => Ok(RetrievalMethod::Hybrid),
            other => Err(format!(
                "unknown retrieval method '{}', expected hybrid, vector or keyword",
                other
            )),
        }
    }
}

/// One document's position in a single method's result list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    pub document: Document,
    /// Raw method-specific score: cosine distance for vector hits (smaller is
    /// closer), BM25 score for keyword hits (larger is better)
    pub score: f64,
    /// 1-based position in the method's output
    pub rank: usize,
}

impl RankedHit {
    /// Assign 1-based ranks in iteration order
    pub fn ranked(hits: impl IntoIterator<Item = (Document, f64)>) -> Vec<RankedHit> {
        hits.into_iter()
            .enumerate()
            .map(|(i, (document, score))| RankedHit {
                document,
                score,
                rank: i + 1,
            })
            .collect()
    }
}

/// Relative weight of the vector and keyword rankings during fusion
///
/// Always normalized so the two weights sum to 1.0. Negative or non-finite
/// inputs count as zero; two zero weights become 0.5 / 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionWeights {
    vector_weight: f64,
    keyword_weight: f64,
}

impl FusionWeights {
    pub fn new(vector_weight: f64, keyword_weight: f64) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let vector_weight = clean(vector_weight);
        let keyword_weight = clean(keyword_weight);

        let total = vector_weight + keyword_weight;
        if total <= 0.0 {
            return Self::equal();
        }

        Self {
            vector_weight: vector_weight / total,
            keyword_weight: keyword_weight / total,
        }
    }

    pub fn equal() -> Self {
        Self {
            vector_weight: 0.5,
            keyword_weight: 0.5,
        }
    }

    pub fn vector_weight(&self) -> f64 {
        self.vector_weight
    }

    pub fn keyword_weight(&self) -> f64 {
        self.keyword_weight
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::new(0.7, 0.3)
    }
}

/// A document after Reciprocal Rank Fusion, with per-method provenance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionResult {
    pub document: Document,
    /// Raw vector score, 0.0 if the vector method did not return the document
    pub vector_score: f64,
    /// Raw keyword score, 0.0 if the keyword method did not return the document
    pub keyword_score: f64,
    pub fusion_score: f64,
    /// Rank used for fusion; one past the last vector hit when absent
    pub rank_vector: usize,
    /// Rank used for fusion; one past the last keyword hit when absent
    pub rank_keyword: usize,
    pub method: RetrievalMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_normalize() {
        for (a, b) in [(0.7, 0.3), (2.0, 1.0), (0.0, 5.0), (1e-6, 3.0), (10.0, 10.0)] {
            let w = FusionWeights::new(a, b);
            assert!((w.vector_weight() + w.keyword_weight() - 1.0).abs() < 1e-9);
        }

        let w = FusionWeights::new(2.0, 1.0);
        assert!((w.vector_weight() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_weights() {
        let w = FusionWeights::new(0.0, 0.0);
        assert_eq!(w.vector_weight(), 0.5);
        assert_eq!(w.keyword_weight(), 0.5);

        let w = FusionWeights::new(-1.0, f64::NAN);
        assert_eq!(w, FusionWeights::equal());
    }

    #[test]
    fn test_default_weights() {
        let w = FusionWeights::default();
        assert!((w.vector_weight() - 0.7).abs() < 1e-9);
        assert!((w.keyword_weight() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_ranks_are_one_based() {
        let hits = RankedHit::ranked(vec![
            (Document::new("a"), 0.1),
            (Document::new("b"), 0.2),
        ]);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("Hybrid".parse::<RetrievalMethod>(), Ok(RetrievalMethod::Hybrid));
        assert_eq!(RetrievalMethod::Keyword.to_string(), "keyword");
        assert!("fuzzy".parse::<RetrievalMethod>().is_err());
    }
}
