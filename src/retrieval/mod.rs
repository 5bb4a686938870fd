//! Hybrid retrieval over the example-query corpus
//!
//! Combines vector similarity and BM25 keyword ranking with weighted
//! Reciprocal Rank Fusion. Fusion weights are picked per query by the
//! [`QueryAnalyzer`] unless the caller fixes them.

mod analyzer;
mod fusion;
mod hybrid;
mod searchers;
mod types;

pub use analyzer::{QueryAnalysis, QueryAnalyzer};
pub use fusion::{reciprocal_rank_fusion, FusionConfig, FusionError, DEFAULT_RRF_K};
pub use hybrid::{HybridRetriever, SharedRetriever};
pub use searchers::{KeywordSearcher, MethodUnavailable, VectorSearcher};
pub use types::{FusionResult, FusionWeights, RankedHit, RetrievalMethod};

/// A hybrid search request
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Query text
    pub text: String,

    /// Maximum number of results
    pub limit: usize,

    /// Fixed weights, used only when `auto_adjust_weights` is off
    pub weights: Option<FusionWeights>,

    /// Let the analyzer choose weights for this query
    pub auto_adjust_weights: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
            weights: None,
            auto_adjust_weights: true,
        }
    }

    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_auto_adjust(mut self, enabled: bool) -> Self {
        self.auto_adjust_weights = enabled;
        self
    }
}
