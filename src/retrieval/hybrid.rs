//! Hybrid search combining vector and keyword retrieval

use super::analyzer::{QueryAnalysis, QueryAnalyzer};
use super::fusion::{reciprocal_rank_fusion, FusionConfig};
use super::searchers::{KeywordSearcher, VectorSearcher};
use super::types::{FusionResult, FusionWeights, RetrievalMethod};
use super::SearchQuery;
use crate::config::RetrievalConfig;
use crate::corpus::Document;
use crate::error::{Result, SqlRagError};
use crate::index::{KeywordIndex, KeywordIndexError, LexicalIndex, VectorStore};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Hybrid retriever over one corpus: a vector store plus a BM25 index built
/// from the same documents
pub struct HybridRetriever {
    analyzer: QueryAnalyzer,
    vector: VectorSearcher,
    keyword: KeywordSearcher,
    config: RetrievalConfig,
}

impl HybridRetriever {
    /// Build the keyword index from `documents` and pair it with `vector_store`
    ///
    /// Fails with [`SqlRagError::IndexBuild`] when `documents` is empty.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        documents: Vec<Document>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let index = KeywordIndex::build(documents).map_err(|e| match e {
            KeywordIndexError::EmptyCorpus => {
                SqlRagError::IndexBuild("corpus contains no documents".to_string())
            }
            other => SqlRagError::IndexBuild(other.to_string()),
        })?;

        tracing::info!(
            documents = index.len(),
            vectors = vector_store.len(),
            "Hybrid retriever ready"
        );

        Ok(Self::from_indexes(vector_store, Arc::new(index), config))
    }

    /// Pair an existing lexical index with a vector store
    pub fn from_indexes(
        vector_store: Arc<dyn VectorStore>,
        keyword_index: Arc<dyn LexicalIndex>,
        config: RetrievalConfig,
    ) -> Self {
        let timeout = config.search_timeout();
        Self {
            analyzer: QueryAnalyzer::new(),
            vector: VectorSearcher::new(vector_store, timeout),
            keyword: KeywordSearcher::new(keyword_index, timeout),
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Number of documents in the keyword corpus
    pub fn len(&self) -> usize {
        self.keyword.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.index().is_empty()
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        self.analyzer.analyze(query)
    }

    /// Weights used for `query`: analyzer recommendation when auto-adjusting,
    /// otherwise the caller's weights, otherwise the configured defaults
    pub fn resolve_weights(&self, query: &SearchQuery) -> FusionWeights {
        if query.auto_adjust_weights {
            return self.analyzer.analyze(&query.text).recommended_weights;
        }

        query
            .weights
            .unwrap_or_else(|| self.config.default_weights())
    }

    /// Run both methods concurrently and fuse their rankings
    ///
    /// A method that fails or times out contributes nothing; the other
    /// method's ranking is fused alone. Returns at most `query.limit` results.
    pub async fn hybrid_search(&self, query: &SearchQuery) -> Vec<FusionResult> {
        if query.limit == 0 || query.text.trim().is_empty() {
            return Vec::new();
        }

        let weights = self.resolve_weights(query);
        let candidates = self.config.candidate_count(query.limit);

        let (vector_hits, keyword_hits) = tokio::join!(
            self.vector.search(&query.text, candidates),
            self.keyword.search(&query.text, candidates)
        );

        tracing::debug!(
            vector_hits = vector_hits.len(),
            keyword_hits = keyword_hits.len(),
            candidates,
            "Collected candidates"
        );

        let fusion_config = FusionConfig::new(self.config.rrf_k, weights).unwrap_or_else(|e| {
            tracing::warn!("{}; using default RRF constant", e);
            FusionConfig {
                weights,
                ..FusionConfig::default()
            }
        });

        let mut fused = reciprocal_rank_fusion(&vector_hits, &keyword_hits, &fusion_config);
        fused.truncate(query.limit);
        fused
    }

    /// Retrieve the top `k` documents with the chosen method
    ///
    /// Vector and keyword methods bypass fusion and return their own ranking.
    pub async fn search(&self, query: &str, k: usize, method: RetrievalMethod) -> Vec<Document> {
        match method {
            RetrievalMethod::Hybrid => {
                let query = SearchQuery::new(query, k)
                    .with_auto_adjust(self.config.auto_adjust_weights);
                self.hybrid_search(&query)
                    .await
                    .into_iter()
                    .map(|r| r.document)
                    .collect()
            }
            RetrievalMethod::Vector => self
                .vector
                .search(query, k)
                .await
                .into_iter()
                .map(|h| h.document)
                .collect(),
            RetrievalMethod::Keyword => self
                .keyword
                .search(query, k)
                .await
                .into_iter()
                .map(|h| h.document)
                .collect(),
        }
    }
}

/// Retriever handle that can be swapped atomically after a re-index
///
/// Searches clone the current `Arc` and run without holding the lock, so a
/// replacement never waits for in-flight queries and they finish on the
/// retriever they started with.
pub struct SharedRetriever {
    current: RwLock<Arc<HybridRetriever>>,
}

impl SharedRetriever {
    pub fn new(retriever: HybridRetriever) -> Self {
        Self {
            current: RwLock::new(Arc::new(retriever)),
        }
    }

    pub async fn current(&self) -> Arc<HybridRetriever> {
        Arc::clone(&*self.current.read().await)
    }

    /// Install `retriever`, returning the one it replaced
    pub async fn replace(&self, retriever: HybridRetriever) -> Arc<HybridRetriever> {
        let mut guard = self.current.write().await;
        std::mem::replace(&mut *guard, Arc::new(retriever))
    }

    pub async fn hybrid_search(&self, query: &SearchQuery) -> Vec<FusionResult> {
        self.current().await.hybrid_search(query).await
    }
}
