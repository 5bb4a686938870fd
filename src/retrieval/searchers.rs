//! Vector and keyword searchers
//!
//! Both adapt an index to ranked hits and share one failure contract: a search
//! that errors, panics or runs past its timeout yields an empty hit list and a
//! warning, never an error. Retrieval then continues on the other method alone.

use super::types::{RankedHit, RetrievalMethod};
use crate::index::{LexicalIndex, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a retrieval method produced no hits
#[derive(Error, Debug)]
pub enum MethodUnavailable {
    #[error("{method} search timed out after {limit:?}")]
    Timeout {
        method: RetrievalMethod,
        limit: Duration,
    },

    #[error("{method} search failed: {reason}")]
    Failed {
        method: RetrievalMethod,
        reason: String,
    },

    #[error("{method} search task aborted: {reason}")]
    Aborted {
        method: RetrievalMethod,
        reason: String,
    },
}

/// Run a blocking search on the blocking pool, bounded by `timeout`
async fn run_bounded<T, F>(
    method: RetrievalMethod,
    timeout: Option<Duration>,
    search: F,
) -> Result<T, MethodUnavailable>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(search);

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| MethodUnavailable::Timeout { method, limit })?,
        None => task.await,
    };

    joined
        .map_err(|e| MethodUnavailable::Aborted {
            method,
            reason: e.to_string(),
        })?
        .map_err(|reason| MethodUnavailable::Failed { method, reason })
}

fn degrade(result: Result<Vec<RankedHit>, MethodUnavailable>) -> Vec<RankedHit> {
    result.unwrap_or_else(|e| {
        tracing::warn!("{}; continuing without it", e);
        Vec::new()
    })
}

/// Ranks documents by embedding distance through a [`VectorStore`]
#[derive(Clone)]
pub struct VectorSearcher {
    store: Arc<dyn VectorStore>,
    timeout: Option<Duration>,
}

impl VectorSearcher {
    pub fn new(store: Arc<dyn VectorStore>, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    /// Top `k` hits in the store's own order; empty on any failure
    pub async fn search(&self, query: &str, k: usize) -> Vec<RankedHit> {
        degrade(self.try_search(query, k).await)
    }

    pub async fn try_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RankedHit>, MethodUnavailable> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let store = Arc::clone(&self.store);
        let query = query.to_string();
        let pairs = run_bounded(RetrievalMethod::Vector, self.timeout, move || {
            store
                .similarity_search_with_score(&query, k)
                .map_err(|e| e.to_string())
        })
        .await?;

        Ok(RankedHit::ranked(
            pairs
                .into_iter()
                .take(k)
                .map(|(document, distance)| (document, f64::from(distance))),
        ))
    }
}

/// Ranks documents by lexical score through a [`LexicalIndex`]
#[derive(Clone)]
pub struct KeywordSearcher {
    index: Arc<dyn LexicalIndex>,
    timeout: Option<Duration>,
}

impl KeywordSearcher {
    pub fn new(index: Arc<dyn LexicalIndex>, timeout: Option<Duration>) -> Self {
        Self { index, timeout }
    }

    /// Top `k` hits by BM25 score; empty on any failure
    pub async fn search(&self, query: &str, k: usize) -> Vec<RankedHit> {
        degrade(self.try_search(query, k).await)
    }

    pub async fn try_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RankedHit>, MethodUnavailable> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let index = Arc::clone(&self.index);
        let query = query.to_string();
        let pairs = run_bounded(RetrievalMethod::Keyword, self.timeout, move || {
            index
                .search_with_score(&query, k)
                .map_err(|e| e.to_string())
        })
        .await?;

        Ok(RankedHit::ranked(
            pairs
                .into_iter()
                .take(k)
                .map(|(document, score)| (document, f64::from(score))),
        ))
    }

    pub fn index(&self) -> &dyn LexicalIndex {
        self.index.as_ref()
    }
}
