/// HNSW vector index for nearest-neighbor search
use crate::embedding::EmbeddingError;
use hnsw_rs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Upper bound on HNSW layers (hnsw_rs caps at 16)
const MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Embedding model mismatch: index built with {stored}, provider is {provider}")]
    ModelMismatch { stored: String, provider: String },

    #[error("Got {metadatas} metadata entries for {texts} texts")]
    MetadataMismatch { texts: usize, metadatas: usize },
}

/// Neighbor returned by [`VectorIndex::search`]
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Id the vector was inserted under
    pub id: usize,
    /// Cosine distance (0.0 = identical direction, smaller is closer)
    pub distance: f32,
}

/// HNSW graph parameters
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    pub m: usize,
    pub ef_construction: usize,
    pub max_elements: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            max_elements: 100_000,
        }
    }
}

/// Approximate nearest-neighbor index using cosine distance
pub struct VectorIndex {
    index: Hnsw<'static, f32, DistCosine>,
    dimension: usize,
    count: AtomicUsize,
}

impl VectorIndex {
    pub fn new(dimension: usize, params: HnswParams) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            params.m,
            params.max_elements,
            MAX_LAYERS,
            params.ef_construction,
            DistCosine,
        );

        Self {
            index,
            dimension,
            count: AtomicUsize::new(0),
        }
    }

    /// Insert a vector under `id`
    pub fn insert(&self, id: usize, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimension(vector)?;
        self.index.insert((vector, id));
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Search for the `k` nearest neighbors, closest first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>, VectorIndexError> {
        self.check_dimension(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .index
            .search(query, k, ef_search.max(k))
            .into_iter()
            .map(|neighbor| SearchResult {
                id: neighbor.d_id,
                distance: neighbor.distance,
            })
            .collect();

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(results)
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, hot: &[(usize, f32)]) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        for (i, x) in hot {
            v[*i] = *x;
        }
        v
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::new(8, HnswParams::default());
        assert_eq!(index.dimension(), 8);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let index = VectorIndex::new(8, HnswParams::default());

        index.insert(0, &axis(8, &[(0, 1.0)])).unwrap();
        index.insert(1, &axis(8, &[(1, 1.0)])).unwrap();
        index.insert(2, &axis(8, &[(0, 0.9), (1, 0.1)])).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&axis(8, &[(0, 1.0)]), 2, 50).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 0);
        assert_eq!(results[1].id, 2);
        assert!(results[0].distance <= results[1].distance);
        assert!(results[0].distance < 0.01);
    }

    #[test]
    fn test_empty_search() {
        let index = VectorIndex::new(4, HnswParams::default());
        let results = index.search(&[1.0, 0.0, 0.0, 0.0], 3, 16).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let index = VectorIndex::new(384, HnswParams::default());

        let result = index.insert(1, &[1.0; 128]);
        assert!(matches!(
            result,
            Err(VectorIndexError::InvalidDimension {
                expected: 384,
                actual: 128
            })
        ));
        assert!(index.search(&[1.0; 3], 1, 16).is_err());
    }
}
