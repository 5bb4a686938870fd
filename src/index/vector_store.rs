//! Document-level vector store
//!
//! [`VectorStore`] is the narrow interface the retriever consumes: embed a
//! query, find the nearest documents, report their distances. [`HnswVectorStore`]
//! implements it over an [`EmbeddingProvider`] and a [`VectorIndex`], and
//! persists itself as a vector file plus a document store.

use super::vector_index::{HnswParams, VectorIndex, VectorIndexError};
use crate::corpus::{Document, DocumentMetadata};
use crate::embedding::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Vector file inside a persisted store directory
pub const VECTORS_FILE: &str = "vectors.json";
/// Document store file inside a persisted store directory
pub const DOCSTORE_FILE: &str = "docstore.json";

/// Nearest-neighbor search over documents
pub trait VectorStore: Send + Sync {
    /// The `k` documents closest to `query`, with their distances, closest first
    fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>, VectorIndexError>;

    /// Embed and insert documents, returning how many were added
    fn add_documents(&self, documents: Vec<Document>) -> Result<usize, VectorIndexError>;

    /// Insert raw texts, pairing each with the metadata at the same position
    ///
    /// `metadatas` is either empty (every text gets default metadata) or the
    /// same length as `texts`.
    fn add_texts(
        &self,
        texts: Vec<String>,
        metadatas: Vec<DocumentMetadata>,
    ) -> Result<usize, VectorIndexError> {
        if metadatas.is_empty() {
            return self.add_documents(texts.into_iter().map(Document::new).collect());
        }
        if metadatas.len() != texts.len() {
            return Err(VectorIndexError::MetadataMismatch {
                texts: texts.len(),
                metadatas: metadatas.len(),
            });
        }

        let documents = texts
            .into_iter()
            .zip(metadatas)
            .map(|(text, metadata)| Document::with_metadata(text, metadata))
            .collect();
        self.add_documents(documents)
    }

    /// Number of stored documents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tuning for [`HnswVectorStore`]
#[derive(Debug, Clone, Copy)]
pub struct VectorStoreOptions {
    pub hnsw: HnswParams,
    pub ef_search: usize,
    pub batch_size: usize,
}

impl Default for VectorStoreOptions {
    fn default() -> Self {
        Self {
            hnsw: HnswParams::default(),
            ef_search: 64,
            batch_size: 32,
        }
    }
}

#[derive(Default)]
struct StoreEntries {
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct VectorFile {
    model: String,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

/// [`VectorStore`] backed by an HNSW graph
pub struct HnswVectorStore {
    provider: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    entries: RwLock<StoreEntries>,
    options: VectorStoreOptions,
}

impl HnswVectorStore {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, options: VectorStoreOptions) -> Self {
        let index = VectorIndex::new(provider.dimension(), options.hnsw);
        Self {
            provider,
            index,
            entries: RwLock::new(StoreEntries::default()),
            options,
        }
    }

    /// Build a store and embed `documents` into it
    pub fn from_documents(
        provider: Arc<dyn EmbeddingProvider>,
        documents: Vec<Document>,
        options: VectorStoreOptions,
    ) -> Result<Self, VectorIndexError> {
        let store = Self::new(provider, options);
        store.add_documents(documents)?;
        Ok(store)
    }

    /// Restore a store saved with [`save`](Self::save)
    ///
    /// The HNSW graph is rebuilt from the stored vectors. Fails if the store was
    /// written by a different embedding model or dimension than `provider`.
    pub fn load(
        dir: &Path,
        provider: Arc<dyn EmbeddingProvider>,
        options: VectorStoreOptions,
    ) -> Result<Self, VectorIndexError> {
        let vectors_path = dir.join(VECTORS_FILE);
        let docstore_path = dir.join(DOCSTORE_FILE);
        if !vectors_path.exists() || !docstore_path.exists() {
            return Err(VectorIndexError::IndexNotFound(dir.display().to_string()));
        }

        let vector_file: VectorFile = serde_json::from_reader(BufReader::new(File::open(
            &vectors_path,
        )?))
        .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;

        let documents: Vec<Document> =
            serde_json::from_reader(BufReader::new(File::open(&docstore_path)?))
                .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;

        if vector_file.model != provider.model_name() {
            return Err(VectorIndexError::ModelMismatch {
                stored: vector_file.model,
                provider: provider.model_name().to_string(),
            });
        }
        if vector_file.dimension != provider.dimension() {
            return Err(VectorIndexError::InvalidDimension {
                expected: provider.dimension(),
                actual: vector_file.dimension,
            });
        }
        if vector_file.vectors.len() != documents.len() {
            return Err(VectorIndexError::SerializationError(format!(
                "{} vectors for {} documents",
                vector_file.vectors.len(),
                documents.len()
            )));
        }

        let store = Self::new(provider, options);
        {
            let mut entries = store.write_entries()?;
            for (id, (document, vector)) in documents
                .into_iter()
                .zip(vector_file.vectors)
                .enumerate()
            {
                store.index.insert(id, &vector)?;
                entries.documents.push(document);
                entries.vectors.push(vector);
            }
        }

        tracing::info!("Loaded vector store with {} documents from {:?}", store.len(), dir);
        Ok(store)
    }

    /// Persist vectors and documents under `dir`
    pub fn save(&self, dir: &Path) -> Result<(), VectorIndexError> {
        std::fs::create_dir_all(dir)?;
        let entries = self.read_entries()?;

        let vector_file = VectorFile {
            model: self.provider.model_name().to_string(),
            dimension: self.provider.dimension(),
            vectors: entries.vectors.clone(),
        };

        write_json(&dir.join(VECTORS_FILE), &vector_file)?;
        write_json(&dir.join(DOCSTORE_FILE), &entries.documents)?;

        tracing::info!("Saved vector store with {} documents to {:?}", entries.documents.len(), dir);
        Ok(())
    }

    /// Snapshot of the stored documents, in insertion order
    pub fn documents(&self) -> Result<Vec<Document>, VectorIndexError> {
        Ok(self.read_entries()?.documents.clone())
    }

    fn read_entries(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreEntries>, VectorIndexError> {
        self.entries
            .read()
            .map_err(|_| VectorIndexError::SearchError("vector store lock poisoned".to_string()))
    }

    fn write_entries(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, StoreEntries>, VectorIndexError> {
        self.entries
            .write()
            .map_err(|_| VectorIndexError::SearchError("vector store lock poisoned".to_string()))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), VectorIndexError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)
        .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

impl VectorStore for HnswVectorStore {
    fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>, VectorIndexError> {
        let embedding = self.provider.embed(query)?;
        let entries = self.read_entries()?;
        let neighbors = self.index.search(&embedding, k, self.options.ef_search)?;

        neighbors
            .into_iter()
            .map(|n| {
                entries
                    .documents
                    .get(n.id)
                    .map(|doc| (doc.clone(), n.distance))
                    .ok_or_else(|| {
                        VectorIndexError::SearchError(format!("No document for vector id {}", n.id))
                    })
            })
            .collect()
    }

    /// Every batch is embedded and checked before anything is inserted, so a
    /// failing batch leaves the store unchanged.
    fn add_documents(&self, documents: Vec<Document>) -> Result<usize, VectorIndexError> {
        let total = documents.len();
        let batch_size = self.options.batch_size.max(1);
        let dimension = self.index.dimension();

        let mut vectors = Vec::with_capacity(total);
        for batch in documents.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let embedded = self.provider.embed_batch(&texts)?;
            if embedded.len() != batch.len() {
                return Err(VectorIndexError::SearchError(format!(
                    "Provider returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != dimension) {
                return Err(VectorIndexError::InvalidDimension {
                    expected: dimension,
                    actual: bad.len(),
                });
            }
            tracing::debug!("Embedded batch of {} documents", batch.len());
            vectors.extend(embedded);
        }

        // Ids are positions in `entries`, so assignment and insert happen under one lock.
        let mut entries = self.write_entries()?;
        for (document, vector) in documents.into_iter().zip(vectors) {
            let id = entries.documents.len();
            self.index.insert(id, &vector)?;
            entries.documents.push(document);
            entries.vectors.push(vector);
        }

        tracing::info!("Added {} documents to vector store", total);
        Ok(total)
    }

    fn len(&self) -> usize {
        self.read_entries().map(|e| e.documents.len()).unwrap_or(0)
    }
}
