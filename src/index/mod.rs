//! Lexical and vector indexes
//!
//! - SQL-aware tokenizer shared by indexing and querying
//! - BM25 keyword index (tantivy) over a fixed corpus
//! - HNSW vector index and the document-level [`VectorStore`]
mod keyword_index;
pub mod tokenizer;
mod vector_index;
mod vector_store;

pub use keyword_index::{KeywordIndex, KeywordIndexError, KeywordSearchResult, LexicalIndex};
pub use tokenizer::{tokenize, TokenizedText};
pub use vector_index::{HnswParams, SearchResult, VectorIndex, VectorIndexError};
pub use vector_store::{
    HnswVectorStore, VectorStore, VectorStoreOptions, DOCSTORE_FILE, VECTORS_FILE,
};
