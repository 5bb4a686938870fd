//! Embedding generation
//!
//! The retriever only depends on the [`EmbeddingProvider`] trait, so providers
//! can be swapped without touching the index or fusion code.
//! [`FastEmbedProvider`] runs a sentence-embedding model locally.
mod provider;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
