//! sqlrag - Hybrid retrieval of example SQL queries
//!
//! Given a natural-language question, finds the most relevant examples in a
//! catalog of SQL queries by fusing vector similarity with BM25 keyword
//! ranking. Fusion weights adapt to how SQL-like the question reads.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod index;
pub mod retrieval;

pub use error::{Result, SqlRagError};
