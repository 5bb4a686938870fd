//! Configuration management for sqlrag
//!
//! Loads the TOML configuration, applies `SQLRAG_` environment overrides and
//! named profiles, and validates the result before anything uses it.

use crate::error::{Result, SqlRagError};
use crate::index::{HnswParams, VectorStoreOptions};
use crate::retrieval::FusionWeights;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Supported configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Where persisted state lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for everything sqlrag writes; other paths default beneath it
    pub data_dir: PathBuf,
    /// Directory holding the vector file and document store (default `<data_dir>/index`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_dir: Option<PathBuf>,
}

/// Example-query catalog location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Corpus file (default `<data_dir>/corpus.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub vector_dim: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_search: usize,
    pub max_elements: usize,
}

/// Hybrid retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results returned when the caller gives no `k`
    pub default_k: usize,
    /// RRF smoothing constant
    pub rrf_k: f64,
    pub vector_weight: f64,
    pub keyword_weight: f64,
    /// Let the query analyzer pick weights per query
    pub auto_adjust_weights: bool,
    /// Candidates fetched per method: `max(k * candidate_multiplier, min_candidates)`
    pub candidate_multiplier: usize,
    pub min_candidates: usize,
    /// Per-method search timeout in milliseconds; 0 disables it
    pub search_timeout_ms: u64,
}

impl RetrievalConfig {
    /// Configured fallback weights, normalized
    pub fn default_weights(&self) -> FusionWeights {
        FusionWeights::new(self.vector_weight, self.keyword_weight)
    }

    /// How many candidates each method fetches for a final top-`k`
    pub fn candidate_count(&self, k: usize) -> usize {
        k.saturating_mul(self.candidate_multiplier)
            .max(self.min_candidates)
    }

    pub fn search_timeout(&self) -> Option<Duration> {
        (self.search_timeout_ms > 0).then(|| Duration::from_millis(self.search_timeout_ms))
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 4,
            rrf_k: 60.0,
            vector_weight: 0.7,
            keyword_weight: 0.3,
            auto_adjust_weights: true,
            candidate_multiplier: 2,
            min_candidates: 10,
            search_timeout_ms: 10_000,
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_adjust_weights: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_weight: Option<f64>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SqlRagError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SqlRagError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SqlRagError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SqlRagError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| SqlRagError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(auto) = overrides.auto_adjust_weights {
            self.retrieval.auto_adjust_weights = auto;
        }
        if let Some(w) = overrides.vector_weight {
            self.retrieval.vector_weight = w;
        }
        if let Some(w) = overrides.keyword_weight {
            self.retrieval.keyword_weight = w;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: SQLRAG_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("SQLRAG_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            "STORAGE__INDEX_DIR" => self.storage.index_dir = Some(PathBuf::from(value)),
            "CORPUS__PATH" => self.corpus.path = Some(PathBuf::from(value)),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__BATCH_SIZE" => self.embedding.batch_size = parse_env(path, value)?,
            "INDEXING__HNSW_EF_SEARCH" => self.indexing.hnsw_ef_search = parse_env(path, value)?,
            "RETRIEVAL__DEFAULT_K" => self.retrieval.default_k = parse_env(path, value)?,
            "RETRIEVAL__RRF_K" => self.retrieval.rrf_k = parse_env(path, value)?,
            "RETRIEVAL__VECTOR_WEIGHT" => self.retrieval.vector_weight = parse_env(path, value)?,
            "RETRIEVAL__KEYWORD_WEIGHT" => self.retrieval.keyword_weight = parse_env(path, value)?,
            "RETRIEVAL__AUTO_ADJUST_WEIGHTS" => {
                self.retrieval.auto_adjust_weights = parse_env(path, value)?
            }
            "RETRIEVAL__SEARCH_TIMEOUT_MS" => {
                self.retrieval.search_timeout_ms = parse_env(path, value)?
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Options for building or loading the HNSW vector store
    pub fn vector_store_options(&self) -> VectorStoreOptions {
        VectorStoreOptions {
            hnsw: HnswParams {
                m: self.indexing.hnsw_m,
                ef_construction: self.indexing.hnsw_ef_construction,
                max_elements: self.indexing.max_elements,
            },
            ef_search: self.indexing.hnsw_ef_search,
            batch_size: self.embedding.batch_size,
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SqlRagError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("sqlrag").join("config.toml"))
    }

    /// Vector store directory, unexpanded
    pub fn index_dir(&self) -> PathBuf {
        self.storage
            .index_dir
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("index"))
    }

    /// Corpus file, unexpanded
    pub fn corpus_path(&self) -> PathBuf {
        self.corpus
            .path
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("corpus.json"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| SqlRagError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or_else(|| {
                SqlRagError::Config("Cannot determine home directory".to_string())
            })?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.sqlrag"),
                index_dir: None,
            },
            corpus: CorpusConfig::default(),
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
            },
            indexing: IndexingConfig {
                vector_dim: 384,
                hnsw_ef_construction: 200,
                hnsw_m: 16,
                hnsw_ef_search: 64,
                max_elements: 100_000,
            },
            retrieval: RetrievalConfig::default(),
            profiles: HashMap::new(),
        }
    }
}
