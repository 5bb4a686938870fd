use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{Result, SqlRagError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem before failing
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_paths(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SqlRagError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_paths(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is not checked: paths may still hold `~`, and the index
        // directory is created by `sqlrag index`.
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        // Explicit overrides must not be empty; unset ones fall back to data_dir.
        if config
            .storage
            .index_dir
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            errors.push(ValidationError::new(
                "storage.index_dir",
                "Index directory cannot be empty",
            ));
        }

        if config
            .corpus
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            errors.push(ValidationError::new(
                "corpus.path",
                "Corpus path cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        let indexing = &config.indexing;
        let positive = [
            ("indexing.vector_dim", indexing.vector_dim),
            ("indexing.hnsw_ef_construction", indexing.hnsw_ef_construction),
            ("indexing.hnsw_m", indexing.hnsw_m),
            ("indexing.hnsw_ef_search", indexing.hnsw_ef_search),
            ("indexing.max_elements", indexing.max_elements),
        ];

        for (path, value) in positive {
            if value == 0 {
                errors.push(ValidationError::new(path, "Must be greater than 0"));
            }
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.default_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.default_k",
                "Default k must be greater than 0",
            ));
        }

        if !retrieval.rrf_k.is_finite() || retrieval.rrf_k <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.rrf_k",
                format!("RRF k must be a positive number, got {}", retrieval.rrf_k),
            ));
        }

        for (path, weight) in [
            ("retrieval.vector_weight", retrieval.vector_weight),
            ("retrieval.keyword_weight", retrieval.keyword_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be a non-negative number, got {}", weight),
                ));
            }
        }

        if retrieval.candidate_multiplier == 0 {
            errors.push(ValidationError::new(
                "retrieval.candidate_multiplier",
                "Candidate multiplier must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn error_paths(config: &Config) -> Vec<String> {
        match ConfigValidator::validate(config) {
            Err(SqlRagError::ConfigValidation { errors }) => {
                errors.into_iter().map(|e| e.path).collect()
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_empty_corpus_path() {
        let mut config = Config::default();
        config.corpus.path = Some(PathBuf::new());
        assert_eq!(error_paths(&config), vec!["corpus.path"]);

        let mut config = Config::default();
        config.storage.data_dir = PathBuf::new();
        assert_eq!(error_paths(&config), vec!["storage.data_dir"]);
    }

    #[test]
    fn test_bad_schema_version() {
        let mut config = Config::default();
        config.meta.schema_version = "0.9.0".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.retrieval.rrf_k = 0.0;
        config.retrieval.vector_weight = -0.5;
        config.indexing.hnsw_m = 0;

        let paths = error_paths(&config);
        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&"retrieval.rrf_k".to_string()));
        assert!(paths.contains(&"retrieval.vector_weight".to_string()));
        assert!(paths.contains(&"indexing.hnsw_m".to_string()));
    }

    #[test]
    fn test_zero_weights_are_allowed() {
        let mut config = Config::default();
        config.retrieval.vector_weight = 0.0;
        config.retrieval.keyword_weight = 0.0;
        assert!(ConfigValidator::validate(&config).is_ok());
    }
}
