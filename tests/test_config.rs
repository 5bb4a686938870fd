//! Configuration loading tests

use sqlrag::config::{Config, ProfileOverrides};
use sqlrag::SqlRagError;
use tempfile::TempDir;

#[test]
fn test_save_and_load_default() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sqlrag").join("config.toml");

    Config::default().save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();

    assert_eq!(loaded.meta.schema_version, "1.0.0");
    assert_eq!(loaded.embedding.model, "all-MiniLM-L6-v2");
    assert_eq!(loaded.indexing.vector_dim, 384);
    assert!(loaded.retrieval.auto_adjust_weights);
}

#[test]
fn test_missing_file() {
    let temp = TempDir::new().unwrap();
    let result = Config::load(&temp.path().join("absent.toml"));
    assert!(matches!(result, Err(SqlRagError::ConfigNotFound { .. })));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");

    let mut config = Config::default();
    config.retrieval.candidate_multiplier = 0;
    config.embedding.batch_size = 0;
    config.save(&path).unwrap();

    match Config::load(&path) {
        Err(SqlRagError::ConfigValidation { errors }) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_load_with_profile() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "lexical".to_string(),
        ProfileOverrides {
            auto_adjust_weights: Some(false),
            vector_weight: Some(0.25),
            keyword_weight: Some(0.75),
            ..Default::default()
        },
    );
    config.save(&path).unwrap();

    let loaded = Config::load_with_profile(&path, "lexical").unwrap();
    assert!(!loaded.retrieval.auto_adjust_weights);
    let weights = loaded.retrieval.default_weights();
    assert!((weights.vector_weight() - 0.25).abs() < 1e-9);
    assert!((weights.keyword_weight() - 0.75).abs() < 1e-9);

    assert!(Config::load_with_profile(&path, "unknown").is_err());
}

#[test]
fn test_partial_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[_meta]\nschema_version = \"1.0.0\"\n").unwrap();

    assert!(matches!(Config::load(&path), Err(SqlRagError::Toml(_))));
}
