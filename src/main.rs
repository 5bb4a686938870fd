use sqlrag::cli::{Cli, Commands, ConfigAction};
use sqlrag::config::{expand_path, Config};
use sqlrag::corpus::load_corpus;
use sqlrag::embedding::{EmbeddingProvider, FastEmbedProvider};
use sqlrag::error::{Result, SqlRagError};
use sqlrag::index::{HnswVectorStore, VectorStore};
use sqlrag::retrieval::{
    FusionResult, FusionWeights, HybridRetriever, QueryAnalyzer, RetrievalMethod, SearchQuery,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { corpus } => {
            cmd_index(cli.config, cli.profile, corpus)?;
        }
        Commands::Search {
            query,
            k,
            method,
            vector_weight,
            keyword_weight,
            no_auto_weights,
            json,
        } => {
            let weights = match (vector_weight, keyword_weight) {
                (Some(v), Some(k)) => Some(FusionWeights::new(v, k)),
                _ => None,
            };
            let options = SearchOptions {
                k,
                method,
                weights,
                no_auto_weights,
                json,
            };
            cmd_search(cli.config, cli.profile, &query, options).await?;
        }
        Commands::Analyze { query, json } => {
            cmd_analyze(&query, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "sqlrag=debug" } else { "sqlrag=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct SearchOptions {
    k: Option<usize>,
    method: RetrievalMethod,
    weights: Option<FusionWeights>,
    no_auto_weights: bool,
    json: bool,
}

fn cmd_index(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    corpus: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, profile)?;

    let corpus_path = expand_path(&corpus.unwrap_or_else(|| config.corpus_path()))?;
    let documents = load_corpus(&corpus_path)?;
    if documents.is_empty() {
        return Err(SqlRagError::IndexBuild(format!(
            "corpus {} contains no documents",
            corpus_path.display()
        )));
    }

    let provider = embedding_provider(&config)?;
    let count = documents.len();
    tracing::info!("Embedding {} documents with {}", count, provider.model_name());

    let store = HnswVectorStore::from_documents(provider, documents, config.vector_store_options())?;

    let index_dir = expand_path(&config.index_dir())?;
    store.save(&index_dir)?;

    println!("✓ Indexed {} examples", count);
    println!("  Corpus: {}", corpus_path.display());
    println!("  Index:  {}", index_dir.display());
    Ok(())
}

async fn cmd_search(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    query: &str,
    options: SearchOptions,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let retriever = open_retriever(&config)?;
    let k = options.k.unwrap_or(config.retrieval.default_k);

    if options.method != RetrievalMethod::Hybrid {
        let documents = retriever.search(query, k, options.method).await;
        if options.json {
            print_json(&documents)?;
        } else if documents.is_empty() {
            println!("No matching examples found.");
        } else {
            for (i, doc) in documents.iter().enumerate() {
                println!("{}. [{}]", i + 1, options.method);
                println!("{}\n", doc.content);
            }
        }
        return Ok(());
    }

    let mut search = SearchQuery::new(query, k)
        .with_auto_adjust(config.retrieval.auto_adjust_weights && !options.no_auto_weights);
    if let Some(weights) = options.weights {
        search = search.with_weights(weights).with_auto_adjust(false);
    }

    let results = retriever.hybrid_search(&search).await;

    if options.json {
        print_json(&results)?;
    } else if results.is_empty() {
        println!("No matching examples found.");
    } else {
        let weights = retriever.resolve_weights(&search);
        println!(
            "Weights: vector {:.2} / keyword {:.2}\n",
            weights.vector_weight(),
            weights.keyword_weight()
        );
        for (i, result) in results.iter().enumerate() {
            print_result(i + 1, result);
        }
    }

    Ok(())
}

fn print_result(position: usize, result: &FusionResult) {
    println!(
        "{}. [{}] fusion {:.5} (vector rank {}, keyword rank {})",
        position, result.method, result.fusion_score, result.rank_vector, result.rank_keyword
    );
    if let Some(table) = result
        .document
        .metadata
        .table
        .as_deref()
        .or(result.document.metadata.tables.as_deref())
    {
        println!("   Tables: {}", table);
    }
    println!("{}\n", result.document.content);
}

fn cmd_analyze(query: &str, json: bool) -> Result<()> {
    let analysis = QueryAnalyzer::new().analyze(query);

    if json {
        return print_json(&analysis);
    }

    println!("Query: {}", query);
    println!("  Table names:     {}", analysis.has_table_names);
    println!("  SQL functions:   {}", analysis.has_sql_functions);
    println!("  Joins:           {}", analysis.has_joins);
    println!("  Technical terms: {}", analysis.technical_term_count);
    println!("  Schema query:    {}", analysis.is_schema_query);
    println!(
        "  Weights:         vector {:.2} / keyword {:.2}",
        analysis.recommended_weights.vector_weight(),
        analysis.recommended_weights.keyword_weight()
    );
    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let value = serde_json::to_value(&config).map_err(|e| SqlRagError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let shown = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    SqlRagError::Config(format!("Unknown config section: {}", section))
                })?,
                None => value,
            };
            print_json(&shown)?;
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'sqlrag config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}

fn embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = FastEmbedProvider::new(&config.embedding.model)?;
    if provider.dimension() != config.indexing.vector_dim {
        return Err(SqlRagError::InvalidConfigValue {
            path: "indexing.vector_dim".to_string(),
            message: format!(
                "{} produces {}-dimensional vectors, config says {}",
                config.embedding.model,
                provider.dimension(),
                config.indexing.vector_dim
            ),
        });
    }
    Ok(Arc::new(provider))
}

/// Restore the persisted vector store and rebuild the keyword index over the
/// same documents
fn open_retriever(config: &Config) -> Result<HybridRetriever> {
    let index_dir = expand_path(&config.index_dir())?;
    let provider = embedding_provider(config)?;

    let store = HnswVectorStore::load(&index_dir, provider, config.vector_store_options())
        .map_err(|e| {
            SqlRagError::IndexBuild(format!(
                "{}. Run 'sqlrag index' to build the index first",
                e
            ))
        })?;
    let documents = store.documents()?;

    let store: Arc<dyn VectorStore> = Arc::new(store);
    HybridRetriever::new(store, documents, config.retrieval.clone())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SqlRagError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}
