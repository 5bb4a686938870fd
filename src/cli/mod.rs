//! CLI command definitions and parsing
use crate::retrieval::RetrievalMethod;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sqlrag",
    version,
    author = "neur0map",
    about = "Hybrid retrieval of example SQL queries for natural-language questions",
    long_about = "sqlrag indexes a catalog of example SQL queries with an embedding model and a BM25 \
                  keyword index, then answers natural-language questions with the most relevant examples \
                  using Reciprocal Rank Fusion and query-adaptive weighting."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/sqlrag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed the example corpus and persist the vector store
    Index {
        /// Corpus file (JSON array or JSON lines); defaults to corpus.path
        #[arg(long, value_name = "FILE")]
        corpus: Option<PathBuf>,
    },

    /// Retrieve the examples most relevant to a question
    Search {
        /// Natural-language question
        query: String,

        /// Number of examples to return (defaults to retrieval.default_k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Retrieval method
        #[arg(short, long, default_value_t = RetrievalMethod::Hybrid)]
        method: RetrievalMethod,

        /// Fixed vector weight; disables automatic weighting
        #[arg(long, requires = "keyword_weight")]
        vector_weight: Option<f64>,

        /// Fixed keyword weight; disables automatic weighting
        #[arg(long, requires = "vector_weight")]
        keyword_weight: Option<f64>,

        /// Use the configured weights instead of analyzing the query
        #[arg(long)]
        no_auto_weights: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the signals and fusion weights chosen for a question
    Analyze {
        /// Natural-language question
        query: String,

        /// Show the analysis in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::try_parse_from([
            "sqlrag", "search", "count orders", "-k", "2", "--method", "keyword",
        ])
        .unwrap();

        match cli.command {
            Commands::Search { query, k, method, .. } => {
                assert_eq!(query, "count orders");
                assert_eq!(k, Some(2));
                assert_eq!(method, RetrievalMethod::Keyword);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_weights_must_come_in_pairs() {
        assert!(Cli::try_parse_from(["sqlrag", "search", "q", "--vector-weight", "0.5"]).is_err());
        assert!(Cli::try_parse_from([
            "sqlrag",
            "search",
            "q",
            "--vector-weight",
            "0.5",
            "--keyword-weight",
            "0.5"
        ])
        .is_ok());
    }
}
