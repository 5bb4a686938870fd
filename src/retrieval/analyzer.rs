//! Query analysis and fusion weight recommendation
//!
//! Looks for SQL-domain signals in a natural-language question. Questions that
//! read like SQL lean on exact keyword matches, so they shift weight from the
//! vector ranking to the keyword ranking.

use super::types::FusionWeights;
use crate::index::tokenizer::{SQL_FUNCTIONS, SQL_KEYWORD_CATEGORIES};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Terms that mark a question about the database structure itself
const SCHEMA_TERMS: &[&str] = &[
    "schema",
    "table",
    "column",
    "structure",
    "database",
    "relationship",
];

/// Upper-case terms that trigger the keyword boost
const KEYWORD_BOOST_TERMS: &[&str] = &["TABLE", "COLUMN", "SCHEMA", "STRUCTURE"];

const BASE_WEIGHTS: (f64, f64) = (0.7, 0.3);
const KEYWORD_BOOST: f64 = 0.2;
const KEYWORD_BOOST_CAP: f64 = 0.6;

static QUALIFIED_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[a-z_]\w*\.[a-z_]\w*").expect("invalid regex"));
static FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\s+\w+").expect("invalid regex"));
static JOIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bjoin\s+\w+").expect("invalid regex"));
static JOIN_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bjoin\b").expect("invalid regex"));
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", SQL_FUNCTIONS.join("|"))).expect("invalid regex")
});

/// Signals found in a query plus the weights they imply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    /// Dot-qualified name, `FROM <name>` or `JOIN <name>`
    pub has_table_names: bool,
    /// An aggregate function name appears as a word
    pub has_sql_functions: bool,
    /// `join` appears as a word
    pub has_joins: bool,
    /// Substring occurrences of every SQL vocabulary term
    pub technical_term_count: usize,
    pub is_schema_query: bool,
    pub recommended_weights: FusionWeights,
}

/// Stateless analyzer; cheap to construct and share
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let lowered = query.to_lowercase();
        let technical_term_count = technical_term_count(&lowered);

        let analysis = QueryAnalysis {
            has_table_names: QUALIFIED_NAME_RE.is_match(query)
                || FROM_RE.is_match(query)
                || JOIN_RE.is_match(query),
            has_sql_functions: FUNCTION_RE.is_match(query),
            has_joins: JOIN_WORD_RE.is_match(query),
            technical_term_count,
            is_schema_query: SCHEMA_TERMS.iter().any(|t| lowered.contains(t)),
            recommended_weights: recommend_weights(query, technical_term_count),
        };

        tracing::debug!(
            terms = analysis.technical_term_count,
            vector_weight = analysis.recommended_weights.vector_weight(),
            keyword_weight = analysis.recommended_weights.keyword_weight(),
            "Analyzed query"
        );

        analysis
    }
}

/// Non-overlapping substring count of every vocabulary term. Multi-word terms
/// are counted on top of their parts ("inner join" also counts "join").
fn technical_term_count(lowered: &str) -> usize {
    SQL_KEYWORD_CATEGORIES
        .iter()
        .flat_map(|category| category.iter())
        .map(|term| lowered.matches(term).count())
        .sum()
}

fn recommend_weights(query: &str, technical_term_count: usize) -> FusionWeights {
    let (mut vector_weight, mut keyword_weight) = BASE_WEIGHTS;

    if technical_term_count > 3 {
        (vector_weight, keyword_weight) = (0.5, 0.5);
    } else if technical_term_count > 1 {
        (vector_weight, keyword_weight) = (0.6, 0.4);
    }

    let upper = query.to_uppercase();
    if KEYWORD_BOOST_TERMS.iter().any(|t| upper.contains(t)) {
        keyword_weight = (keyword_weight + KEYWORD_BOOST).min(KEYWORD_BOOST_CAP);
        vector_weight = 1.0 - keyword_weight;
    }

    FusionWeights::new(vector_weight, keyword_weight)
}
