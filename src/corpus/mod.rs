//! Retrievable documents and corpus loading
//!
//! A corpus is the catalog of example SQL queries the retriever searches over.
//! Documents are built once when the corpus is loaded and never mutated
//! afterwards; a new corpus means a new retriever.

use crate::error::{Result, SqlRagError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Typed metadata attached to a [`Document`]
///
/// Every field is optional. A missing field reads as the empty string when it
/// takes part in the identity key or in the searchable text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Origin of the document (usually the corpus file name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Position of the document within its source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,

    /// Natural-language description of the example query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Primary table the example queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// All tables referenced by the example
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<String>,

    /// Any other annotations
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, String>,
}

impl DocumentMetadata {
    /// Join key used to match the same document across ranked lists:
    /// `source + "_" + chunk`.
    pub fn identity_key(&self) -> String {
        format!(
            "{}_{}",
            self.source.as_deref().unwrap_or(""),
            self.chunk.as_deref().unwrap_or("")
        )
    }
}

/// An immutable unit of retrievable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text used for both embedding and lexical indexing
    pub content: String,

    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn identity_key(&self) -> String {
        self.metadata.identity_key()
    }

    /// Text fed to the lexical indexer: content followed by the description,
    /// table and tables metadata fields when present, space separated.
    pub fn searchable_text(&self) -> String {
        let mut text = self.content.clone();
        let fields = [
            &self.metadata.description,
            &self.metadata.table,
            &self.metadata.tables,
        ];
        for value in fields.into_iter().flatten() {
            text.push(' ');
            text.push_str(value);
        }
        text
    }
}

/// `tables` may be written as a single string or as a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TableList {
    One(String),
    Many(Vec<String>),
}

impl TableList {
    fn joined(self) -> String {
        match self {
            TableList::One(s) => s,
            TableList::Many(list) => list.join(", "),
        }
    }
}

/// One example query as it appears in a corpus file
#[derive(Debug, Clone, Deserialize)]
struct CorpusEntry {
    query: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    tables: Option<TableList>,
    #[serde(default, flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl CorpusEntry {
    fn into_document(self, source: &str, chunk: usize) -> Result<Document> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(SqlRagError::Corpus(format!(
                "entry {} in {} has an empty query",
                chunk, source
            )));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let content = match &description {
            Some(d) => format!("SQL QUERY: {}\n\nDESCRIPTION: {}", query, d),
            None => format!("SQL QUERY: {}", query),
        };

        // Non-string extras are dropped; metadata values are strings.
        let extra = self
            .extra
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect();

        let metadata = DocumentMetadata {
            source: Some(source.to_string()),
            chunk: Some(chunk.to_string()),
            description,
            table: self.table.filter(|t| !t.is_empty()),
            tables: self.tables.map(TableList::joined).filter(|t| !t.is_empty()),
            extra,
        };

        Ok(Document::with_metadata(content, metadata))
    }
}

/// Parse corpus text. JSON arrays and JSON Lines are both accepted.
pub fn parse_corpus(text: &str, source: &str) -> Result<Vec<Document>> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<CorpusEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| SqlRagError::Json {
            source: e,
            context: format!("Failed to parse corpus {}", source),
        })?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| SqlRagError::Json {
                    source: e,
                    context: format!("Failed to parse corpus {} line {}", source, n + 1),
                })
            })
            .collect::<Result<_>>()?
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(chunk, entry)| entry.into_document(source, chunk))
        .collect()
}

/// Load a corpus file into documents
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let text = std::fs::read_to_string(path).map_err(|e| SqlRagError::Io {
        source: e,
        context: format!("Failed to read corpus file: {:?}", path),
    })?;

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let documents = parse_corpus(&text, &source)?;
    tracing::info!("Loaded {} documents from {:?}", documents.len(), path);
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_defaults_to_empty_parts() {
        let doc = Document::new("SELECT 1");
        assert_eq!(doc.identity_key(), "_");

        let meta = DocumentMetadata {
            source: Some("examples.json".to_string()),
            chunk: Some("3".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.identity_key(), "examples.json_3");
    }

    #[test]
    fn test_searchable_text_field_order() {
        let meta = DocumentMetadata {
            description: Some("daily revenue".to_string()),
            table: Some("orders".to_string()),
            tables: Some("orders, users".to_string()),
            ..Default::default()
        };
        let doc = Document::with_metadata("SELECT SUM(total) FROM orders", meta);
        assert_eq!(
            doc.searchable_text(),
            "SELECT SUM(total) FROM orders daily revenue orders orders, users"
        );
    }

    #[test]
    fn test_parse_json_array() {
        let text = r#"[
            {"query": "SELECT COUNT(*) FROM orders", "description": "How many orders", "tables": ["orders"]},
            {"query": "SELECT name FROM products", "table": "products", "owner": "analytics"}
        ]"#;

        let docs = parse_corpus(text, "examples.json").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0].content,
            "SQL QUERY: SELECT COUNT(*) FROM orders\n\nDESCRIPTION: How many orders"
        );
        assert_eq!(docs[0].metadata.tables.as_deref(), Some("orders"));
        assert_eq!(docs[0].identity_key(), "examples.json_0");
        assert_eq!(docs[1].content, "SQL QUERY: SELECT name FROM products");
        assert_eq!(docs[1].metadata.table.as_deref(), Some("products"));
        assert_eq!(
            docs[1].metadata.extra.get("owner").map(String::as_str),
            Some("analytics")
        );
    }

    #[test]
    fn test_parse_json_lines() {
        let text = "{\"query\": \"SELECT 1\"}\n\n{\"query\": \"SELECT 2\", \"tables\": \"a\"}\n";
        let docs = parse_corpus(text, "c.jsonl").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].identity_key(), "c.jsonl_1");
    }

    #[test]
    fn test_empty_query_rejected() {
        let text = r#"[{"query": "   "}]"#;
        assert!(matches!(
            parse_corpus(text, "bad.json"),
            Err(SqlRagError::Corpus(_))
        ));
    }

    #[test]
    fn test_empty_file_is_empty_corpus() {
        assert!(parse_corpus("  \n", "empty.json").unwrap().is_empty());
    }
}
