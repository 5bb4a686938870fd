/// Tantivy-backed BM25 index over a fixed document corpus
use super::tokenizer::{tokenize, tokenize_spanned};
use crate::corpus::Document;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, INDEXED, STORED, TEXT};
use tantivy::tokenizer::{PreTokenizedString, Token};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term};
use thiserror::Error;

/// Writer heap for the one-shot build
const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Error, Debug)]
pub enum KeywordIndexError {
    #[error("Cannot build keyword index over an empty corpus")]
    EmptyCorpus,

    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Tantivy error: {0}")]
    TantivyError(#[from] TantivyError),
}

/// A scored document position from the keyword index
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSearchResult {
    /// Position of the document in the corpus the index was built from
    pub position: usize,
    /// BM25 relevance score (0.0 when no query term matches)
    pub score: f32,
}

/// Ranked lexical search over documents
pub trait LexicalIndex: Send + Sync {
    /// The `k` best-scoring documents for `query`, with their scores, best first
    fn search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>, KeywordIndexError>;

    /// Number of indexed documents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// BM25 index over a fixed corpus
///
/// Built once in memory and read-only afterwards. Documents are tokenized with
/// the SQL-aware tokenizer and handed to tantivy pre-tokenized, so indexing and
/// querying always agree on the token stream.
pub struct KeywordIndex {
    reader: IndexReader,
    position_field: Field,
    text_field: Field,
    documents: Vec<Document>,
}

impl KeywordIndex {
    /// Build the index over `documents`
    ///
    /// Fails with [`KeywordIndexError::EmptyCorpus`] when there is nothing to index.
    pub fn build(documents: Vec<Document>) -> Result<Self, KeywordIndexError> {
        if documents.is_empty() {
            return Err(KeywordIndexError::EmptyCorpus);
        }

        let mut schema_builder = Schema::builder();
        let position_field = schema_builder.add_u64_field("position", INDEXED | STORED);
        let text_field = schema_builder.add_text_field("text", TEXT);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| KeywordIndexError::InitializationError(e.to_string()))?;

        for (position, document) in documents.iter().enumerate() {
            let mut doc = TantivyDocument::default();
            doc.add_u64(position_field, position as u64);
            doc.add_pre_tokenized_text(text_field, pre_tokenize(&document.searchable_text()));
            writer.add_document(doc)?;
        }

        writer.commit()?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        tracing::info!("Built keyword index over {} documents", documents.len());

        Ok(Self {
            reader,
            position_field,
            text_field,
            documents,
        })
    }

    /// Score every document against `query` and return the top `k`
    ///
    /// Ordered by score descending, ties broken by corpus order. Documents that
    /// match no query term score 0.0 and still fill the list up to `k`.
    pub fn search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<KeywordSearchResult>, KeywordIndexError> {
        if k == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores = vec![0.0f32; self.documents.len()];

        let clauses: Vec<(Occur, Box<dyn Query>)> = tokenize(query)
            .iter()
            .map(|token| {
                let term = Term::from_field_text(self.text_field, token);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();

        if !clauses.is_empty() {
            let searcher = self.reader.searcher();
            let top_docs =
                searcher.search(&BooleanQuery::new(clauses), &TopDocs::with_limit(scores.len()))?;

            for (score, address) in top_docs {
                let stored: TantivyDocument = searcher.doc(address)?;
                let position = stored
                    .get_first(self.position_field)
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| {
                        KeywordIndexError::SearchError("Missing position field".to_string())
                    })? as usize;

                let slot = scores.get_mut(position).ok_or_else(|| {
                    KeywordIndexError::SearchError(format!("Position {} out of range", position))
                })?;
                *slot = score;
            }
        }

        let mut ranked: Vec<KeywordSearchResult> = scores
            .into_iter()
            .enumerate()
            .map(|(position, score)| KeywordSearchResult { position, score })
            .collect();

        // Stable sort keeps corpus order among equal scores.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(k);

        Ok(ranked)
    }

    /// Document at corpus `position`
    pub fn document(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    /// Get the number of documents in the index
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl LexicalIndex for KeywordIndex {
    fn search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>, KeywordIndexError> {
        self.search(query, k)?
            .into_iter()
            .map(|r| {
                self.document(r.position)
                    .map(|doc| (doc.clone(), r.score))
                    .ok_or_else(|| {
                        KeywordIndexError::SearchError(format!(
                            "No document at position {}",
                            r.position
                        ))
                    })
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Token offsets refer to the lowercased text, so that is the text tantivy gets
fn pre_tokenize(text: &str) -> PreTokenizedString {
    let tokenized = tokenize_spanned(text);
    let tokens = tokenized
        .tokens
        .into_iter()
        .enumerate()
        .map(|(i, t)| Token {
            offset_from: t.start,
            offset_to: t.end,
            position: i,
            text: t.text,
            position_length: 1,
        })
        .collect();

    PreTokenizedString {
        text: tokenized.text,
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("SELECT COUNT(*) FROM orders"),
            Document::new("SELECT * FROM users JOIN orders"),
            Document::new("SELECT name FROM products"),
        ]
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let result = KeywordIndex::build(Vec::new());
        assert!(matches!(result, Err(KeywordIndexError::EmptyCorpus)));
    }

    #[test]
    fn test_overlap_ranks_first() {
        let index = KeywordIndex::build(corpus()).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search("count orders", 10).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].position, 0);
        assert_eq!(results[1].position, 1);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[2].position, 2);
        assert_eq!(results[2].score, 0.0);
    }

    #[test]
    fn test_ties_follow_corpus_order() {
        let index = KeywordIndex::build(corpus()).unwrap();

        // No document contains the term.
        let results = index.search("zebra", 3).unwrap();
        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(results.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn test_truncates_to_k() {
        let index = KeywordIndex::build(corpus()).unwrap();
        let results = index.search("products", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, 2);
    }

    #[test]
    fn test_zero_k_is_empty() {
        let index = KeywordIndex::build(corpus()).unwrap();
        assert!(index.search("orders", 0).unwrap().is_empty());
    }

    #[test]
    fn test_metadata_fields_are_searchable() {
        let mut doc = Document::new("SELECT id FROM t1");
        doc.metadata.description = Some("customer churn".to_string());
        let index = KeywordIndex::build(vec![Document::new("SELECT 1"), doc]).unwrap();

        let results = index.search("churn", 2).unwrap();
        assert_eq!(results[0].position, 1);
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_search_with_score_returns_documents() {
        let index = KeywordIndex::build(corpus()).unwrap();
        let hits = index.search_with_score("products", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, corpus()[2]);
        assert!(hits[0].1 > 0.0);
        assert_eq!(LexicalIndex::len(&index), 3);
    }

    #[test]
    fn test_pre_tokenized_offsets_match_text() {
        let pre = pre_tokenize("SELECT * FROM İstanbul_Orders WHERE Region = 'EU'");
        assert!(!pre.tokens.is_empty());
        for token in &pre.tokens {
            assert_eq!(&pre.text[token.offset_from..token.offset_to], token.text);
        }
    }

    #[test]
    fn test_non_ascii_document_searchable() {
        let index = KeywordIndex::build(vec![
            Document::new("SELECT * FROM İstanbul_Orders WHERE region = 'EU'"),
            Document::new("SELECT name FROM products"),
        ])
        .unwrap();

        let results = index.search("region", 2).unwrap();
        assert_eq!(results[0].position, 0);
        assert!(results[0].score > 0.0);
    }
}
