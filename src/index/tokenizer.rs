//! SQL-aware tokenizer for BM25 indexing.
//!
//! Text is lowercased, then split into `\b\w+\b` words and the single
//! punctuation characters `( ) , . ;`. Words shorter than two characters are
//! dropped unless they belong to the SQL keyword vocabulary.

use regex::Regex;
use std::sync::LazyLock;

/// Aggregate function names
pub const SQL_FUNCTIONS: &[&str] = &["count", "sum", "avg", "max", "min"];

/// Join keywords, including the multi-word forms
pub const SQL_JOINS: &[&str] = &[
    "join",
    "inner join",
    "left join",
    "right join",
    "full join",
    "cross join",
];

/// Clause keywords
pub const SQL_CLAUSES: &[&str] = &["where", "select", "from", "group by", "order by", "having"];

/// Boolean and set operators
pub const SQL_OPERATORS: &[&str] = &["and", "or", "not", "in", "exists", "like", "between"];

/// Every keyword category, in a fixed order
pub const SQL_KEYWORD_CATEGORIES: &[&[&str]] = &[SQL_FUNCTIONS, SQL_JOINS, SQL_CLAUSES, SQL_OPERATORS];

const PUNCTUATION: &[&str] = &["(", ")", ",", ".", ";"];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b|[(),.;]").expect("invalid regex"));

/// A token and its byte span in the lowercased text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Lowercased text together with the tokens found in it
///
/// Lowercasing can change byte lengths (`İ` becomes `i̇`), so spans are only
/// meaningful against [`text`](Self::text), never against the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedText {
    pub text: String,
    pub tokens: Vec<SpannedToken>,
}

/// Whether `token` (already lowercased) is in the SQL keyword vocabulary
pub fn is_sql_keyword(token: &str) -> bool {
    SQL_KEYWORD_CATEGORIES
        .iter()
        .any(|category| category.contains(&token))
}

fn keep(token: &str) -> bool {
    token.chars().count() >= 2 || PUNCTUATION.contains(&token) || is_sql_keyword(token)
}

/// Tokenize `text`, keeping the lowercased text and the byte span of every
/// surviving token within it
pub fn tokenize_spanned(text: &str) -> TokenizedText {
    let lowered = text.to_lowercase();
    let tokens = TOKEN_RE
        .find_iter(&lowered)
        .filter(|m| keep(m.as_str()))
        .map(|m| SpannedToken {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect();
    TokenizedText {
        text: lowered,
        tokens,
    }
}

/// Tokenize `text` for indexing or querying
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_spanned(text)
        .tokens
        .into_iter()
        .map(|t| t.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_short_keywords_and_punctuation() {
        let tokens = tokenize("a in (1,2)");
        assert_eq!(tokens, vec!["in", "(", ",", ")"]);
    }

    #[test]
    fn test_lowercases_and_drops_star() {
        let tokens = tokenize("SELECT COUNT(*) FROM Orders;");
        assert_eq!(
            tokens,
            vec!["select", "count", "(", ")", "from", "orders", ";"]
        );
    }

    #[test]
    fn test_short_operator_kept() {
        let tokens = tokenize("x or y");
        assert_eq!(tokens, vec!["or"]);
    }

    #[test]
    fn test_dotted_reference() {
        let tokens = tokenize("sales.orders o");
        assert_eq!(tokens, vec!["sales", ".", "orders"]);
    }

    #[test]
    fn test_spans_point_into_lowercased_text() {
        let spanned = tokenize_spanned("FROM users");
        assert_eq!(spanned.text, "from users");
        assert_eq!(spanned.tokens.len(), 2);
        assert_eq!((spanned.tokens[1].start, spanned.tokens[1].end), (5, 10));
    }

    #[test]
    fn test_spans_survive_length_changing_lowercase() {
        let input = "SELECT city FROM İstanbul_ORDERS";
        let spanned = tokenize_spanned(input);

        // 'İ' is two bytes, its lowercase form three.
        assert_eq!(spanned.text.len(), input.len() + 1);
        for token in &spanned.tokens {
            assert_eq!(&spanned.text[token.start..token.end], token.text);
        }
        let last = spanned.tokens.last().unwrap();
        assert_eq!(last.text, "i\u{307}stanbul_orders");
        assert_eq!(last.end, spanned.text.len());
    }

    #[test]
    fn test_keyword_vocabulary() {
        assert!(is_sql_keyword("between"));
        assert!(is_sql_keyword("group by"));
        assert!(!is_sql_keyword("orders"));
    }
}
