//! SQL statement skeletons for grouping.
//!
//! Statements are tokenized with `sqlparser` and reduced to their keyword
//! skeleton (`SELECT FROM WHERE`). Literals, quoted identifiers, table and column
//! names are dropped, so statements that differ only in those land in the same
//! group.

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Keywords that make up the statement skeleton.
const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "TRUNCATE", "WITH", "FROM", "TABLE",
    "JOIN", "UNION", "WHERE", "GROUP", "LIMIT", "ORDER", "HAVING",
];

/// Canonical (upper-case) form of `s` if it is a skeleton keyword.
pub fn sql_keyword(s: &str) -> Option<&'static str> {
    SQL_KEYWORDS
        .iter()
        .find(|kw| kw.eq_ignore_ascii_case(s))
        .copied()
}

/// Keyword skeleton of a statement, in statement order.
///
/// A tokenizer error ends the scan; keywords seen before it are still returned.
pub fn statement_keywords(stmt: &str) -> Vec<&'static str> {
    let dialect = GenericDialect {};
    let mut tokens = Vec::new();
    if let Err(e) = Tokenizer::new(&dialect, stmt).tokenize_with_location_into_buf(&mut tokens) {
        tracing::trace!(error = %e, "SQL tokenizer stopped early");
    }

    tokens
        .iter()
        .filter_map(|tok| match &tok.token {
            Token::Word(word) if word.quote_style.is_none() => sql_keyword(&word.value),
            _ => None,
        })
        .collect()
}
