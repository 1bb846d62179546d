//! SQLite FTS5-based search implementation.
//!
//! # Responsibility
//! - Provide keyword search over entry prompts and rationales.
//! - Return typed hits keyed by entry reference.
//!
//! # Invariants
//! - Result ordering is deterministic by rank, then insertion order.
//! - Default mode quotes every term so user text cannot break FTS syntax.

use crate::db::DbError;
use crate::model::entry::Verdict;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for full-text query behavior.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text.
    pub text: String,
    /// Optional verdict filter.
    pub verdict: Option<Verdict>,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Whether to pass text directly as raw FTS5 expression.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    /// Creates a query with the default limit and no verdict filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            verdict: None,
            limit: DEFAULT_SEARCH_LIMIT,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit returned by [`search_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub reference: String,
    pub verdict: Verdict,
    /// Highlighted excerpt; matches are wrapped in `[` `]`.
    pub snippet: String,
}

/// Searches prompts and rationales via FTS5 and returns ranked hits.
///
/// Returns an empty list for blank queries and for `limit == 0`.
pub fn search_entries(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            entries.reference AS reference,
            entries.verdict AS verdict,
            snippet(entries_fts, -1, '[', ']', ' ... ', 10) AS snippet
         FROM entries_fts
         JOIN entries ON entries.seq = entries_fts.rowid
         WHERE entries_fts MATCH ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if let Some(verdict) = query.verdict {
        sql.push_str(" AND entries.verdict = ?");
        bind_values.push(Value::Text(verdict.as_str().to_string()));
    }

    sql.push_str(" ORDER BY bm25(entries_fts), entries.seq ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row)?);
    }

    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let verdict_text: String = row.get("verdict")?;
    let verdict = verdict_text
        .parse::<Verdict>()
        .map_err(|_| SearchError::InvalidData(format!("invalid verdict `{verdict_text}`")))?;

    Ok(SearchHit {
        reference: row.get("reference")?,
        verdict,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }

    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text.split_whitespace().map(quote_term).collect::<Vec<_>>();
    (!terms.is_empty()).then(|| terms.join(" AND "))
}

fn quote_term(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
                || msg.contains("no such column")
        }
        _ => false,
    }
}
