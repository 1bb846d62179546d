//! Entry repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the record store contract (`put`/`get`/`all`) shared by the
//!   in-memory and persisted stores.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Entry::validate()` before any mutation.
//! - `reference` is unique; a second `put` fails with `DuplicateReference`.
//! - The store is append-only and `all()` follows insertion order.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::entry::{Entry, EntryValidationError, Verdict};
use log::debug;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ENTRY_SELECT_SQL: &str = "SELECT
    seq,
    reference,
    prompt,
    verdict,
    rationale
FROM entries";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entry persistence and lookup.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    NotFound(String),
    DuplicateReference(String),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(reference) => write!(f, "entry not found: {reference}"),
            Self::DuplicateReference(reference) => {
                write!(f, "duplicate entry reference: {reference}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "database is missing required table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store contract.
///
/// `all()` hands out a fresh iterator on every call, so the sequence can be
/// restarted by calling it again.
pub trait EntryRepository {
    /// Iterator returned by [`EntryRepository::all`].
    type Iter<'a>: Iterator<Item = Entry>
    where
        Self: 'a;

    /// Appends one entry. Fails with `DuplicateReference` when taken.
    fn put(&mut self, entry: &Entry) -> RepoResult<()>;
    /// Looks up one entry; `None` when absent.
    fn find(&self, reference: &str) -> RepoResult<Option<Entry>>;
    /// Returns whether `reference` is already stored.
    fn contains(&self, reference: &str) -> RepoResult<bool>;
    /// Returns all entries in insertion order.
    fn all(&self) -> RepoResult<Self::Iter<'_>>;
    /// Returns the number of stored entries.
    fn len(&self) -> RepoResult<usize>;
    /// Returns all distinct tags sorted by name.
    fn tags(&self) -> RepoResult<Vec<String>>;

    /// Looks up one entry. Fails with `NotFound` when absent.
    fn get(&self, reference: &str) -> RepoResult<Entry> {
        self.find(reference)?
            .ok_or_else(|| RepoError::NotFound(reference.trim().to_string()))
    }

    fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Appends entries in order.
    ///
    /// The default implementation stops at the first failure; stores that
    /// can do better override it to write all-or-nothing.
    fn put_batch(&mut self, entries: &[Entry]) -> RepoResult<()> {
        entries.iter().try_for_each(|entry| self.put(entry))
    }
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Fails with `MissingRequiredTable` when the schema is not in place.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in ["entries", "tags", "entry_tags"] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }

    /// Borrows the underlying connection, e.g. for full-text search.
    pub fn connection(&self) -> &Connection {
        self.conn
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    type Iter<'a>
        = std::vec::IntoIter<Entry>
    where
        Self: 'a;

    fn put(&mut self, entry: &Entry) -> RepoResult<()> {
        self.put_batch(std::slice::from_ref(entry))
    }

    fn find(&self, reference: &str) -> RepoResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE reference = ?1;"))?;
        let mut rows = stmt.query([reference.trim()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let (seq, mut entry) = parse_entry_row(row)?;
        entry.tags = load_tags_for_entry(self.conn, seq)?;
        entry.validate()?;
        Ok(Some(entry))
    }

    fn contains(&self, reference: &str) -> RepoResult<bool> {
        reference_exists(self.conn, reference.trim())
    }

    fn all(&self) -> RepoResult<Self::Iter<'_>> {
        let mut tags_by_seq = load_all_entry_tags(self.conn)?;
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next()? {
            let (seq, mut entry) = parse_entry_row(row)?;
            entry.tags = tags_by_seq.remove(&seq).unwrap_or_default();
            entry.validate()?;
            entries.push(entry);
        }

        Ok(entries.into_iter())
    }

    fn len(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries;", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative entry count `{count}`")))
    }

    fn tags(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT t.name
             FROM tags t
             INNER JOIN entry_tags et ON et.tag_id = t.id
             ORDER BY t.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get("name")?;
            tags.push(value.to_lowercase());
        }
        Ok(tags)
    }

    /// Writes the whole batch in one immediate transaction.
    fn put_batch(&mut self, entries: &[Entry]) -> RepoResult<()> {
        for entry in entries {
            entry.validate()?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for entry in entries {
            let seq = insert_entry(&tx, entry)?;
            debug!(
                "event=entry_put module=repo status=ok seq={} verdict={} tags={}",
                seq,
                entry.verdict,
                entry.tags.len()
            );
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_entry(conn: &Connection, entry: &Entry) -> RepoResult<i64> {
    if reference_exists(conn, entry.reference.as_str())? {
        return Err(RepoError::DuplicateReference(entry.reference.clone()));
    }

    conn.execute(
        "INSERT INTO entries (reference, prompt, verdict, rationale)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            entry.reference.as_str(),
            entry.prompt.as_str(),
            entry.verdict.as_str(),
            entry.rationale.as_deref(),
        ],
    )?;
    let seq = conn.last_insert_rowid();

    for tag in &entry.tags {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1);", [tag])?;
        conn.execute(
            "INSERT INTO entry_tags (entry_seq, tag_id)
             SELECT ?1, id
             FROM tags
             WHERE name = ?2 COLLATE NOCASE;",
            params![seq, tag],
        )?;
    }

    Ok(seq)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<(i64, Entry)> {
    let seq: i64 = row.get("seq")?;
    let verdict_text: String = row.get("verdict")?;
    let verdict = parse_verdict(&verdict_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid verdict `{verdict_text}` in entries.verdict"
        ))
    })?;

    let entry = Entry {
        reference: row.get("reference")?,
        prompt: row.get("prompt")?,
        verdict,
        rationale: row.get("rationale")?,
        tags: BTreeSet::new(),
    };
    Ok((seq, entry))
}

fn parse_verdict(value: &str) -> Option<Verdict> {
    match value {
        "good" => Some(Verdict::Good),
        "bad" => Some(Verdict::Bad),
        _ => None,
    }
}

fn load_tags_for_entry(conn: &Connection, seq: i64) -> RepoResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM entry_tags et
         INNER JOIN tags t ON t.id = et.tag_id
         WHERE et.entry_seq = ?1;",
    )?;
    let mut rows = stmt.query([seq])?;
    let mut tags = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.insert(value.to_lowercase());
    }
    Ok(tags)
}

fn load_all_entry_tags(conn: &Connection) -> RepoResult<HashMap<i64, BTreeSet<String>>> {
    let mut stmt = conn.prepare(
        "SELECT et.entry_seq, t.name
         FROM entry_tags et
         INNER JOIN tags t ON t.id = et.tag_id;",
    )?;
    let mut rows = stmt.query([])?;
    let mut tags: HashMap<i64, BTreeSet<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let seq: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        tags.entry(seq).or_default().insert(name.to_lowercase());
    }
    Ok(tags)
}

fn reference_exists(conn: &Connection, reference: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entries WHERE reference = ?1);",
        [reference],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
