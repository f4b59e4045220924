//! SQLite FTS5 search engine.
//!
//! Maintains:
//! - `documents` table holding every document field per key
//! - `documents_fts` FTS5 virtual table over `title` and `content`, kept in
//!   sync with `documents` by triggers

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::debug;
use uuid::Uuid;

use linkdex_core::{Document, IndexError, QueryType};

use crate::engine::{EngineDoc, EngineQuery, EngineResults, Hit, SearchEngine};

fn delegate(e: rusqlite::Error) -> IndexError {
    IndexError::Delegate(e.to_string())
}

fn conversion<E>(idx: usize) -> impl FnOnce(E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    let key: String = row.get(0)?;
    let indexed_at: String = row.get(4)?;
    Ok(Document {
        link_id: Uuid::parse_str(&key).map_err(conversion(0))?,
        url: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        indexed_at: DateTime::parse_from_rfc3339(&indexed_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(conversion(4))?,
        page_rank: row.get(5)?,
    })
}

/// Build the FTS5 MATCH expression for a query.
///
/// Terms are the alphanumeric runs of the expression, each quoted so FTS5
/// operators in user input are treated as text. A match query accepts any
/// term; a phrase query requires the terms adjacent and in order. Returns
/// `None` when the expression has no terms.
fn match_expression(kind: QueryType, expression: &str) -> Option<String> {
    let terms: Vec<&str> = expression
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return None;
    }

    Some(match kind {
        QueryType::Match => terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
        QueryType::Phrase => format!("\"{}\"", terms.join(" ")),
    })
}

/// A [`SearchEngine`] backed by a SQLite FTS5 index.
pub struct Fts5Engine {
    conn: Mutex<Connection>,
}

impl Fts5Engine {
    /// Open or create an engine database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open(path).map_err(delegate)?;
        Self::with_connection(conn)
    }

    /// Create an engine in an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if schema creation fails.
    pub fn in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory().map_err(delegate)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, IndexError> {
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the engine schema (documents table + FTS5 virtual table).
    fn create_schema(conn: &Connection) -> Result<(), IndexError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                url TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                indexed_at TEXT NOT NULL,
                page_rank REAL NOT NULL DEFAULT 0.0
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
                title,
                content,
                content='documents',
                content_rowid='rowid'
            );

            CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
                INSERT INTO documents_fts(rowid, title, content)
                VALUES (new.rowid, new.title, new.content);
            END;

            CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
                INSERT INTO documents_fts(documents_fts, rowid, title, content)
                VALUES ('delete', old.rowid, old.title, old.content);
            END;

            CREATE TRIGGER IF NOT EXISTS documents_au AFTER UPDATE ON documents BEGIN
                INSERT INTO documents_fts(documents_fts, rowid, title, content)
                VALUES ('delete', old.rowid, old.title, old.content);
                INSERT INTO documents_fts(rowid, title, content)
                VALUES (new.rowid, new.title, new.content);
            END;

            CREATE INDEX IF NOT EXISTS idx_documents_page_rank ON documents(page_rank);
            ",
        )
        .map_err(delegate)?;

        debug!("fts5 schema ready");
        Ok(())
    }

    /// Number of keys stored in the engine.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the query fails.
    pub fn count(&self) -> Result<u64, IndexError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(delegate)?;
        Ok(count.unsigned_abs())
    }

    /// Every stored document whose key is a link id, in key order.
    ///
    /// Used to rebuild a content index's document map over a persistent
    /// engine database.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the query fails or a row does not
    /// hold a valid document.
    pub fn documents(&self) -> Result<Vec<Document>, IndexError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT key, url, title, content, indexed_at, page_rank
                 FROM documents ORDER BY key",
            )
            .map_err(delegate)?;
        let docs = stmt
            .query_map([], document_from_row)
            .map_err(delegate)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(delegate)?;
        Ok(docs)
    }
}

impl SearchEngine for Fts5Engine {
    fn index(&self, key: &str, doc: EngineDoc<'_>) -> Result<(), IndexError> {
        // An upsert rather than INSERT OR REPLACE: REPLACE deletes the old row
        // without firing the delete trigger, leaving stale FTS entries.
        self.conn
            .lock()
            .execute(
                "INSERT INTO documents (key, url, title, content, indexed_at, page_rank)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(key) DO UPDATE SET
                    url = excluded.url,
                    title = excluded.title,
                    content = excluded.content,
                    indexed_at = excluded.indexed_at,
                    page_rank = excluded.page_rank",
                params![
                    key,
                    doc.url,
                    doc.title,
                    doc.content,
                    doc.indexed_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                    doc.page_rank
                ],
            )
            .map_err(delegate)?;
        Ok(())
    }

    fn search(&self, query: &EngineQuery) -> Result<EngineResults, IndexError> {
        let Some(expr) = match_expression(query.kind, &query.expression) else {
            return Ok(EngineResults::default());
        };
        let limit = i64::try_from(query.size).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.from).unwrap_or(i64::MAX);

        let conn = self.conn.lock();

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents_fts WHERE documents_fts MATCH ?1",
                params![expr],
                |row| row.get(0),
            )
            .map_err(delegate)?;

        // FTS5 rank is bm25, where lower means more relevant.
        let mut stmt = conn
            .prepare_cached(
                "SELECT d.key, -f.rank AS score
                 FROM documents_fts f
                 JOIN documents d ON d.rowid = f.rowid
                 WHERE documents_fts MATCH ?1
                 ORDER BY d.page_rank DESC, score DESC, d.key ASC
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(delegate)?;

        let hits = stmt
            .query_map(params![expr, limit, offset], |row| {
                Ok(Hit {
                    key: row.get(0)?,
                    score: row.get(1)?,
                })
            })
            .map_err(delegate)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(delegate)?;

        debug!(expr = %expr, from = query.from, returned = hits.len(), total, "fts5 batch");
        Ok(EngineResults {
            total: total.unsigned_abs(),
            hits,
        })
    }
}
