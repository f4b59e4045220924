//! SQLite-backed link graph.
//!
//! Schema:
//! - `links(id, url UNIQUE, retrieved_secs, retrieved_nanos)`
//! - `edges(id, src -> links, dst -> links, updated_secs, updated_nanos, UNIQUE(src, dst))`
//!
//! Ids are stored in canonical hyphenated form, so SQL string comparison
//! matches id ordering. Timestamps are split into whole Unix seconds and
//! nanoseconds; comparing the `(secs, nanos)` row value matches time ordering
//! over the whole range of `DateTime<Utc>`.
//!
//! Iterators read in pages ordered by id (edges by source id, then id),
//! locking the connection once per page. A row written ahead of an
//! iterator's position may therefore still be yielded by it.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use linkdex_core::{Edge, EdgeIterator, Graph, GraphError, Link, LinkIterator};

/// Rows fetched per iterator page.
const PAGE_SIZE: i64 = 256;

const LINKS_FIRST_PAGE: &str = "SELECT id, url, retrieved_secs, retrieved_nanos FROM links
     WHERE id >= ?1 AND id < ?2 AND (retrieved_secs, retrieved_nanos) < (?3, ?4)
     ORDER BY id LIMIT ?5";

const LINKS_NEXT_PAGE: &str = "SELECT id, url, retrieved_secs, retrieved_nanos FROM links
     WHERE id > ?1 AND id < ?2 AND (retrieved_secs, retrieved_nanos) < (?3, ?4)
     ORDER BY id LIMIT ?5";

const EDGES_FIRST_PAGE: &str = "SELECT id, src, dst, updated_secs, updated_nanos FROM edges
     WHERE src >= ?1 AND src < ?2 AND (updated_secs, updated_nanos) < (?3, ?4)
     ORDER BY src, id LIMIT ?5";

const EDGES_NEXT_PAGE: &str = "SELECT id, src, dst, updated_secs, updated_nanos FROM edges
     WHERE (src, id) > (?1, ?6) AND src < ?2 AND (updated_secs, updated_nanos) < (?3, ?4)
     ORDER BY src, id LIMIT ?5";

fn storage(e: rusqlite::Error) -> GraphError {
    GraphError::Storage(e.to_string())
}

/// Split a timestamp into `(unix seconds, nanoseconds)` column values.
fn timestamp(t: DateTime<Utc>) -> (i64, u32) {
    (t.timestamp(), t.timestamp_subsec_nanos())
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a timestamp stored as seconds at `idx` and nanoseconds at `idx + 1`.
fn timestamp_columns(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    let nanos: u32 = row.get(idx + 1)?;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {secs}s {nanos}ns").into(),
        )
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: uuid_column(row, 0)?,
        url: row.get(1)?,
        retrieved_at: timestamp_columns(row, 2)?,
    })
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<Edge> {
    Ok(Edge {
        id: uuid_column(row, 0)?,
        src: uuid_column(row, 1)?,
        dst: uuid_column(row, 2)?,
        updated_at: timestamp_columns(row, 3)?,
    })
}

/// Generate v4 ids until one is not present in `table`.
fn fresh_id(tx: &Transaction<'_>, table: &'static str) -> rusqlite::Result<Uuid> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    loop {
        let id = Uuid::new_v4();
        let taken: bool = tx.query_row(&sql, params![id.to_string()], |row| row.get(0))?;
        if !taken {
            return Ok(id);
        }
    }
}

/// A [`Graph`] persisted in a SQLite database.
pub struct SqliteGraph {
    conn: Mutex<Connection>,
}

impl SqliteGraph {
    /// Open or create a graph database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, GraphError> {
        let conn = Connection::open(path).map_err(storage)?;
        Self::with_connection(conn)
    }

    /// Create a graph in an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if schema creation fails.
    pub fn in_memory() -> Result<Self, GraphError> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, GraphError> {
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn create_schema(conn: &Connection) -> Result<(), GraphError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS links (
                id TEXT PRIMARY KEY,
                url TEXT UNIQUE NOT NULL,
                retrieved_secs INTEGER NOT NULL,
                retrieved_nanos INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                src TEXT NOT NULL REFERENCES links(id),
                dst TEXT NOT NULL REFERENCES links(id),
                updated_secs INTEGER NOT NULL,
                updated_nanos INTEGER NOT NULL,
                UNIQUE (src, dst)
            );
            ",
        )
        .map_err(storage)?;

        debug!("graph schema ready");
        Ok(())
    }

    fn fetch_links(
        conn: &Connection,
        range: &PageRange,
        after: Option<&Link>,
    ) -> rusqlite::Result<Vec<Link>> {
        let (sql, lower) = match after {
            None => (LINKS_FIRST_PAGE, range.from.clone()),
            Some(last) => (LINKS_NEXT_PAGE, last.id.to_string()),
        };
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(
                params![lower, range.to, range.before.0, range.before.1, PAGE_SIZE],
                link_from_row,
            )?
            .collect();
        rows
    }

    fn fetch_edges(
        conn: &Connection,
        range: &PageRange,
        after: Option<&Edge>,
    ) -> rusqlite::Result<Vec<Edge>> {
        let rows = match after {
            None => {
                let mut stmt = conn.prepare_cached(EDGES_FIRST_PAGE)?;
                let rows = stmt
                    .query_map(
                        params![range.from, range.to, range.before.0, range.before.1, PAGE_SIZE],
                        edge_from_row,
                    )?
                    .collect();
                rows
            }
            Some(last) => {
                let mut stmt = conn.prepare_cached(EDGES_NEXT_PAGE)?;
                let rows = stmt
                    .query_map(
                        params![
                            last.src.to_string(),
                            range.to,
                            range.before.0,
                            range.before.1,
                            PAGE_SIZE,
                            last.id.to_string()
                        ],
                        edge_from_row,
                    )?
                    .collect();
                rows
            }
        };
        rows
    }
}

impl Graph for SqliteGraph {
    fn upsert_link(&self, link: &Link) -> Result<Link, GraphError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage)?;

        let existing = tx
            .query_row(
                "SELECT id, url, retrieved_secs, retrieved_nanos FROM links WHERE url = ?1",
                params![link.url],
                link_from_row,
            )
            .optional()
            .map_err(storage)?;

        let stored = match existing {
            Some(mut existing) => {
                if link.retrieved_at > existing.retrieved_at {
                    let (secs, nanos) = timestamp(link.retrieved_at);
                    tx.execute(
                        "UPDATE links SET retrieved_secs = ?1, retrieved_nanos = ?2 WHERE id = ?3",
                        params![secs, nanos, existing.id.to_string()],
                    )
                    .map_err(storage)?;
                    existing.retrieved_at = link.retrieved_at;
                }
                existing
            }
            None => {
                let id = fresh_id(&tx, "links").map_err(storage)?;
                let (secs, nanos) = timestamp(link.retrieved_at);
                tx.execute(
                    "INSERT INTO links (id, url, retrieved_secs, retrieved_nanos)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id.to_string(), link.url, secs, nanos],
                )
                .map_err(storage)?;
                debug!(%id, url = %link.url, "inserted link");
                Link {
                    id,
                    url: link.url.clone(),
                    retrieved_at: link.retrieved_at,
                }
            }
        };

        tx.commit().map_err(storage)?;
        Ok(stored)
    }

    fn find_link(&self, id: Uuid) -> Result<Link, GraphError> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, url, retrieved_secs, retrieved_nanos FROM links WHERE id = ?1",
                params![id.to_string()],
                link_from_row,
            )
            .optional()
            .map_err(storage)?
            .ok_or(GraphError::NotFound(id))
    }

    fn upsert_edge(&self, edge: &Edge) -> Result<Edge, GraphError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage)?;

        let known: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM links WHERE id IN (?1, ?2)",
                params![edge.src.to_string(), edge.dst.to_string()],
                |row| row.get(0),
            )
            .map_err(storage)?;
        let expected = if edge.src == edge.dst { 1 } else { 2 };
        if known != expected {
            return Err(GraphError::UnknownEdgeEndpoint {
                src: edge.src,
                dst: edge.dst,
            });
        }

        let now = Utc::now();
        let (now_secs, now_nanos) = timestamp(now);
        let existing = tx
            .query_row(
                "SELECT id, src, dst, updated_secs, updated_nanos FROM edges
                 WHERE src = ?1 AND dst = ?2",
                params![edge.src.to_string(), edge.dst.to_string()],
                edge_from_row,
            )
            .optional()
            .map_err(storage)?;

        let stored = match existing {
            Some(mut existing) => {
                tx.execute(
                    "UPDATE edges SET updated_secs = ?1, updated_nanos = ?2 WHERE id = ?3",
                    params![now_secs, now_nanos, existing.id.to_string()],
                )
                .map_err(storage)?;
                existing.updated_at = now;
                existing
            }
            None => {
                let id = fresh_id(&tx, "edges").map_err(storage)?;
                tx.execute(
                    "INSERT INTO edges (id, src, dst, updated_secs, updated_nanos)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id.to_string(),
                        edge.src.to_string(),
                        edge.dst.to_string(),
                        now_secs,
                        now_nanos
                    ],
                )
                .map_err(storage)?;
                debug!(%id, src = %edge.src, dst = %edge.dst, "inserted edge");
                Edge {
                    id,
                    src: edge.src,
                    dst: edge.dst,
                    updated_at: now,
                }
            }
        };

        tx.commit().map_err(storage)?;
        Ok(stored)
    }

    fn remove_stale_edges(
        &self,
        from: Uuid,
        updated_before: DateTime<Utc>,
    ) -> Result<(), GraphError> {
        let (secs, nanos) = timestamp(updated_before);
        let removed = self
            .conn
            .lock()
            .execute(
                "DELETE FROM edges WHERE src = ?1 AND (updated_secs, updated_nanos) < (?2, ?3)",
                params![from.to_string(), secs, nanos],
            )
            .map_err(storage)?;

        if removed > 0 {
            debug!(%from, removed, "removed stale edges");
        }
        Ok(())
    }

    fn links(
        &self,
        from: Uuid,
        to: Uuid,
        retrieved_before: DateTime<Utc>,
    ) -> Result<Box<dyn LinkIterator + '_>, GraphError> {
        Ok(Box::new(PagedIterator::new(
            self,
            PageRange::new(from, to, retrieved_before),
            Self::fetch_links,
        )))
    }

    fn edges(
        &self,
        from: Uuid,
        to: Uuid,
        updated_before: DateTime<Utc>,
    ) -> Result<Box<dyn EdgeIterator + '_>, GraphError> {
        Ok(Box::new(PagedIterator::new(
            self,
            PageRange::new(from, to, updated_before),
            Self::fetch_edges,
        )))
    }
}

/// Bounds of a range query, pre-rendered as SQL values.
struct PageRange {
    from: String,
    to: String,
    before: (i64, u32),
}

impl PageRange {
    fn new(from: Uuid, to: Uuid, before: DateTime<Utc>) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            before: timestamp(before),
        }
    }
}

type FetchPage<T> = fn(&Connection, &PageRange, Option<&T>) -> rusqlite::Result<Vec<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageState {
    /// More pages may follow the buffered one.
    Open,
    /// The buffered page is the last one.
    LastPage,
    Closed,
    Errored,
}

/// Keyset-paginated iterator over a range query.
struct PagedIterator<'a, T> {
    graph: &'a SqliteGraph,
    range: PageRange,
    fetch: FetchPage<T>,
    page: std::vec::IntoIter<T>,
    last: Option<T>,
    state: PageState,
    error: Option<GraphError>,
}

impl<'a, T> PagedIterator<'a, T> {
    fn new(graph: &'a SqliteGraph, range: PageRange, fetch: FetchPage<T>) -> Self {
        Self {
            graph,
            range,
            fetch,
            page: Vec::new().into_iter(),
            last: None,
            state: PageState::Open,
            error: None,
        }
    }

    fn close_pages(&mut self) {
        if self.state != PageState::Errored {
            self.state = PageState::Closed;
        }
        self.page = Vec::new().into_iter();
        self.last = None;
    }
}

impl<T: Clone> Iterator for PagedIterator<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if matches!(self.state, PageState::Closed | PageState::Errored) {
                return None;
            }

            if let Some(item) = self.page.next() {
                self.last = Some(item.clone());
                return Some(item);
            }

            if self.state == PageState::LastPage {
                return None;
            }

            let fetched = {
                let conn = self.graph.conn.lock();
                (self.fetch)(&conn, &self.range, self.last.as_ref())
            };
            match fetched {
                Ok(rows) => {
                    if (rows.len() as i64) < PAGE_SIZE {
                        self.state = PageState::LastPage;
                    }
                    self.page = rows.into_iter();
                }
                Err(e) => {
                    self.state = PageState::Errored;
                    self.error = Some(storage(e));
                }
            }
        }
    }
}

impl LinkIterator for PagedIterator<'_, Link> {
    fn error(&self) -> Option<&GraphError> {
        self.error.as_ref()
    }

    fn close(&mut self) -> Result<(), GraphError> {
        self.close_pages();
        Ok(())
    }
}

impl EdgeIterator for PagedIterator<'_, Edge> {
    fn error(&self) -> Option<&GraphError> {
        self.error.as_ref()
    }

    fn close(&mut self) -> Result<(), GraphError> {
        self.close_pages();
        Ok(())
    }
}
