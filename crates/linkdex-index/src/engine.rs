//! The full-text engine a [`ContentIndex`](crate::ContentIndex) delegates to.
//!
//! The engine matches and ranks on the searchable text and the PageRank used
//! as the primary sort key. Results come back as keys; documents themselves
//! are resolved by the content index.

use chrono::{DateTime, Utc};

use linkdex_core::{Document, IndexError, QueryType};

/// The fields of one document as handed to the engine.
///
/// Only `title` and `content` are searchable; the rest is stored alongside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineDoc<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub indexed_at: DateTime<Utc>,
    pub page_rank: f64,
}

impl<'a> From<&'a Document> for EngineDoc<'a> {
    fn from(doc: &'a Document) -> Self {
        Self {
            url: &doc.url,
            title: &doc.title,
            content: &doc.content,
            indexed_at: doc.indexed_at,
            page_rank: doc.page_rank,
        }
    }
}

/// One batch request against the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineQuery {
    pub kind: QueryType,
    pub expression: String,
    /// Rank of the first hit to return.
    pub from: u64,
    /// Maximum number of hits to return.
    pub size: u64,
}

/// A matching document key with the engine's relevance score (higher is better).
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub key: String,
    pub score: f64,
}

/// One batch of ranked hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineResults {
    /// The engine's count of all documents matching the query.
    pub total: u64,
    pub hits: Vec<Hit>,
}

/// Keyed full-text indexing with ranked, paginated search.
///
/// Results are ordered by `page_rank` descending, then by relevance
/// descending. Implementations handle their own synchronization.
pub trait SearchEngine: Send + Sync {
    /// Insert or replace the searchable fields stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the write fails.
    fn index(&self, key: &str, doc: EngineDoc<'_>) -> Result<(), IndexError>;

    /// Run one batch of a search.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the search fails.
    fn search(&self, query: &EngineQuery) -> Result<EngineResults, IndexError>;
}
