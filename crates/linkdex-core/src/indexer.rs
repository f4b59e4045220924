//! The content indexer contract.

use uuid::Uuid;

use crate::document::Document;
use crate::error::IndexError;
use crate::query::Query;

/// Ranked search results, fetched from the underlying engine in batches.
pub trait DocumentIterator: Iterator<Item = Document> + Send {
    /// The fault that ended iteration early, if any.
    fn error(&self) -> Option<&IndexError>;

    /// Release the iterator's resources. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if releasing resources fails.
    fn close(&mut self) -> Result<(), IndexError>;

    /// The engine's estimate of how many documents match the query.
    ///
    /// This is approximate and may not equal the number of documents the
    /// iterator ends up yielding.
    fn total_count(&self) -> u64;
}

/// Full-text storage and ranked retrieval of crawled content.
pub trait Indexer: Send + Sync {
    /// Insert or update the document for `doc.link_id`.
    ///
    /// `indexed_at` is stamped with the current time. When a document for
    /// the link already exists its stored `page_rank` is kept. Returns the
    /// document as stored.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::MissingIdentifier`] if `link_id` is nil and
    /// [`IndexError::Delegate`] if the search engine rejects the write.
    fn index(&self, doc: &Document) -> Result<Document, IndexError>;

    /// Look up a document by link id.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] if no document exists.
    fn find_by_id(&self, link_id: Uuid) -> Result<Document, IndexError>;

    /// Set the PageRank score for a link, creating an empty document if
    /// none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidScore`] if `score` is NaN or infinite,
    /// without storing anything, and [`IndexError::Delegate`] if the search
    /// engine rejects the write.
    fn update_score(&self, link_id: Uuid, score: f64) -> Result<(), IndexError>;

    /// Run a ranked search: highest PageRank first, then highest relevance.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the search engine fails.
    fn search(&self, query: &Query) -> Result<Box<dyn DocumentIterator + '_>, IndexError>;
}
