//! The link graph contract shared by all graph store backends.
//!
//! Crawler workers shard the graph by identifier range: each worker owns a
//! half-open range `[from, to)` of link ids (see [`crate::partition`]) and
//! calls [`Graph::links`] / [`Graph::edges`] for its range only, so no
//! coordination between workers is needed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::edge::Edge;
use crate::error::GraphError;
use crate::link::Link;

/// A lazy, single-pass sequence of links.
///
/// Which links are visited is fixed when the iterator is created. The value
/// of each link is read from the store when `next()` yields it, so it may
/// reflect writes made after the iterator was created. Each yielded value is
/// an owned copy.
pub trait LinkIterator: Iterator<Item = Link> + Send {
    /// The fault that ended iteration early, if any.
    fn error(&self) -> Option<&GraphError>;

    /// Release the iterator's resources. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if releasing resources fails.
    fn close(&mut self) -> Result<(), GraphError>;
}

/// A lazy, single-pass sequence of edges. Same guarantees as [`LinkIterator`].
pub trait EdgeIterator: Iterator<Item = Edge> + Send {
    /// The fault that ended iteration early, if any.
    fn error(&self) -> Option<&GraphError>;

    /// Release the iterator's resources. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if releasing resources fails.
    fn close(&mut self) -> Result<(), GraphError>;
}

/// Storage for the link graph discovered by crawling.
pub trait Graph: Send + Sync {
    /// Insert a link, or update the existing link with the same URL.
    ///
    /// The incoming `id` is ignored. An existing link keeps its id and its
    /// `retrieved_at` becomes the later of the stored and incoming values.
    /// Returns the link as stored.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the backend fails.
    fn upsert_link(&self, link: &Link) -> Result<Link, GraphError>;

    /// Look up a link by id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotFound`] if no link has this id.
    fn find_link(&self, id: Uuid) -> Result<Link, GraphError>;

    /// Insert an edge, or refresh `updated_at` on the existing edge with the
    /// same `(src, dst)` pair. Returns the edge as stored.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownEdgeEndpoint`] if either endpoint is not
    /// a stored link; nothing is written in that case.
    fn upsert_edge(&self, edge: &Edge) -> Result<Edge, GraphError>;

    /// Delete every edge originating at `from` that was last updated
    /// strictly before `updated_before`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the backend fails.
    fn remove_stale_edges(
        &self,
        from: Uuid,
        updated_before: DateTime<Utc>,
    ) -> Result<(), GraphError>;

    /// Iterate links with `from <= id < to` and `retrieved_at < retrieved_before`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the backend fails.
    fn links(
        &self,
        from: Uuid,
        to: Uuid,
        retrieved_before: DateTime<Utc>,
    ) -> Result<Box<dyn LinkIterator + '_>, GraphError>;

    /// Iterate edges whose *source* link id satisfies `from <= src < to` and
    /// with `updated_at < updated_before`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the backend fails.
    fn edges(
        &self,
        from: Uuid,
        to: Uuid,
        updated_before: DateTime<Utc>,
    ) -> Result<Box<dyn EdgeIterator + '_>, GraphError>;
}
