//! Document type: fetched page content keyed by its link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Indexed content for a single link.
///
/// `page_rank` belongs to the ranking subsystem: indexers keep whatever
/// score is already stored when content is re-indexed, and only
/// [`Indexer::update_score`](crate::Indexer::update_score) changes it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    // === Identity ===
    pub link_id: Uuid,
    pub url: String,

    // === Content ===
    pub title: String,
    pub content: String,

    // === Bookkeeping ===
    /// Stamped by the indexer on every `index` call.
    pub indexed_at: DateTime<Utc>,
    pub page_rank: f64,
}

impl Document {
    /// A document for `link_id` with the given content and no score.
    #[must_use]
    pub fn new(
        link_id: Uuid,
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            link_id,
            url: url.into(),
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// The empty document an indexer stores when a score arrives before
    /// any content has been indexed for the link.
    #[must_use]
    pub fn placeholder(link_id: Uuid) -> Self {
        Self {
            link_id,
            ..Self::default()
        }
    }
}
