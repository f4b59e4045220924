//! Link type: a crawled or discovered URL in the link graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A URL known to the link graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Store-assigned identifier. Nil until the link has been upserted.
    pub id: Uuid,

    /// The link target. Unique across all links in a store.
    pub url: String,

    /// When the URL was last fetched by a crawler.
    pub retrieved_at: DateTime<Utc>,
}

impl Link {
    /// A link that has not been stored yet.
    #[must_use]
    pub fn new(url: impl Into<String>, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::nil(),
            url: url.into(),
            retrieved_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_link_has_nil_id() {
        let link = Link::new("https://example.com", Utc::now());
        assert!(link.id.is_nil());
        assert_eq!(link.url, "https://example.com");
    }

    #[test]
    fn link_serialization_roundtrip() {
        let link = Link {
            id: Uuid::new_v4(),
            url: "https://example.com/a".to_string(),
            retrieved_at: Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap(),
        };

        let json = serde_json::to_string(&link).expect("serialize");
        let deserialized: Link = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(link, deserialized);
    }
}
