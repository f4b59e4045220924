//! Edge type: a directed hyperlink between two links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A graph edge that originates at `src` and terminates at `dst`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Store-assigned identifier. Nil until the edge has been upserted.
    pub id: Uuid,

    /// Id of the link the edge originates from.
    pub src: Uuid,

    /// Id of the link the edge points to.
    pub dst: Uuid,

    /// Stamped by the store on every upsert of the `(src, dst)` pair.
    pub updated_at: DateTime<Utc>,
}

impl Edge {
    /// An edge between two stored links that has not been stored itself.
    #[must_use]
    pub fn new(src: Uuid, dst: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            src,
            dst,
            updated_at: DateTime::<Utc>::default(),
        }
    }
}
