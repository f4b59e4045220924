//! Search query types.

use serde::{Deserialize, Serialize};

/// How the query expression is matched against document text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Documents containing any of the expression's terms.
    #[default]
    Match,
    /// Documents containing the expression's terms as an exact phrase.
    Phrase,
}

/// A full-text search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "type", default)]
    pub kind: QueryType,
    pub expression: String,
    /// Number of ranked results to skip.
    #[serde(default)]
    pub offset: u64,
}

impl Query {
    /// A match (any term) query starting at the first result.
    #[must_use]
    pub fn matching(expression: impl Into<String>) -> Self {
        Self {
            kind: QueryType::Match,
            expression: expression.into(),
            offset: 0,
        }
    }

    /// A phrase query starting at the first result.
    #[must_use]
    pub fn phrase(expression: impl Into<String>) -> Self {
        Self {
            kind: QueryType::Phrase,
            expression: expression.into(),
            offset: 0,
        }
    }

    /// Skip the first `offset` ranked results.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}
