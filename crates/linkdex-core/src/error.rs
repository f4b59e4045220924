//! Error types for linkdex.

use thiserror::Error;
use uuid::Uuid;

/// Top-level result type for linkdex operations.
pub type Result<T> = std::result::Result<T, LinkdexError>;

/// Top-level error type for linkdex.
#[derive(Debug, Error)]
pub enum LinkdexError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by link graph stores.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("not found: {0}")]
    NotFound(Uuid),

    #[error("unknown edge endpoint: edge {src} -> {dst} references a link that does not exist")]
    UnknownEdgeEndpoint { src: Uuid, dst: Uuid },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors returned by content indexers.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("not found: document for link {0}")]
    NotFound(Uuid),

    #[error("missing identifier: document has no link id")]
    MissingIdentifier,

    #[error("invalid score {score} for link {link_id}: must be finite")]
    InvalidScore { link_id: Uuid, score: f64 },

    #[error("delegate failure: {0}")]
    Delegate(String),
}

impl GraphError {
    /// Whether this error is a lookup miss.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl IndexError {
    /// Whether this error is a lookup miss.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_human_readable_messages() {
        let src = Uuid::new_v4();
        let dst = Uuid::new_v4();
        let msg = GraphError::UnknownEdgeEndpoint { src, dst }.to_string();
        assert!(msg.contains(&src.to_string()));
        assert!(msg.contains(&dst.to_string()));

        let msg = IndexError::Delegate("disk I/O error".to_string()).to_string();
        assert!(msg.contains("delegate failure"));
        assert!(msg.contains("disk I/O error"));

        let msg = IndexError::InvalidScore { link_id: src, score: f64::NAN }.to_string();
        assert!(msg.contains(&src.to_string()));
        assert!(msg.contains("NaN"));
    }

    #[test]
    fn top_level_error_wraps_store_errors() {
        let id = Uuid::new_v4();
        let err: LinkdexError = GraphError::NotFound(id).into();
        assert!(matches!(err, LinkdexError::Graph(GraphError::NotFound(x)) if x == id));

        let err: LinkdexError = IndexError::MissingIdentifier.into();
        assert!(err.to_string().starts_with("index error:"));
    }

    #[test]
    fn not_found_predicates() {
        assert!(GraphError::NotFound(Uuid::nil()).is_not_found());
        assert!(!GraphError::Storage("x".into()).is_not_found());
        assert!(IndexError::NotFound(Uuid::nil()).is_not_found());
        assert!(!IndexError::MissingIdentifier.is_not_found());
    }
}
