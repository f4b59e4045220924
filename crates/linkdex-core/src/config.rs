//! Store configuration, loaded from TOML.
//!
//! ```toml
//! [graph]
//! backend = "sqlite"
//! path = "graph.db"
//!
//! [index]
//! path = "index.db"
//! ```
//!
//! Every section is optional; the default is an all-in-memory setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LinkdexError;

/// Which graph store implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Graph store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub backend: GraphBackend,
    /// Database file for the SQLite backend; in-memory database when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Content index settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Database file for the full-text engine; in-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Configuration for both stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

impl StoreConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`LinkdexError::Config`] if the text is not valid configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, LinkdexError> {
        let config: Self = toml::from_str(text).map_err(|e| LinkdexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`LinkdexError::Io`] if the file cannot be read and
    /// [`LinkdexError::Config`] if its contents are invalid.
    pub fn load(path: &Path) -> Result<Self, LinkdexError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), LinkdexError> {
        if self.graph.backend == GraphBackend::Memory && self.graph.path.is_some() {
            return Err(LinkdexError::Config(
                "graph.path is only valid with backend = \"sqlite\"".to_string(),
            ));
        }
        Ok(())
    }
}
