//! # linkdex-index
//!
//! Content indexing for linkdex:
//! - [`ContentIndex`] implements [`linkdex_core::Indexer`] over a document map
//!   and a delegate [`SearchEngine`]
//! - [`Fts5Engine`] is the embedded SQLite FTS5 engine used by default
//! - [`SearchIterator`] streams ranked results in batches of [`BATCH_SIZE`]

pub mod engine;
pub mod fts;
pub mod index;
pub mod iterator;

pub use engine::{EngineDoc, EngineQuery, EngineResults, Hit, SearchEngine};
pub use fts::Fts5Engine;
pub use index::{ContentIndex, BATCH_SIZE};
pub use iterator::SearchIterator;

use linkdex_core::{IndexConfig, IndexError, Indexer};

/// Open the content index described by `config`.
///
/// # Errors
///
/// Returns [`IndexError::Delegate`] if the engine database cannot be opened.
pub fn open_indexer(config: &IndexConfig) -> Result<Box<dyn Indexer>, IndexError> {
    let index = match &config.path {
        Some(path) => ContentIndex::open(path)?,
        None => ContentIndex::in_memory()?,
    };
    tracing::debug!(path = ?config.path, "opened content index");
    Ok(Box::new(index))
}
