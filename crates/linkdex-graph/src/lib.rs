//! # linkdex-graph
//!
//! Link graph stores implementing [`linkdex_core::Graph`]:
//! - [`InMemoryGraph`]: maps and indexes behind one reader-writer lock
//! - [`SqliteGraph`]: `links` / `edges` tables in a SQLite database

mod iterator;
pub mod memory;
pub mod sqlite;

#[cfg(test)]
mod suite;

pub use memory::InMemoryGraph;
pub use sqlite::SqliteGraph;

use linkdex_core::{Graph, GraphBackend, GraphConfig, GraphError};

/// Open the graph store selected by `config`.
///
/// # Errors
///
/// Returns [`GraphError::Storage`] if the SQLite database cannot be opened.
pub fn open_graph(config: &GraphConfig) -> Result<Box<dyn Graph>, GraphError> {
    let graph: Box<dyn Graph> = match (config.backend, &config.path) {
        (GraphBackend::Memory, _) => Box::new(InMemoryGraph::new()),
        (GraphBackend::Sqlite, Some(path)) => Box::new(SqliteGraph::open(path)?),
        (GraphBackend::Sqlite, None) => Box::new(SqliteGraph::in_memory()?),
    };
    tracing::debug!(backend = ?config.backend, "opened graph store");
    Ok(graph)
}
