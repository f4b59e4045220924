//! # linkdex-core
//!
//! Core types and store contracts for linkdex.
//!
//! This crate defines the foundational types used across all other linkdex crates:
//! - Entities: [`Link`], [`Edge`], [`Document`], [`Query`]
//! - The link graph contract: [`Graph`], [`LinkIterator`], [`EdgeIterator`]
//! - The content index contract: [`Indexer`], [`DocumentIterator`]
//! - Identifier-range partitioning ([`partition`])
//! - Store configuration ([`StoreConfig`])
//! - Error hierarchy ([`LinkdexError`], [`GraphError`], [`IndexError`])

pub mod config;
pub mod document;
pub mod edge;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod link;
pub mod partition;
pub mod query;

pub use config::{GraphBackend, GraphConfig, IndexConfig, StoreConfig};
pub use document::Document;
pub use edge::Edge;
pub use error::{GraphError, IndexError, LinkdexError, Result};
pub use graph::{EdgeIterator, Graph, LinkIterator};
pub use indexer::{DocumentIterator, Indexer};
pub use link::Link;
pub use partition::IdRange;
pub use query::{Query, QueryType};
