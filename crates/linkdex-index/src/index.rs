//! Content index: an owned document map plus a delegate search engine.
//!
//! The map is the source of truth for documents; the engine answers queries
//! with keys that are resolved back through the map. Writes go to the map
//! first and then to the engine. They are not atomic: when the engine write
//! fails the map keeps the new document.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use linkdex_core::{Document, DocumentIterator, IndexError, Indexer, Query};

use crate::engine::{EngineDoc, EngineQuery, EngineResults, SearchEngine};
use crate::fts::Fts5Engine;
use crate::iterator::SearchIterator;

/// Hits requested from the engine per batch.
pub const BATCH_SIZE: u64 = 10;

/// An [`Indexer`] keeping documents in memory and delegating full-text
/// matching and ranking to a [`SearchEngine`].
pub struct ContentIndex<E = Fts5Engine> {
    docs: RwLock<HashMap<Uuid, Document>>,
    engine: E,
}

impl ContentIndex<Fts5Engine> {
    /// A content index over an in-memory FTS5 engine.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the engine cannot be created.
    pub fn in_memory() -> Result<Self, IndexError> {
        Ok(Self::new(Fts5Engine::in_memory()?))
    }

    /// A content index over an FTS5 engine database at `path`.
    ///
    /// Documents already stored in the database are loaded into the map.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Delegate`] if the database cannot be opened or
    /// its documents cannot be read.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let engine = Fts5Engine::open(path)?;
        let docs: HashMap<Uuid, Document> = engine
            .documents()?
            .into_iter()
            .map(|doc| (doc.link_id, doc))
            .collect();
        debug!(path = %path.display(), documents = docs.len(), "opened content index");
        Ok(Self {
            docs: RwLock::new(docs),
            engine,
        })
    }
}

impl<E: SearchEngine> ContentIndex<E> {
    /// An empty content index over `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            engine,
        }
    }

    /// The delegate engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Number of documents in the map.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Whether the map holds no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Run one batch of `query` against the engine, starting at rank `from`.
    pub(crate) fn fetch_batch(&self, query: &Query, from: u64) -> Result<EngineResults, IndexError> {
        let results = self.engine.search(&EngineQuery {
            kind: query.kind,
            expression: query.expression.clone(),
            from,
            size: BATCH_SIZE,
        })?;
        debug!(from, hits = results.hits.len(), total = results.total, "fetched search batch");
        Ok(results)
    }

    /// Resolve an engine key to the current copy of its document.
    pub(crate) fn resolve(&self, key: &str) -> Result<Document, IndexError> {
        let id = Uuid::parse_str(key)
            .map_err(|e| IndexError::Delegate(format!("invalid document key {key}: {e}")))?;
        self.docs.read().get(&id).cloned().ok_or(IndexError::NotFound(id))
    }
}

impl<E: SearchEngine> Indexer for ContentIndex<E> {
    fn index(&self, doc: &Document) -> Result<Document, IndexError> {
        if doc.link_id.is_nil() {
            return Err(IndexError::MissingIdentifier);
        }

        let mut stored = doc.clone();
        stored.indexed_at = Utc::now();

        let mut docs = self.docs.write();
        if let Some(existing) = docs.get(&doc.link_id) {
            stored.page_rank = existing.page_rank;
        } else if !stored.page_rank.is_finite() {
            return Err(IndexError::InvalidScore {
                link_id: stored.link_id,
                score: stored.page_rank,
            });
        }
        docs.insert(stored.link_id, stored.clone());

        self.engine
            .index(&stored.link_id.to_string(), EngineDoc::from(&stored))?;

        debug!(link_id = %stored.link_id, url = %stored.url, "indexed document");
        Ok(stored)
    }

    fn find_by_id(&self, link_id: Uuid) -> Result<Document, IndexError> {
        self.docs
            .read()
            .get(&link_id)
            .cloned()
            .ok_or(IndexError::NotFound(link_id))
    }

    fn update_score(&self, link_id: Uuid, score: f64) -> Result<(), IndexError> {
        if !score.is_finite() {
            return Err(IndexError::InvalidScore { link_id, score });
        }

        let mut docs = self.docs.write();
        let doc = docs
            .entry(link_id)
            .or_insert_with(|| Document::placeholder(link_id));
        doc.page_rank = score;

        self.engine.index(&link_id.to_string(), EngineDoc::from(&*doc))?;

        debug!(link_id = %link_id, score, "updated page rank");
        Ok(())
    }

    fn search(&self, query: &Query) -> Result<Box<dyn DocumentIterator + '_>, IndexError> {
        let iter = SearchIterator::start(self, query.clone())?;
        Ok(Box::new(iter))
    }
}
