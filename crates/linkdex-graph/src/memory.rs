//! In-memory link graph.
//!
//! All state lives behind a single reader-writer lock. Mutations take the
//! write lock; lookups and iterator snapshots take the read lock. Iterators
//! re-take the read lock for every element they yield, so a long-running
//! iteration never blocks writers for more than one element read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use linkdex_core::{Edge, EdgeIterator, Graph, GraphError, Link, LinkIterator};

use crate::iterator::SnapshotIterator;

#[derive(Debug, Default)]
pub(crate) struct GraphState {
    links: HashMap<Uuid, Link>,
    edges: HashMap<Uuid, Edge>,

    /// URL -> link id, for upsert deduplication.
    link_url_index: HashMap<String, Uuid>,
    /// Source link id -> ids of the edges originating there.
    link_edge_map: HashMap<Uuid, Vec<Uuid>>,
}

impl GraphState {
    pub(crate) fn link(&self, id: &Uuid) -> Option<Link> {
        self.links.get(id).cloned()
    }

    pub(crate) fn edge(&self, id: &Uuid) -> Option<Edge> {
        self.edges.get(id).cloned()
    }
}

/// A [`Graph`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    state: RwLock<GraphState>,
}

/// Generate v4 ids until one is not already taken.
fn fresh_id(taken: impl Fn(&Uuid) -> bool) -> Uuid {
    loop {
        let id = Uuid::new_v4();
        if !taken(&id) {
            return id;
        }
    }
}

impl InMemoryGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.state.read().links.len()
    }

    /// Number of stored edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }

    /// Read one element under the shared lock.
    pub(crate) fn read<T>(
        &self,
        fetch: fn(&GraphState, &Uuid) -> Option<T>,
        id: &Uuid,
    ) -> Option<T> {
        fetch(&self.state.read(), id)
    }
}

impl Graph for InMemoryGraph {
    fn upsert_link(&self, link: &Link) -> Result<Link, GraphError> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        // A known URL turns the insert into an update of the existing link.
        if let Some(existing) = state
            .link_url_index
            .get(&link.url)
            .and_then(|id| state.links.get_mut(id))
        {
            existing.retrieved_at = existing.retrieved_at.max(link.retrieved_at);
            return Ok(existing.clone());
        }

        let id = fresh_id(|id| state.links.contains_key(id));
        let stored = Link {
            id,
            url: link.url.clone(),
            retrieved_at: link.retrieved_at,
        };
        state.link_url_index.insert(stored.url.clone(), id);
        state.links.insert(id, stored.clone());

        debug!(%id, url = %stored.url, "inserted link");
        Ok(stored)
    }

    fn find_link(&self, id: Uuid) -> Result<Link, GraphError> {
        self.state
            .read()
            .link(&id)
            .ok_or(GraphError::NotFound(id))
    }

    fn upsert_edge(&self, edge: &Edge) -> Result<Edge, GraphError> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if !state.links.contains_key(&edge.src) || !state.links.contains_key(&edge.dst) {
            return Err(GraphError::UnknownEdgeEndpoint {
                src: edge.src,
                dst: edge.dst,
            });
        }

        let now = Utc::now();

        // Scan the edges leaving src for an existing (src, dst) pair.
        if let Some(edge_ids) = state.link_edge_map.get(&edge.src) {
            for edge_id in edge_ids {
                if let Some(existing) = state.edges.get_mut(edge_id) {
                    if existing.dst == edge.dst {
                        existing.updated_at = now;
                        return Ok(existing.clone());
                    }
                }
            }
        }

        let id = fresh_id(|id| state.edges.contains_key(id));
        let stored = Edge {
            id,
            src: edge.src,
            dst: edge.dst,
            updated_at: now,
        };
        state.edges.insert(id, stored.clone());
        state.link_edge_map.entry(edge.src).or_default().push(id);

        debug!(%id, src = %stored.src, dst = %stored.dst, "inserted edge");
        Ok(stored)
    }

    fn remove_stale_edges(
        &self,
        from: Uuid,
        updated_before: DateTime<Utc>,
    ) -> Result<(), GraphError> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let Some(edge_ids) = state.link_edge_map.get_mut(&from) else {
            return Ok(());
        };

        let before = edge_ids.len();
        edge_ids.retain(|edge_id| {
            let stale = state
                .edges
                .get(edge_id)
                .map_or(true, |e| e.updated_at < updated_before);
            if stale {
                state.edges.remove(edge_id);
            }
            !stale
        });

        let removed = before - edge_ids.len();
        if edge_ids.is_empty() {
            state.link_edge_map.remove(&from);
        }
        if removed > 0 {
            debug!(%from, removed, "removed stale edges");
        }
        Ok(())
    }

    fn links(
        &self,
        from: Uuid,
        to: Uuid,
        retrieved_before: DateTime<Utc>,
    ) -> Result<Box<dyn LinkIterator + '_>, GraphError> {
        let mut ids: Vec<Uuid> = {
            let state = self.state.read();
            let ids = state
                .links
                .values()
                .filter(|l| l.id >= from && l.id < to && l.retrieved_at < retrieved_before)
                .map(|l| l.id)
                .collect();
            ids
        };
        ids.sort_unstable();

        Ok(Box::new(SnapshotIterator::new(self, ids, GraphState::link)))
    }

    fn edges(
        &self,
        from: Uuid,
        to: Uuid,
        updated_before: DateTime<Utc>,
    ) -> Result<Box<dyn EdgeIterator + '_>, GraphError> {
        let ids: Vec<Uuid> = {
            let state = self.state.read();
            let mut sources: Vec<&Uuid> = state
                .link_edge_map
                .keys()
                .filter(|src| **src >= from && **src < to)
                .collect();
            sources.sort_unstable();

            let ids = sources
                .into_iter()
                .flat_map(|src| &state.link_edge_map[src])
                .filter(|edge_id| {
                    state
                        .edges
                        .get(*edge_id)
                        .is_some_and(|e| e.updated_at < updated_before)
                })
                .copied()
                .collect();
            ids
        };

        Ok(Box::new(SnapshotIterator::new(self, ids, GraphState::edge)))
    }
}
