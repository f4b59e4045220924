//! Iterators over the in-memory graph.

use uuid::Uuid;

use linkdex_core::{Edge, EdgeIterator, GraphError, Link, LinkIterator};

use crate::memory::{GraphState, InMemoryGraph};

/// Walks a list of ids captured when the iterator was created, reading each
/// element from the graph as it is reached. Ids whose element has been
/// removed in the meantime are skipped.
pub struct SnapshotIterator<'a, T> {
    graph: &'a InMemoryGraph,
    ids: std::vec::IntoIter<Uuid>,
    fetch: fn(&GraphState, &Uuid) -> Option<T>,
    closed: bool,
}

impl<'a, T> SnapshotIterator<'a, T> {
    pub(crate) fn new(
        graph: &'a InMemoryGraph,
        ids: Vec<Uuid>,
        fetch: fn(&GraphState, &Uuid) -> Option<T>,
    ) -> Self {
        Self {
            graph,
            ids: ids.into_iter(),
            fetch,
            closed: false,
        }
    }

    fn close_snapshot(&mut self) {
        self.closed = true;
        self.ids = Vec::new().into_iter();
    }
}

impl<T> Iterator for SnapshotIterator<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.closed {
            return None;
        }
        for id in self.ids.by_ref() {
            if let Some(item) = self.graph.read(self.fetch, &id) {
                return Some(item);
            }
        }
        None
    }
}

impl LinkIterator for SnapshotIterator<'_, Link> {
    fn error(&self) -> Option<&GraphError> {
        None
    }

    fn close(&mut self) -> Result<(), GraphError> {
        self.close_snapshot();
        Ok(())
    }
}

impl EdgeIterator for SnapshotIterator<'_, Edge> {
    fn error(&self) -> Option<&GraphError> {
        None
    }

    fn close(&mut self) -> Result<(), GraphError> {
        self.close_snapshot();
        Ok(())
    }
}
