//! Batched iterator over ranked search results.

use tracing::debug;

use linkdex_core::{Document, DocumentIterator, IndexError, Query};

use crate::engine::{Hit, SearchEngine};
use crate::index::ContentIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// First batch fetched, nothing yielded yet.
    Initialized,
    Iterating,
    Exhausted,
    Closed,
    Errored,
}

/// Yields documents for a query one batch of engine hits at a time.
///
/// Each hit is resolved through the index's document map when it is
/// reached, so yielded documents reflect the latest writes.
pub struct SearchIterator<'a, E> {
    index: &'a ContentIndex<E>,
    query: Query,
    batch: std::vec::IntoIter<Hit>,
    /// Rank of the next hit across all batches.
    cum_idx: u64,
    total: u64,
    state: State,
    err: Option<IndexError>,
}

impl<'a, E: SearchEngine> SearchIterator<'a, E> {
    /// Fetch the first batch of `query` and return an iterator positioned
    /// at `query.offset`.
    pub(crate) fn start(index: &'a ContentIndex<E>, query: Query) -> Result<Self, IndexError> {
        let first = index.fetch_batch(&query, query.offset)?;
        Ok(Self {
            index,
            cum_idx: query.offset,
            query,
            batch: first.hits.into_iter(),
            total: first.total,
            state: State::Initialized,
            err: None,
        })
    }

    fn fail(&mut self, err: IndexError) {
        debug!(error = %err, "search iterator failed");
        self.err = Some(err);
        self.state = State::Errored;
        self.batch = Vec::new().into_iter();
    }
}

impl<E: SearchEngine> Iterator for SearchIterator<'_, E> {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        loop {
            match self.state {
                State::Initialized => self.state = State::Iterating,
                State::Iterating => {}
                State::Exhausted | State::Closed | State::Errored => return None,
            }

            if self.cum_idx >= self.total {
                self.state = State::Exhausted;
                return None;
            }

            if let Some(hit) = self.batch.next() {
                self.cum_idx += 1;
                return match self.index.resolve(&hit.key) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        self.fail(e);
                        None
                    }
                };
            }

            match self.index.fetch_batch(&self.query, self.cum_idx) {
                Ok(results) if results.hits.is_empty() => {
                    // Matches were removed since the total was reported.
                    self.total = results.total;
                    self.state = State::Exhausted;
                    return None;
                }
                Ok(results) => {
                    self.total = results.total;
                    self.batch = results.hits.into_iter();
                }
                Err(e) => {
                    self.fail(e);
                    return None;
                }
            }
        }
    }
}

impl<E: SearchEngine> DocumentIterator for SearchIterator<'_, E> {
    fn error(&self) -> Option<&IndexError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<(), IndexError> {
        self.state = State::Closed;
        self.batch = Vec::new().into_iter();
        Ok(())
    }

    fn total_count(&self) -> u64 {
        self.total
    }
}
