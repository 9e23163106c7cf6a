//! # Graph Events
//!
//! Change notifications published by a [`Graph`](crate::Graph).
//!
//! The graph appends every invalidating mutation to a bounded journal.
//! Observers hold a [`GraphSubscription`]: a weak link to the graph's
//! identity plus a cursor into the journal. Nothing in here keeps a borrow
//! of the graph alive, so a graph can be mutated freely while solvers and
//! other observers are subscribed to it.

use crate::primitives::JOURNAL_CAPACITY;
use crate::types::{GraphError, PointId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// An invalidating change to a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// The point with this id was removed.
    PointRemoved(PointId),
    /// Point storage was reallocated, compacted or cleared.
    StorageInvalidated,
}

// =============================================================================
// GRAPH IDENTITY
// =============================================================================

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one graph instance.
///
/// The graph owns the only strong reference. When the graph is dropped, every
/// subscription's weak link dies with it.
#[derive(Debug)]
pub(crate) struct GraphLink {
    id: u64,
}

impl GraphLink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

// =============================================================================
// EVENT JOURNAL
// =============================================================================

/// Bounded, sequence-numbered log of graph events.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventJournal {
    events: VecDeque<GraphEvent>,
    /// Sequence number of `events[0]`.
    first_seq: u64,
}

impl EventJournal {
    pub(crate) fn push(&mut self, event: GraphEvent) {
        if self.events.len() == JOURNAL_CAPACITY {
            self.events.pop_front();
            self.first_seq = self.first_seq.saturating_add(1);
        }
        self.events.push_back(event);
    }

    /// Sequence number the next event will get.
    pub(crate) fn next_seq(&self) -> u64 {
        self.first_seq.saturating_add(self.events.len() as u64)
    }

    /// Events at or after `cursor`, or `None` if some of them were dropped.
    fn since(&self, cursor: u64) -> Option<impl Iterator<Item = GraphEvent> + '_> {
        if cursor < self.first_seq {
            return None;
        }
        let skip = usize::try_from(cursor - self.first_seq).unwrap_or(usize::MAX);
        Some(self.events.iter().skip(skip).copied())
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// A cursor into one graph's event journal.
#[derive(Debug, Clone)]
pub struct GraphSubscription {
    link: Weak<GraphLink>,
    graph_id: u64,
    cursor: u64,
}

impl GraphSubscription {
    pub(crate) fn new(link: &Arc<GraphLink>, cursor: u64) -> Self {
        Self {
            link: Arc::downgrade(link),
            graph_id: link.id(),
            cursor,
        }
    }

    /// Process-unique id of the graph this subscription observes.
    #[must_use]
    pub fn graph_id(&self) -> u64 {
        self.graph_id
    }

    /// Whether the observed graph has been dropped.
    #[must_use]
    pub fn is_graph_destroyed(&self) -> bool {
        self.link.strong_count() == 0
    }

    /// Whether `graph` is the graph this subscription observes.
    #[must_use]
    pub fn observes(&self, graph: &crate::Graph) -> bool {
        Weak::ptr_eq(&self.link, &Arc::downgrade(graph.link()))
    }

    /// Take every event published since the last poll.
    ///
    /// A subscriber that fell behind the retained window gets a single
    /// `StorageInvalidated` instead of the events it missed.
    pub fn poll(&mut self, graph: &crate::Graph) -> Result<Vec<GraphEvent>, GraphError> {
        if !self.observes(graph) {
            return Err(GraphError::ForeignGraph);
        }

        let journal = graph.journal();
        let events = match journal.since(self.cursor) {
            Some(events) => events.collect(),
            None => {
                tracing::debug!(
                    graph = self.graph_id,
                    cursor = self.cursor,
                    "subscriber lagged behind the event journal"
                );
                vec![GraphEvent::StorageInvalidated]
            }
        };
        self.cursor = journal.next_seq();
        Ok(events)
    }
}

// =============================================================================
// TESTS
// =============================================================================
