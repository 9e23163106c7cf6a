//! # Core Type Definitions
//!
//! This module contains the identifiers and error types shared by the graph
//! and the solvers:
//! - Point identifiers (`PointId`) and arena handles (`PointHandle`)
//! - Graph mutation errors (`GraphError`)
//! - Path query errors (`PathError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! and every iteration over them happens in ascending id order.

use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Caller-assigned identifier of a graph point.
///
/// Ids are unsigned, so a negative id can never reach the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointId(pub u64);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PointId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Stable reference to a point's storage slot.
///
/// Every occupation of a slot gets a fresh generation from a graph-wide
/// counter, so a handle that outlived its point (removal, compaction,
/// `clear`) never resolves to a different point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u64,
}

impl PointHandle {
    /// Slot index inside the graph arena.
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    /// Generation the slot had when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by graph mutations and queries.
///
/// None of these are fatal: the graph is left unchanged and the error is
/// logged before it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The requested point does not exist.
    #[error("Point with id {0} doesn't exist")]
    PointNotFound(PointId),

    /// Weight scales must be non-negative.
    #[error("Weight scale must not be negative: {0}")]
    NegativeWeightScale(Fixed),

    /// A point cannot be connected to itself.
    #[error("Can't connect point with id {0} to itself")]
    SelfConnection(PointId),

    /// `reserve_space` must grow the storage.
    #[error("New capacity must be greater than current capacity {current}, requested {requested}")]
    CapacityNotIncreased { current: usize, requested: usize },

    /// The arena cannot address more slots.
    #[error("Point storage is full ({0} slots)")]
    StorageExhausted(usize),

    /// A subscription was polled with a graph it does not belong to.
    #[error("Subscription belongs to a different graph")]
    ForeignGraph,

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Errors raised by path queries.
///
/// "No route" is not an error: it is reported as an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// An endpoint of the query does not exist in the graph.
    #[error("Can't get path. Point with id {0} doesn't exist")]
    PointNotFound(PointId),

    /// The origin of the query is disabled.
    #[error("Can't get path. Point with id {0} is disabled")]
    PointDisabled(PointId),

    /// The solver was detached from its graph.
    #[error("Solver is detached from its graph")]
    Detached,

    /// The graph the solver was bound to has been dropped.
    #[error("The graph this solver was bound to has been destroyed")]
    GraphDestroyed,

    /// The solver was queried with a graph it was not bound to.
    #[error("Solver is bound to a different graph")]
    ForeignGraph,
}

// =============================================================================
// TESTS
// =============================================================================
