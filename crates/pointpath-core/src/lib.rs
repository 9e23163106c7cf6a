//! # pointpath-core
//!
//! The deterministic pathfinding engine for Pointpath - THE LOGIC.
//!
//! This crate owns a weighted point graph and two interchangeable solvers
//! that search it: A* over a binary heap and Fringe search over a pair of
//! flat lists. Both keep their per-point search state across queries and
//! tell queries apart with a pass counter instead of clearing that state.
//!
//! ## Usage
//!
//! ```
//! use pointpath_core::{AStarSolver, Fixed, Graph, IVec2, PointId};
//!
//! let mut graph = Graph::new();
//! graph.add_point(PointId(1), IVec2::new(0, 0), Fixed::ONE, &[]).expect("add");
//! graph.add_point(PointId(2), IVec2::new(3, 4), Fixed::ONE, &[PointId(1)]).expect("add");
//!
//! let mut solver = AStarSolver::new(&graph);
//! assert_eq!(
//!     solver.get_id_path(&graph, PointId(1), PointId(2), false),
//!     vec![PointId(1), PointId(2)]
//! );
//! ```
//!
//! ## Architectural Constraints
//!
//! - Every cost is a [`Fixed`]: no floating-point anywhere
//! - `BTreeMap`/`BTreeSet` only, so iteration order and tie-breaks are stable
//! - Solvers never borrow the graph between calls; they observe it through a
//!   [`GraphSubscription`] and are handed `&Graph` on every query
//! - NO async, NO network, NO file I/O (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod astar;
pub mod cost;
pub mod events;
pub mod fixed;
pub mod formats;
pub mod fringe;
pub mod geometry;
pub mod graph;
pub mod primitives;
pub mod session;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use fixed::{Fixed, ParseFixedError};
pub use geometry::{FVec2, IVec2, closest_point_to_segment};
pub use types::{GraphError, PathError, PointHandle, PointId};

// =============================================================================
// RE-EXPORTS: Graph
// =============================================================================

pub use events::{GraphEvent, GraphSubscription};
pub use graph::{Direction, Graph, Point, Segment};

// =============================================================================
// RE-EXPORTS: Solvers
// =============================================================================

pub use astar::{AStar, AStarSolver};
pub use cost::{CostModel, EuclideanCost};
pub use fringe::{Fringe, FringeSolver};
pub use session::{PathSearch, ScoreState, SearchNode, SearchSession, SolveQuery, SolveStrategy};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{
    SerializableGraph, SerializablePoint, SnapshotHeader, graph_from_bytes, graph_to_bytes,
};
