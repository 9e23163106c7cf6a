//! # Cost Models
//!
//! Hooks that decide which points a search may enter and what moving between
//! two points costs.
//!
//! The solver multiplies [`CostModel::compute_cost`] by the weight scale of
//! the point being entered. Estimates are multiplied by
//! [`CostModel::heuristic_scale`] before they rank open points; by default
//! that is the smallest enabled weight scale capped at one, which keeps the
//! Euclidean estimate admissible for weight scales below one.

use crate::fixed::Fixed;
use crate::graph::{Graph, Point};

/// Traversal policy and cost functions used by a solver.
///
/// Every method has a default, so a custom model only overrides what it
/// changes. Hooks receive the points themselves; `Point::id` identifies them.
pub trait CostModel {
    /// Whether the search may start from or step into `point`.
    fn is_point_enabled(&self, point: &Point) -> bool {
        point.is_enabled()
    }

    /// Heuristic cost from `from` to the search target `to`.
    ///
    /// Must never overestimate the real remaining cost, or the returned path
    /// may not be the cheapest one.
    fn estimate_cost(&self, from: &Point, to: &Point) -> Fixed {
        euclidean(from, to)
    }

    /// Factor applied to [`CostModel::estimate_cost`] when ranking open
    /// points, evaluated once per query.
    ///
    /// The partial-path fallback compares unscaled estimates.
    fn heuristic_scale(&self, graph: &Graph) -> Fixed {
        graph
            .min_weight_scale()
            .map_or(Fixed::ONE, |scale| scale.min(Fixed::ONE))
    }

    /// Unscaled cost of the edge `from -> to`.
    fn compute_cost(&self, from: &Point, to: &Point) -> Fixed {
        euclidean(from, to)
    }
}

/// Straight-line distance between two points.
///
/// The squared distance is converted to [`Fixed`] before the root is taken,
/// so it saturates once it exceeds 2^47: coordinates are supported up to
/// about 11.8 million units apart. Longer edges all cost the same.
#[must_use]
pub fn euclidean(from: &Point, to: &Point) -> Fixed {
    Fixed::from_int(from.position().distance_squared(to.position())).sqrt()
}

/// Straight-line costs, honoring each point's enabled flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EuclideanCost;

impl CostModel for EuclideanCost {}
