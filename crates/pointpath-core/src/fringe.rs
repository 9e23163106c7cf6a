//! # Fringe Strategy
//!
//! Fringe search: iterative deepening on f-score without restarting from the
//! origin.
//!
//! Nodes are processed from the `now` list as long as their f-score is within
//! the current limit. Nodes above the limit are deferred to `later`, and the
//! smallest deferred f-score becomes the limit once `now` runs dry. A node
//! whose g-score improves is reopened, even if it was already expanded, so
//! the route found costs the same as the A* one.

use crate::cost::CostModel;
use crate::fixed::Fixed;
use crate::graph::Graph;
use crate::primitives::OPEN_LIST_RESERVE;
use crate::session::{PathSearch, ScoreState, SearchSession, SolveQuery, SolveStrategy};
use crate::types::PointId;

/// Fringe search path solver.
pub type FringeSolver<C = crate::cost::EuclideanCost> = PathSearch<Fringe, C>;

/// Fringe search strategy. Keeps both lists allocated between queries.
#[derive(Debug, Clone, Default)]
pub struct Fringe {
    now: Vec<PointId>,
    later: Vec<PointId>,
}

impl Fringe {
    fn reset(&mut self) {
        self.now.clear();
        self.later.clear();
        self.now.reserve(OPEN_LIST_RESERVE);
        self.later.reserve(OPEN_LIST_RESERVE);
    }
}

impl SolveStrategy for Fringe {
    type State = ScoreState;

    fn solve<C: CostModel>(
        &mut self,
        search: &mut SearchSession<ScoreState>,
        graph: &Graph,
        cost: &C,
        query: SolveQuery,
    ) -> bool {
        let SolveQuery {
            begin,
            end,
            pass,
            allow_partial,
        } = query;
        let (Some(begin_point), Some(end_point)) =
            (search.ensure_node(graph, begin), search.ensure_node(graph, end))
        else {
            return false;
        };
        if !cost.is_point_enabled(end_point) && !allow_partial {
            return false;
        }

        let heuristic_scale = cost.heuristic_scale(graph);
        let heuristic = cost.estimate_cost(begin_point, end_point);
        let begin_f = heuristic * heuristic_scale;
        if let Some(node) = search.node_mut(begin) {
            node.state.g_score = Fixed::ZERO;
            node.state.f_score = begin_f;
            node.state.abs_f_score = heuristic;
            node.state.open_pass = pass;
            node.state.closed_pass = 0;
        }
        self.reset();
        self.now.push(begin);

        let mut f_limit = begin_f;
        let mut next_f_limit = Fixed::MAX;

        loop {
            let Some(current) = self.now.pop() else {
                if self.later.is_empty() {
                    return false;
                }
                std::mem::swap(&mut self.now, &mut self.later);
                // Popped from the back, so keep deferral order.
                self.now.reverse();
                f_limit = next_f_limit;
                next_f_limit = Fixed::MAX;
                continue;
            };

            let scores = search.scores(current);
            if !scores.is_open(pass) || scores.is_closed(pass) {
                continue;
            }
            if scores.f_score > f_limit {
                next_f_limit = next_f_limit.min(scores.f_score);
                self.later.push(current);
                continue;
            }

            search.consider_closest(current);
            if current == end {
                return true;
            }

            let Some(current_point) = search.ensure_node(graph, current) else {
                continue;
            };
            if let Some(node) = search.node_mut(current) {
                node.state.closed_pass = pass;
            }

            // Pushed in reverse so the lowest id is expanded first.
            for neighbor in current_point.neighbors().rev() {
                let Some(neighbor_point) = search.ensure_node(graph, neighbor) else {
                    continue;
                };
                if !cost.is_point_enabled(neighbor_point) {
                    continue;
                }

                let neighbor_scores = search.scores(neighbor);
                let tentative_g = scores.g_score
                    + cost.compute_cost(current_point, neighbor_point)
                        * neighbor_point.weight_scale();
                if neighbor_scores.is_open(pass) && tentative_g >= neighbor_scores.g_score {
                    continue;
                }

                let heuristic = cost.estimate_cost(neighbor_point, end_point);
                if let Some(node) = search.node_mut(neighbor) {
                    node.set_prev(Some(current));
                    node.state.g_score = tentative_g;
                    node.state.abs_f_score = heuristic;
                    node.state.f_score = tentative_g + heuristic * heuristic_scale;
                    node.state.open_pass = pass;
                    node.state.closed_pass = 0;
                }
                self.now.push(neighbor);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
