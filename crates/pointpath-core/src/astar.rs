//! # A* Strategy
//!
//! Classic A* over a binary heap of point ids.
//!
//! The heap is ordered by f-score; equal f-scores prefer the node with the
//! larger g-score, i.e. the one further along its route. When a relaxation
//! improves a node that is already open, the node is sifted up from its
//! current position instead of being removed and reinserted.

use crate::cost::CostModel;
use crate::fixed::Fixed;
use crate::graph::Graph;
use crate::primitives::OPEN_LIST_RESERVE;
use crate::session::{PathSearch, ScoreState, SearchSession, SolveQuery, SolveStrategy};
use crate::types::PointId;

/// A* path solver.
pub type AStarSolver<C = crate::cost::EuclideanCost> = PathSearch<AStar, C>;

/// `true` when `a` should be expanded after `b`.
fn is_worse(search: &SearchSession<ScoreState>, a: PointId, b: PointId) -> bool {
    let a = search.scores(a);
    let b = search.scores(b);
    a.f_score > b.f_score || (a.f_score == b.f_score && a.g_score < b.g_score)
}

// =============================================================================
// OPEN LIST
// =============================================================================

/// Binary heap whose front is the best node to expand next.
#[derive(Debug, Clone, Default)]
struct OpenList {
    heap: Vec<PointId>,
}

impl OpenList {
    fn reset(&mut self) {
        self.heap.clear();
        self.heap.reserve(OPEN_LIST_RESERVE);
    }

    fn front(&self) -> Option<PointId> {
        self.heap.first().copied()
    }

    fn push(&mut self, search: &SearchSession<ScoreState>, id: PointId) {
        self.heap.push(id);
        self.sift_up(search, self.heap.len() - 1);
    }

    fn pop(&mut self, search: &SearchSession<ScoreState>) -> Option<PointId> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let front = self.heap.pop();
        self.sift_down(search, 0);
        front
    }

    /// Restore heap order after the node `id` got a better score.
    fn improve(&mut self, search: &SearchSession<ScoreState>, id: PointId) {
        if let Some(index) = self.heap.iter().position(|&open| open == id) {
            self.sift_up(search, index);
        }
    }

    fn sift_up(&mut self, search: &SearchSession<ScoreState>, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !is_worse(search, self.heap[parent], self.heap[index]) {
                break;
            }
            self.heap.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, search: &SearchSession<ScoreState>, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;
            if left < len && is_worse(search, self.heap[best], self.heap[left]) {
                best = left;
            }
            if right < len && is_worse(search, self.heap[best], self.heap[right]) {
                best = right;
            }
            if best == index {
                break;
            }
            self.heap.swap(index, best);
            index = best;
        }
    }
}

// =============================================================================
// STRATEGY
// =============================================================================

/// A* search strategy. Keeps its open list allocated between queries.
#[derive(Debug, Clone, Default)]
pub struct AStar {
    open: OpenList,
}

impl SolveStrategy for AStar {
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
        }
        self.open.reset();
        self.open.push(search, begin);

        while let Some(current) = self.open.front() {
            search.consider_closest(current);
            if current == end {
                return true;
            }

            self.open.pop(search);
            let Some(current_point) = search.ensure_node(graph, current) else {
                continue;
            };
            let current_g = match search.node_mut(current) {
                Some(node) => {
                    node.state.closed_pass = pass;
                    node.state.g_score
                }
                None => continue,
            };

            for neighbor in current_point.neighbors() {
                let Some(neighbor_point) = search.ensure_node(graph, neighbor) else {
                    continue;
                };
                let scores = search.scores(neighbor);
                if !cost.is_point_enabled(neighbor_point) || scores.is_closed(pass) {
                    continue;
                }

                let tentative_g = current_g
                    + cost.compute_cost(current_point, neighbor_point)
                        * neighbor_point.weight_scale();
                let is_new = !scores.is_open(pass);
                if !is_new && tentative_g >= scores.g_score {
                    continue;
                }

                let heuristic = cost.estimate_cost(neighbor_point, end_point);
                if let Some(node) = search.node_mut(neighbor) {
                    node.set_prev(Some(current));
                    node.state.g_score = tentative_g;
                    node.state.abs_f_score = heuristic;
                    node.state.f_score = tentative_g + heuristic * heuristic_scale;
                    node.state.open_pass = pass;
                }

                if is_new {
                    self.open.push(search, neighbor);
                } else {
                    self.open.improve(search, neighbor);
                }
            }
        }

        false
    }
}

// =============================================================================
// TESTS
// =============================================================================
