//! # Search Session
//!
//! The algorithm-agnostic half of a solver: a cache of per-point search
//! nodes that survives across queries, the pass counter that tells stale
//! node state apart from the current query, and the public path API.
//!
//! ## Incremental state
//!
//! Nodes are never reset between queries. Each query takes a new pass
//! number and algorithms compare a node's `open_pass` / `closed_pass`
//! against it, so a node touched by an earlier query reads as unseen.
//!
//! ## Invalidation
//!
//! A session holds a [`GraphSubscription`] instead of a reference to the
//! graph. Before each query it drains the graph's events: a removed point
//! evicts its node and a storage invalidation drops the whole cache. Nodes
//! keep generation-checked [`PointHandle`]s, so even an event that was
//! missed can't make a node resolve to the wrong point.

use crate::cost::{CostModel, EuclideanCost};
use crate::events::{GraphEvent, GraphSubscription};
use crate::fixed::Fixed;
use crate::geometry::IVec2;
use crate::graph::{Graph, Point};
use crate::primitives::FIRST_PASS;
use crate::types::{PathError, PointHandle, PointId};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

// =============================================================================
// SEARCH NODES
// =============================================================================

/// Cached search state for one graph point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchNode<V> {
    point: PointHandle,
    prev: Option<PointId>,
    /// Algorithm-owned scoring state.
    pub state: V,
}

impl<V: Default> SearchNode<V> {
    fn new(point: PointHandle) -> Self {
        Self {
            point,
            prev: None,
            state: V::default(),
        }
    }
}

impl<V> SearchNode<V> {
    /// Handle of the graph point this node was created for.
    #[must_use]
    pub fn point(&self) -> PointHandle {
        self.point
    }

    /// Previous point on the route found by the current query.
    #[must_use]
    pub fn prev(&self) -> Option<PointId> {
        self.prev
    }

    pub fn set_prev(&mut self, prev: Option<PointId>) {
        self.prev = prev;
    }
}

/// Scoring state shared by the A* and Fringe strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreState {
    /// Cost of the best known route from the origin.
    pub g_score: Fixed,
    /// `g_score` plus the scaled estimate to the target.
    pub f_score: Fixed,
    /// Heuristic-only distance to the target, used to pick the partial-path
    /// fallback.
    pub abs_f_score: Fixed,
    /// Pass in which this node was last opened.
    pub open_pass: u64,
    /// Pass in which this node was last expanded.
    pub closed_pass: u64,
}

impl ScoreState {
    #[must_use]
    pub fn is_open(&self, pass: u64) -> bool {
        self.open_pass == pass
    }

    #[must_use]
    pub fn is_closed(&self, pass: u64) -> bool {
        self.closed_pass == pass
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Per-solver cache of search nodes, keyed by point id.
#[derive(Debug, Clone)]
pub struct SearchSession<V> {
    nodes: BTreeMap<PointId, SearchNode<V>>,
    subscription: Option<GraphSubscription>,
    current_pass: u64,
    closest: Option<PointId>,
}

impl<V: Default> SearchSession<V> {
    /// Create a session bound to `graph`.
    #[must_use]
    pub fn new(graph: &Graph) -> Self {
        Self {
            nodes: BTreeMap::new(),
            subscription: Some(graph.subscribe()),
            current_pass: FIRST_PASS,
            closest: None,
        }
    }

    /// Bind to `graph`, dropping every cached node.
    pub fn bind(&mut self, graph: &Graph) {
        self.clear();
        self.subscription = Some(graph.subscribe());
    }

    /// Stop observing the bound graph. Queries fail until [`SearchSession::bind`].
    pub fn detach(&mut self) {
        self.clear();
        self.subscription = None;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|subscription| !subscription.is_graph_destroyed())
    }

    /// Check that `graph` is the bound graph and apply its pending events.
    pub fn sync(&mut self, graph: &Graph) -> Result<(), PathError> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Err(PathError::Detached);
        };
        if subscription.is_graph_destroyed() {
            tracing::debug!(
                graph = subscription.graph_id(),
                "bound graph was destroyed, detaching search session"
            );
            self.detach();
            return Err(PathError::GraphDestroyed);
        }

        let events = subscription
            .poll(graph)
            .map_err(|_| PathError::ForeignGraph)?;
        for event in events {
            match event {
                GraphEvent::PointRemoved(id) => self.evict(id),
                GraphEvent::StorageInvalidated => {
                    tracing::debug!(
                        nodes = self.nodes.len(),
                        "graph storage invalidated, resetting search session"
                    );
                    self.clear();
                }
            }
        }
        Ok(())
    }

    fn evict(&mut self, id: PointId) {
        self.nodes.remove(&id);
        if self.closest == Some(id) {
            self.closest = None;
        }
    }

    /// Take the pass number for a new query.
    ///
    /// When the counter would overflow, the cache is dropped and numbering
    /// restarts, so no node can carry a pass from before the wrap.
    pub fn next_pass(&mut self) -> u64 {
        let pass = self.current_pass;
        match pass.checked_add(1) {
            Some(next) => {
                self.current_pass = next;
                pass
            }
            None => {
                tracing::debug!("search pass counter exhausted, resetting search session");
                self.clear();
                self.current_pass = FIRST_PASS + 1;
                FIRST_PASS
            }
        }
    }

    /// Get the graph point for `id`, creating its node on first use.
    ///
    /// A node whose handle went stale is recreated from scratch.
    pub fn ensure_node<'g>(&mut self, graph: &'g Graph, id: PointId) -> Option<&'g Point> {
        let handle = graph.handle(id)?;
        let point = graph.resolve(handle)?;
        match self.nodes.entry(id) {
            Entry::Occupied(mut entry) => {
                if entry.get().point != handle {
                    entry.insert(SearchNode::new(handle));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(SearchNode::new(handle));
            }
        }
        Some(point)
    }

    /// Drop every cached node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.closest = None;
    }

    /// Apply pending graph events, then drop every cached node.
    pub fn reset_search(&mut self, graph: &Graph) -> Result<(), PathError> {
        self.sync(graph)?;
        self.clear();
        Ok(())
    }
}

impl<V> SearchSession<V> {
    #[must_use]
    pub fn node(&self, id: PointId) -> Option<&SearchNode<V>> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: PointId) -> Option<&mut SearchNode<V>> {
        self.nodes.get_mut(&id)
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn search_count(&self) -> usize {
        self.nodes.len()
    }

    /// Pass number the next query will use.
    #[must_use]
    pub fn current_pass(&self) -> u64 {
        self.current_pass
    }

    /// Best fallback destination seen by the last query.
    #[must_use]
    pub fn closest(&self) -> Option<PointId> {
        self.closest
    }

    pub fn set_closest(&mut self, closest: Option<PointId>) {
        self.closest = closest;
    }

    /// Walk `prev` links back from `to` to `from` and return the route in
    /// travel order.
    ///
    /// A broken chain yields an empty route.
    #[must_use]
    pub fn build_path(&self, from: PointId, to: PointId) -> Vec<PointId> {
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            let Some(prev) = self.nodes.get(&current).and_then(SearchNode::prev) else {
                tracing::warn!(%from, %to, at = %current, "route has a broken previous link");
                return Vec::new();
            };
            if path.len() > self.nodes.len() {
                tracing::warn!(%from, %to, "route has a cycle in its previous links");
                return Vec::new();
            }
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }

    #[cfg(test)]
    pub(crate) fn set_current_pass(&mut self, pass: u64) {
        self.current_pass = pass;
    }
}

impl SearchSession<ScoreState> {
    /// Copy of a node's scores; unseen points read as default.
    #[must_use]
    pub fn scores(&self, id: PointId) -> ScoreState {
        self.nodes
            .get(&id)
            .map(|node| node.state)
            .unwrap_or_default()
    }

    /// Track `id` as the partial-path fallback if it is closer to the target
    /// than the current one, or equally close and cheaper to reach.
    pub fn consider_closest(&mut self, id: PointId) {
        let candidate = self.scores(id);
        let replace = match self.closest.and_then(|closest| self.nodes.get(&closest)) {
            None => true,
            Some(closest) => {
                closest.state.abs_f_score > candidate.abs_f_score
                    || (closest.state.abs_f_score >= candidate.abs_f_score
                        && closest.state.g_score > candidate.g_score)
            }
        };
        if replace {
            self.closest = Some(id);
        }
    }
}

// =============================================================================
// STRATEGIES
// =============================================================================

/// One path query as seen by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveQuery {
    pub begin: PointId,
    pub end: PointId,
    pub pass: u64,
    pub allow_partial: bool,
}

/// A search algorithm that runs on a [`SearchSession`].
///
/// `solve` is only called with distinct, existing endpoints whose nodes are
/// already in the session, and with an origin the cost model accepts. It
/// reports whether `end` was reached; the session's closest node is the
/// fallback otherwise.
pub trait SolveStrategy: Default {
    type State: Default;

    fn solve<C: CostModel>(
        &mut self,
        search: &mut SearchSession<Self::State>,
        graph: &Graph,
        cost: &C,
        query: SolveQuery,
    ) -> bool;
}

// =============================================================================
// SOLVER
// =============================================================================

/// A path solver: a strategy, its session and a cost model.
pub struct PathSearch<S: SolveStrategy, C = EuclideanCost> {
    session: SearchSession<S::State>,
    strategy: S,
    cost: C,
}

impl<S: SolveStrategy> PathSearch<S, EuclideanCost> {
    /// Create a solver bound to `graph` with straight-line costs.
    #[must_use]
    pub fn new(graph: &Graph) -> Self {
        Self::with_cost_model(graph, EuclideanCost)
    }
}

impl<S: SolveStrategy, C: CostModel> PathSearch<S, C> {
    /// Create a solver bound to `graph` with a custom cost model.
    #[must_use]
    pub fn with_cost_model(graph: &Graph, cost: C) -> Self {
        Self {
            session: SearchSession::new(graph),
            strategy: S::default(),
            cost,
        }
    }

    #[must_use]
    pub fn cost_model(&self) -> &C {
        &self.cost
    }

    pub fn cost_model_mut(&mut self) -> &mut C {
        &mut self.cost
    }

    #[must_use]
    pub fn session(&self) -> &SearchSession<S::State> {
        &self.session
    }

    pub fn bind(&mut self, graph: &Graph) {
        self.session.bind(graph);
    }

    pub fn detach(&mut self) {
        self.session.detach();
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.session.is_attached()
    }

    #[must_use]
    pub fn search_count(&self) -> usize {
        self.session.search_count()
    }

    #[must_use]
    pub fn current_pass(&self) -> u64 {
        self.session.current_pass()
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    pub fn reset_search(&mut self, graph: &Graph) -> Result<(), PathError> {
        self.session.reset_search(graph)
    }

    /// Ids of the cheapest route from `from` to `to`.
    ///
    /// No route is `Ok(vec![])`. With `allow_partial`, a failed search
    /// returns the route to the point that came closest to `to` instead.
    pub fn try_get_id_path(
        &mut self,
        graph: &Graph,
        from: PointId,
        to: PointId,
        allow_partial: bool,
    ) -> Result<Vec<PointId>, PathError> {
        self.session.sync(graph)?;

        let Some(from_point) = graph.point(from) else {
            return Err(PathError::PointNotFound(from));
        };
        if !graph.has_point(to) {
            return Err(PathError::PointNotFound(to));
        }
        if from == to {
            return Ok(vec![from]);
        }
        if !self.cost.is_point_enabled(from_point) {
            return Err(PathError::PointDisabled(from));
        }

        let pass = self.session.next_pass();
        self.session.ensure_node(graph, from);
        self.session.ensure_node(graph, to);
        self.session.set_closest(None);

        let query = SolveQuery {
            begin: from,
            end: to,
            pass,
            allow_partial,
        };
        let found = self
            .strategy
            .solve(&mut self.session, graph, &self.cost, query);
        tracing::trace!(%from, %to, pass, found, "solved path query");

        let end = if found {
            to
        } else {
            match (allow_partial, self.session.closest()) {
                (true, Some(closest)) => closest,
                _ => return Ok(Vec::new()),
            }
        };
        Ok(self.session.build_path(from, end))
    }

    /// Positions along the route returned by [`PathSearch::try_get_id_path`].
    pub fn try_get_point_path(
        &mut self,
        graph: &Graph,
        from: PointId,
        to: PointId,
        allow_partial: bool,
    ) -> Result<Vec<IVec2>, PathError> {
        let ids = self.try_get_id_path(graph, from, to, allow_partial)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| graph.point(id).map(Point::position))
            .collect())
    }

    /// Like [`PathSearch::try_get_id_path`], but errors are logged and
    /// reported as an empty route.
    pub fn get_id_path(
        &mut self,
        graph: &Graph,
        from: PointId,
        to: PointId,
        allow_partial: bool,
    ) -> Vec<PointId> {
        self.try_get_id_path(graph, from, to, allow_partial)
            .unwrap_or_else(|error| {
                tracing::warn!(%from, %to, %error, "can't get id path");
                Vec::new()
            })
    }

    /// Like [`PathSearch::try_get_point_path`], but errors are logged and
    /// reported as an empty route.
    pub fn get_point_path(
        &mut self,
        graph: &Graph,
        from: PointId,
        to: PointId,
        allow_partial: bool,
    ) -> Vec<IVec2> {
        self.try_get_point_path(graph, from, to, allow_partial)
            .unwrap_or_else(|error| {
                tracing::warn!(%from, %to, %error, "can't get point path");
                Vec::new()
            })
    }

    #[cfg(test)]
    pub(crate) fn session_mut(&mut self) -> &mut SearchSession<S::State> {
        &mut self.session
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> Graph {
        let mut graph = Graph::new();
        for n in 0..4u64 {
            graph
                .add_point(PointId(n), IVec2::new(n as i32, 0), Fixed::ONE, &[])
                .expect("add");
        }
        graph
    }

    #[test]
    fn pass_counter_is_monotonic() {
        let graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);

        assert_eq!(session.next_pass(), FIRST_PASS);
        assert_eq!(session.next_pass(), FIRST_PASS + 1);
        assert_eq!(session.current_pass(), FIRST_PASS + 2);
    }

    #[test]
    fn pass_counter_overflow_resets_session() {
        let graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        session.ensure_node(&graph, PointId(1));
        session.set_current_pass(u64::MAX);

        assert_eq!(session.next_pass(), FIRST_PASS);
        assert_eq!(session.search_count(), 0);
        assert_eq!(session.current_pass(), FIRST_PASS + 1);
    }

    #[test]
    fn ensure_node_recreates_stale_node() {
        let mut graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        session.ensure_node(&graph, PointId(2));
        if let Some(node) = session.node_mut(PointId(2)) {
            node.state.g_score = Fixed::from_int(9);
        }

        // Replace the point without letting the session see the event.
        graph.remove_point(PointId(2)).expect("remove");
        graph
            .add_point(PointId(2), IVec2::new(2, 0), Fixed::ONE, &[])
            .expect("add");
        session.ensure_node(&graph, PointId(2));

        assert_eq!(session.scores(PointId(2)).g_score, Fixed::ZERO);
    }

    #[test]
    fn sync_evicts_removed_points() {
        let mut graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        session.ensure_node(&graph, PointId(1));
        session.ensure_node(&graph, PointId(2));
        session.set_closest(Some(PointId(1)));

        graph.remove_point(PointId(1)).expect("remove");
        session.sync(&graph).expect("sync");

        assert!(session.node(PointId(1)).is_none());
        assert!(session.node(PointId(2)).is_some());
        assert_eq!(session.closest(), None);
    }

    #[test]
    fn sync_resets_on_storage_invalidation() {
        let mut graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        session.ensure_node(&graph, PointId(1));

        let capacity = graph.point_capacity();
        graph.reserve_space(capacity + 64).expect("reserve");
        session.sync(&graph).expect("sync");

        assert_eq!(session.search_count(), 0);
    }

    #[test]
    fn sync_rejects_other_graphs() {
        let graph = line_graph();
        let other = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);

        assert_eq!(session.sync(&other), Err(PathError::ForeignGraph));
    }

    #[test]
    fn detached_session_refuses_to_sync() {
        let graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        session.detach();

        assert!(!session.is_attached());
        assert_eq!(session.sync(&graph), Err(PathError::Detached));

        session.bind(&graph);
        assert!(session.sync(&graph).is_ok());
    }

    #[test]
    fn build_path_follows_prev_links() {
        let graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        for n in 0..4 {
            session.ensure_node(&graph, PointId(n));
        }
        for n in 1..4 {
            if let Some(node) = session.node_mut(PointId(n)) {
                node.set_prev(Some(PointId(n - 1)));
            }
        }

        assert_eq!(
            session.build_path(PointId(0), PointId(3)),
            vec![PointId(0), PointId(1), PointId(2), PointId(3)]
        );
        assert_eq!(session.build_path(PointId(2), PointId(2)), vec![PointId(2)]);
    }

    #[test]
    fn build_path_rejects_broken_chains() {
        let graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        session.ensure_node(&graph, PointId(0));
        session.ensure_node(&graph, PointId(3));

        assert!(session.build_path(PointId(0), PointId(3)).is_empty());
    }

    #[test]
    fn consider_closest_prefers_nearer_then_cheaper() {
        let graph = line_graph();
        let mut session: SearchSession<ScoreState> = SearchSession::new(&graph);
        let set = |session: &mut SearchSession<ScoreState>, id: u64, abs: i64, g: i64| {
            session.ensure_node(&graph, PointId(id));
            if let Some(node) = session.node_mut(PointId(id)) {
                node.state.abs_f_score = Fixed::from_int(abs);
                node.state.g_score = Fixed::from_int(g);
            }
        };
        set(&mut session, 0, 5, 0);
        set(&mut session, 1, 3, 4);
        set(&mut session, 2, 3, 2);
        set(&mut session, 3, 3, 7);

        for n in 0..4 {
            session.consider_closest(PointId(n));
        }
        assert_eq!(session.closest(), Some(PointId(2)));
    }
}
