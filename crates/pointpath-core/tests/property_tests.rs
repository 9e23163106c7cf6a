//! # Property-Based Tests
//!
//! Randomized checks of solver correctness and graph invariants.
//!
//! Ground truth comes from Floyd-Warshall over the same edge set and the
//! same fixed-point edge costs the solvers use.

use pointpath_core::cost::euclidean;
use pointpath_core::{
    AStarSolver, Fixed, FringeSolver, Graph, IVec2, PointId, graph_from_bytes, graph_to_bytes,
};
use proptest::collection::vec;
use proptest::prelude::*;

const N: usize = 12;

/// Points `0..HALF` and `HALF..N` form separate islands in island scenarios.
const HALF: usize = N / 2;

/// Raw value of a weight scale of one.
const ONE_RAW: i64 = 65_536;

/// Raw fixed-point slack for truncated square roots in the heuristic.
const TOLERANCE: i64 = 64;

// =============================================================================
// SCENARIOS
// =============================================================================

#[derive(Debug, Clone)]
struct Op {
    u: usize,
    v: usize,
    kind: u8,
    bidirectional: bool,
    position: (i32, i32),
}

#[derive(Debug, Clone)]
struct Scenario {
    points: Vec<(i32, i32, i64, bool)>,
    ops: Vec<Op>,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (0..N, 0..N - 1, 0u8..9, any::<bool>(), (0i32..100, 0i32..100)).prop_map(
        |(u, v, kind, bidirectional, position)| Op {
            u,
            v: if u == v { N - 1 } else { v },
            kind,
            bidirectional,
            position,
        },
    )
}

/// Raw weight scales, half of them below one (zero included).
fn weight_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![0i64..ONE_RAW, ONE_RAW..=3 * ONE_RAW]
}

/// Like `scenario_strategy`, but every operation stays within one island.
fn island_scenario_strategy() -> impl Strategy<Value = Scenario> {
    scenario_strategy().prop_map(|mut scenario| {
        for op in &mut scenario.ops {
            let base = op.u / HALF * HALF;
            op.v = base + op.v % HALF;
            if op.v == op.u {
                op.v = base + (op.u - base + 1) % HALF;
            }
        }
        scenario
    })
}

fn scenario_strategy() -> impl Strategy<Value = Scenario> {
    (
        vec(
            (0i32..100, 0i32..100, weight_strategy(), prop::bool::weighted(0.1)),
            N,
        ),
        vec(op_strategy(), 0..150),
    )
        .prop_map(|(points, ops)| Scenario { points, ops })
}

/// A graph built from a scenario plus the directed adjacency it should have.
struct Built {
    graph: Graph,
    adjacent: [[bool; N]; N],
}

fn pid(n: usize) -> PointId {
    PointId(n as u64)
}

fn build(scenario: &Scenario) -> Built {
    let mut graph = Graph::new();
    let mut adjacent = [[false; N]; N];

    for (n, &(x, y, weight, disabled)) in scenario.points.iter().enumerate() {
        graph
            .add_point(pid(n), IVec2::new(x, y), Fixed::from_raw(weight), &[])
            .expect("add");
        graph.set_point_disabled(pid(n), disabled).expect("disable");
    }

    for op in &scenario.ops {
        let (u, v) = (op.u, op.v);
        match op.kind {
            0..=5 => {
                graph
                    .connect_points(pid(u), pid(v), op.bidirectional)
                    .expect("connect");
                adjacent[u][v] = true;
                if op.bidirectional {
                    adjacent[v][u] = true;
                }
            }
            6 | 7 => {
                graph
                    .disconnect_points(pid(u), pid(v), op.bidirectional)
                    .expect("disconnect");
                adjacent[u][v] = false;
                if op.bidirectional {
                    adjacent[v][u] = false;
                }
            }
            _ => {
                graph.remove_point(pid(u)).expect("remove");
                let (x, y) = op.position;
                graph
                    .add_point(pid(u), IVec2::new(x, y), Fixed::ONE, &[])
                    .expect("add");
                for w in 0..N {
                    adjacent[u][w] = false;
                    adjacent[w][u] = false;
                }
            }
        }
    }

    Built { graph, adjacent }
}

fn edge_cost(graph: &Graph, from: usize, to: usize) -> Fixed {
    let a = graph.point(pid(from)).expect("from");
    let b = graph.point(pid(to)).expect("to");
    euclidean(a, b) * b.weight_scale()
}

/// All-pairs cheapest costs; `None` is unreachable.
fn floyd_warshall(built: &Built) -> Vec<Vec<Option<Fixed>>> {
    let graph = &built.graph;
    let enabled: Vec<bool> = (0..N).map(|n| !graph.is_point_disabled(pid(n))).collect();
    let mut dist = vec![vec![None; N]; N];
    for u in 0..N {
        dist[u][u] = Some(Fixed::ZERO);
        for v in 0..N {
            if u != v && built.adjacent[u][v] && enabled[v] {
                dist[u][v] = Some(edge_cost(graph, u, v));
            }
        }
    }
    for w in 0..N {
        for u in 0..N {
            for v in 0..N {
                if let (Some(uw), Some(wv)) = (dist[u][w], dist[w][v]) {
                    let through = uw + wv;
                    if dist[u][v].is_none_or(|current| through < current) {
                        dist[u][v] = Some(through);
                    }
                }
            }
        }
    }
    dist
}

/// Cost of a returned route, checking every step is a real edge.
fn route_cost(built: &Built, route: &[PointId]) -> Result<Fixed, TestCaseError> {
    let mut total = Fixed::ZERO;
    for pair in route.windows(2) {
        let (a, b) = (pair[0].0 as usize, pair[1].0 as usize);
        prop_assert!(built.adjacent[a][b], "edge {} -> {} does not exist", a, b);
        total += edge_cost(&built.graph, a, b);
    }
    Ok(total)
}

fn assert_close(expected: Fixed, actual: Fixed) -> Result<(), TestCaseError> {
    prop_assert!(
        (expected.raw() - actual.raw()).abs() <= TOLERANCE,
        "expected cost {}, got {}",
        expected,
        actual
    );
    Ok(())
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Both solvers agree with Floyd-Warshall on every ordered pair.
    #[test]
    fn solvers_match_floyd_warshall(scenario in scenario_strategy()) {
        let built = build(&scenario);
        let dist = floyd_warshall(&built);
        let graph = &built.graph;
        let mut astar = AStarSolver::new(graph);
        let mut fringe = FringeSolver::new(graph);

        for u in 0..N {
            if graph.is_point_disabled(pid(u)) {
                continue;
            }
            for v in 0..N {
                if u == v {
                    continue;
                }
                let astar_route = astar.get_id_path(graph, pid(u), pid(v), false);
                let fringe_route = fringe.get_id_path(graph, pid(u), pid(v), false);

                match dist[u][v] {
                    None => {
                        prop_assert!(astar_route.is_empty(), "A* found {} -> {}", u, v);
                        prop_assert!(fringe_route.is_empty(), "Fringe found {} -> {}", u, v);
                    }
                    Some(expected) => {
                        for route in [&astar_route, &fringe_route] {
                            prop_assert_eq!(route.first(), Some(&pid(u)));
                            prop_assert_eq!(route.last(), Some(&pid(v)));
                            assert_close(expected, route_cost(&built, route)?)?;
                        }
                    }
                }
            }
        }
    }

    /// A* and Fringe report the same cost on grids with random weights.
    #[test]
    fn solvers_agree_on_weighted_grids(
        weights in vec(0i64..=5 * ONE_RAW, 36),
        from in 0usize..36,
        to in 0usize..36,
    ) {
        let mut graph = Graph::new();
        for n in 0..36u64 {
            let (x, y) = ((n % 6) as i32, (n / 6) as i32);
            let mut neighbors = Vec::new();
            if x > 0 {
                neighbors.push(PointId(n - 1));
            }
            if y > 0 {
                neighbors.push(PointId(n - 6));
            }
            graph
                .add_point(PointId(n), IVec2::new(x, y), Fixed::from_raw(weights[n as usize]), &neighbors)
                .expect("add");
        }

        let mut astar = AStarSolver::new(&graph);
        let mut fringe = FringeSolver::new(&graph);
        let a = astar.get_id_path(&graph, pid(from), pid(to), false);
        let f = fringe.get_id_path(&graph, pid(from), pid(to), false);

        let cost = |route: &[PointId]| {
            route.windows(2).fold(Fixed::ZERO, |total, pair| {
                let a = graph.point(pair[0]).expect("a");
                let b = graph.point(pair[1]).expect("b");
                total + euclidean(a, b) * b.weight_scale()
            })
        };
        prop_assert!(!a.is_empty());
        prop_assert!(!f.is_empty());
        assert_close(cost(&a), cost(&f))?;
    }

    /// Across islands, partial paths end at the reachable point closest to the
    /// target by straight-line distance, then by route cost, in both solvers.
    #[test]
    fn partial_paths_end_nearest_the_target(scenario in island_scenario_strategy()) {
        let built = build(&scenario);
        let dist = floyd_warshall(&built);
        let graph = &built.graph;
        let mut astar = AStarSolver::new(graph);
        let mut fringe = FringeSolver::new(graph);

        for u in 0..N {
            if graph.is_point_disabled(pid(u)) {
                continue;
            }
            let other_island = if u < HALF { HALF..N } else { 0..HALF };
            for v in other_island {
                let target = graph.point(pid(v)).expect("target");
                let estimate = |p: usize| euclidean(graph.point(pid(p)).expect("point"), target);

                let reachable: Vec<(Fixed, Fixed)> = (0..N)
                    .filter_map(|p| dist[u][p].map(|g| (estimate(p), g)))
                    .collect();
                let best = reachable.iter().copied().min().expect("origin is reachable");
                let tied = reachable.iter().filter(|&&key| key == best).count();

                let astar_route = astar.get_id_path(graph, pid(u), pid(v), true);
                let fringe_route = fringe.get_id_path(graph, pid(u), pid(v), true);

                for route in [&astar_route, &fringe_route] {
                    prop_assert_eq!(route.first(), Some(&pid(u)));
                    let end = route.last().map(|p| p.0 as usize);
                    prop_assert!(end.is_some_and(|end| end < N));
                    let end = end.unwrap_or(u);
                    prop_assert_eq!(estimate(end), best.0, "endpoint {} is not nearest to {}", end, v);
                    assert_close(best.1, route_cost(&built, route)?)?;
                }
                if tied == 1 {
                    prop_assert_eq!(astar_route.last(), fringe_route.last());
                }
            }
        }
    }

    /// Neighbor sets always mirror the segment set.
    #[test]
    fn neighbors_mirror_segments(scenario in scenario_strategy()) {
        let built = build(&scenario);
        let graph = &built.graph;

        for u in 0..N {
            let connections = graph.get_point_connections(pid(u));
            for v in 0..N {
                let expected = u != v && built.adjacent[u][v];
                prop_assert_eq!(graph.are_points_connected(pid(u), pid(v), false), expected);
                prop_assert_eq!(connections.contains(&pid(v)), expected);
            }
        }
        let edge_pairs = (0..N)
            .flat_map(|u| (u + 1..N).map(move |v| (u, v)))
            .filter(|&(u, v)| built.adjacent[u][v] || built.adjacent[v][u])
            .count();
        prop_assert_eq!(graph.segment_count(), edge_pairs);
    }

    /// Removing a point leaves no segment touching it.
    #[test]
    fn removal_clears_all_segments(scenario in scenario_strategy(), victim in 0usize..N) {
        let mut built = build(&scenario);
        built.graph.remove_point(pid(victim)).expect("remove");

        for segment in built.graph.segments() {
            prop_assert!(segment.low != pid(victim) && segment.high != pid(victim));
        }
        for point in built.graph.points() {
            prop_assert!(point.neighbors().all(|n| n != pid(victim)));
            prop_assert!(point.unlinked_neighbors().all(|n| n != pid(victim)));
        }
    }

    /// Closest point is the smallest id among the nearest points.
    #[test]
    fn closest_point_is_deterministic(
        positions in vec((-20i32..20, -20i32..20), 1..40),
        probe in (-25i32..25, -25i32..25),
    ) {
        let mut graph = Graph::new();
        for (n, &(x, y)) in positions.iter().enumerate() {
            graph.add_point(pid(n), IVec2::new(x, y), Fixed::ONE, &[]).expect("add");
        }
        let probe = IVec2::new(probe.0, probe.1);

        let expected = positions
            .iter()
            .enumerate()
            .map(|(n, &(x, y))| (probe.distance_squared(IVec2::new(x, y)), n))
            .min()
            .map(|(_, n)| pid(n));

        for _ in 0..3 {
            prop_assert_eq!(graph.get_closest_point(probe, false), expected);
        }
    }

    /// Snapshots preserve points and directed connectivity.
    #[test]
    fn snapshot_preserves_graph(scenario in scenario_strategy()) {
        let built = build(&scenario);
        let bytes = graph_to_bytes(&built.graph).expect("serialize");
        let restored = graph_from_bytes(&bytes).expect("deserialize");

        prop_assert_eq!(restored.get_point_ids(), built.graph.get_point_ids());
        for u in 0..N {
            prop_assert_eq!(restored.point(pid(u)), built.graph.point(pid(u)));
        }
        prop_assert_eq!(graph_to_bytes(&restored).expect("serialize"), bytes);
    }
}
