//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::SolverKind;
use crate::error::CliError;
use pointpath_core::{
    AStarSolver, FVec2, Fixed, FringeSolver, Graph, IVec2, PointId, cost::euclidean,
    graph_to_bytes,
};
use std::path::{Path, PathBuf};

/// Validate output path.
///
/// The parent directory must exist; the returned path has a canonical parent.
fn validate_output_path(path: &Path) -> Result<PathBuf, CliError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CliError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CliError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CliError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show map status.
pub fn cmd_status(graph: &Graph, map_path: &Path, json_mode: bool) -> Result<(), CliError> {
    let disabled = graph.points().filter(|point| !point.is_enabled()).count();

    if json_mode {
        let output = serde_json::json!({
            "map": map_path.to_string_lossy(),
            "point_count": graph.point_count(),
            "disabled_count": disabled,
            "segment_count": graph.segment_count(),
            "point_capacity": graph.point_capacity(),
            "next_available_id": graph.available_point_id().0
        });
        print_json(&output);
        return Ok(());
    }

    println!("Pointpath Map Status");
    println!("====================");
    println!("Map: {:?}", map_path);
    println!();
    println!("Points:          {}", graph.point_count());
    println!("Disabled Points: {}", disabled);
    println!("Segments:        {}", graph.segment_count());
    println!("Capacity:        {}", graph.point_capacity());
    println!("Next Free ID:    {}", graph.available_point_id());

    Ok(())
}

// =============================================================================
// PATH COMMAND
// =============================================================================

/// Arguments of the `path` command.
#[derive(Debug, Clone, Copy)]
pub struct PathRequest {
    pub from: u64,
    pub to: u64,
    pub solver: SolverKind,
    pub partial: bool,
    pub positions: bool,
}

/// A route found by [`find_route`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    pub ids: Vec<PointId>,
    /// Points the solver has search state for after the query.
    pub searched: usize,
}

impl RouteReport {
    /// The route did not end at the requested destination.
    pub fn is_partial(&self, to: PointId) -> bool {
        self.ids.last().is_some_and(|last| *last != to)
    }
}

/// Run a single path query with a fresh solver.
pub fn find_route(
    graph: &Graph,
    from: PointId,
    to: PointId,
    solver: SolverKind,
    partial: bool,
) -> Result<RouteReport, CliError> {
    let report = match solver {
        SolverKind::Astar => {
            let mut search = AStarSolver::new(graph);
            let ids = search.try_get_id_path(graph, from, to, partial)?;
            RouteReport {
                ids,
                searched: search.search_count(),
            }
        }
        SolverKind::Fringe => {
            let mut search = FringeSolver::new(graph);
            let ids = search.try_get_id_path(graph, from, to, partial)?;
            RouteReport {
                ids,
                searched: search.search_count(),
            }
        }
    };
    Ok(report)
}

/// Total cost of walking `route`, using the default Euclidean cost model.
pub fn route_cost(graph: &Graph, route: &[PointId]) -> Fixed {
    route
        .windows(2)
        .filter_map(|pair| Some((graph.point(pair[0])?, graph.point(pair[1])?)))
        .fold(Fixed::ZERO, |total, (from, to)| {
            total + euclidean(from, to) * to.weight_scale()
        })
}

fn route_positions(graph: &Graph, route: &[PointId]) -> Vec<IVec2> {
    route
        .iter()
        .filter_map(|id| graph.point_position(*id))
        .collect()
}

/// Find a route between two points.
pub fn cmd_path(
    graph: &Graph,
    json_mode: bool,
    verbose: bool,
    request: PathRequest,
) -> Result<(), CliError> {
    let from = PointId(request.from);
    let to = PointId(request.to);
    let report = find_route(graph, from, to, request.solver, request.partial)?;
    let cost = route_cost(graph, &report.ids);
    let partial = report.is_partial(to);

    if json_mode {
        let route = if request.positions {
            serde_json::json!(
                route_positions(graph, &report.ids)
                    .iter()
                    .map(|p| serde_json::json!({ "x": p.x, "y": p.y }))
                    .collect::<Vec<_>>()
            )
        } else {
            serde_json::json!(report.ids.iter().map(|id| id.0).collect::<Vec<_>>())
        };
        let output = serde_json::json!({
            "from": request.from,
            "to": request.to,
            "solver": format!("{:?}", request.solver).to_lowercase(),
            "found": !report.ids.is_empty(),
            "partial": partial,
            "cost": cost.to_string(),
            "searched": report.searched,
            "route": route
        });
        print_json(&output);
        return Ok(());
    }

    if report.ids.is_empty() {
        println!("No route from {} to {}", from, to);
        return Ok(());
    }

    if partial {
        println!(
            "No complete route; closest reachable point is {}",
            report.ids.last().copied().unwrap_or(from)
        );
    }
    if request.positions {
        let steps: Vec<String> = route_positions(graph, &report.ids)
            .iter()
            .map(|p| format!("({}, {})", p.x, p.y))
            .collect();
        println!("Route: {}", steps.join(" -> "));
    } else {
        let steps: Vec<String> = report.ids.iter().map(ToString::to_string).collect();
        println!("Route: {}", steps.join(" -> "));
    }
    println!("Steps: {}", report.ids.len().saturating_sub(1));
    println!("Cost:  {}", cost);
    if verbose {
        println!("Searched points: {}", report.searched);
    }

    Ok(())
}

// =============================================================================
// CLOSEST COMMAND
// =============================================================================

/// Find the point nearest to a position.
pub fn cmd_closest(
    graph: &Graph,
    json_mode: bool,
    x: i32,
    y: i32,
    include_disabled: bool,
) -> Result<(), CliError> {
    let position = IVec2::new(x, y);
    let closest = graph.get_closest_point(position, include_disabled);

    if json_mode {
        let output = match closest.and_then(|id| graph.point(id)) {
            Some(point) => serde_json::json!({
                "found": true,
                "id": point.id().0,
                "x": point.position().x,
                "y": point.position().y,
                "distance_squared": position.distance_squared(point.position())
            }),
            None => serde_json::json!({ "found": false }),
        };
        print_json(&output);
        return Ok(());
    }

    match closest.and_then(|id| graph.point(id)) {
        Some(point) => println!(
            "Closest point: {} at ({}, {}), distance squared {}",
            point.id(),
            point.position().x,
            point.position().y,
            position.distance_squared(point.position())
        ),
        None => println!("No eligible point"),
    }

    Ok(())
}

// =============================================================================
// SEGMENT COMMAND
// =============================================================================

/// Project a position onto the nearest enabled segment.
pub fn cmd_segment(graph: &Graph, json_mode: bool, x: Fixed, y: Fixed) -> Result<(), CliError> {
    let projected = graph.get_closest_position_in_segment(FVec2::new(x, y));

    if json_mode {
        let output = match projected {
            Some(p) => serde_json::json!({
                "found": true,
                "x": p.x.to_string(),
                "y": p.y.to_string()
            }),
            None => serde_json::json!({ "found": false }),
        };
        print_json(&output);
        return Ok(());
    }

    match projected {
        Some(p) => println!("Closest segment position: ({}, {})", p.x, p.y),
        None => println!("No enabled segment"),
    }

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write `graph` as a binary snapshot.
pub fn export_snapshot(graph: &Graph, output: &Path) -> Result<PathBuf, CliError> {
    let output = validate_output_path(output)?;
    let bytes = graph_to_bytes(graph)?;
    std::fs::write(&output, &bytes)?;
    tracing::info!(path = %output.display(), bytes = bytes.len(), "snapshot written");
    Ok(output)
}

/// Export the loaded map.
pub fn cmd_export(graph: &Graph, output: &Path, quiet: bool) -> Result<(), CliError> {
    let written = export_snapshot(graph, output)?;
    if !quiet {
        println!(
            "Exported {} points and {} segments to {:?}",
            graph.point_count(),
            graph.segment_count(),
            written
        );
    }
    Ok(())
}
