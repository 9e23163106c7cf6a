//! # Pointpath CLI Module
//!
//! This module implements the CLI interface for Pointpath.
//!
//! ## Available Commands
//!
//! - `status` - Show map status
//! - `path` - Find the cheapest route between two points
//! - `closest` - Find the point nearest to a position
//! - `segment` - Project a position onto the nearest segment
//! - `export` - Write the loaded map as a binary snapshot

mod commands;

use crate::error::CliError;
use crate::map::load_graph;
use clap::{Parser, Subcommand, ValueEnum};
use pointpath_core::Fixed;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Pointpath - weighted point map queries
///
/// Loads a point map (TOML or binary snapshot) and answers routing and
/// proximity queries against it. All arithmetic is fixed-point, so every
/// answer is reproducible across machines.
#[derive(Parser, Debug)]
#[command(name = "pointpath")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the map (TOML description or .ppth snapshot)
    #[arg(short, long, global = true, default_value = "map.toml")]
    pub map: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Search algorithm used by `path`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// A* over a binary heap
    #[default]
    Astar,
    /// Fringe search over two flat lists
    Fringe,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show map status
    Status,

    /// Find the cheapest route between two points
    Path {
        /// Start point ID
        #[arg(short, long)]
        from: u64,

        /// Destination point ID
        #[arg(short, long)]
        to: u64,

        /// Search algorithm
        #[arg(short, long, value_enum, default_value_t = SolverKind::Astar)]
        solver: SolverKind,

        /// Return the route to the closest reachable point if the destination can't be reached
        #[arg(short, long)]
        partial: bool,

        /// Print positions instead of point IDs
        #[arg(long)]
        positions: bool,
    },

    /// Find the point nearest to a position
    Closest {
        #[arg(short, long, allow_negative_numbers = true)]
        x: i32,

        #[arg(short, long, allow_negative_numbers = true)]
        y: i32,

        /// Consider disabled points too
        #[arg(long)]
        include_disabled: bool,
    },

    /// Project a position onto the nearest enabled segment
    Segment {
        /// X coordinate (decimal)
        #[arg(short, long, allow_negative_numbers = true)]
        x: Fixed,

        /// Y coordinate (decimal)
        #[arg(short, long, allow_negative_numbers = true)]
        y: Fixed,
    },

    /// Export the loaded map as a binary snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), CliError> {
    let graph = load_graph(&cli.map)?;
    let json_mode = cli.json_mode;

    if cli.verbose && !cli.quiet {
        tracing::info!(
            map = %cli.map.display(),
            points = graph.point_count(),
            segments = graph.segment_count(),
            "map loaded"
        );
    }

    match cli.command {
        Some(Commands::Status) => cmd_status(&graph, &cli.map, json_mode),
        Some(Commands::Path {
            from,
            to,
            solver,
            partial,
            positions,
        }) => cmd_path(
            &graph,
            json_mode,
            cli.verbose,
            PathRequest {
                from,
                to,
                solver,
                partial,
                positions,
            },
        ),
        Some(Commands::Closest {
            x,
            y,
            include_disabled,
        }) => cmd_closest(&graph, json_mode, x, y, include_disabled),
        Some(Commands::Segment { x, y }) => cmd_segment(&graph, json_mode, x, y),
        Some(Commands::Export { output }) => cmd_export(&graph, &output, cli.quiet),
        None => {
            // No subcommand - show status by default
            cmd_status(&graph, &cli.map, json_mode)
        }
    }
}
