//! # Pointpath
//!
//! The main binary for the Pointpath deterministic point map.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │          apps/pointpath (THE BINARY)          │
//! │                                               │
//! │   ┌─────────────┐        ┌──────────────┐     │
//! │   │    CLI      │        │  Map loader  │     │
//! │   │   (clap)    │        │ (toml/ppth)  │     │
//! │   └──────┬──────┘        └──────┬───────┘     │
//! │          └───────────┬──────────┘             │
//! │                      ▼                        │
//! │             ┌────────────────┐                │
//! │             │ pointpath-core │                │
//! │             │  (THE LOGIC)   │                │
//! │             └────────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! pointpath --map world.toml status
//! pointpath --map world.toml path --from 1 --to 42 --solver fringe
//! pointpath --map world.toml closest -x 10 -y -3
//! pointpath --map world.toml export --output world.ppth
//! ```

use clap::Parser;
use pointpath::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // POINTPATH_LOG_FORMAT=json enables machine-parseable log output.
    let log_format = std::env::var("POINTPATH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pointpath=info,pointpath_core=warn".into());

    // Logs go to stderr so command output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
