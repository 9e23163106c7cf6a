//! # pointpath
//!
//! Command-line front end for `pointpath-core`: map loading, argument
//! parsing and command output. The binary in `main.rs` only installs
//! logging and dispatches to [`cli::execute`].

pub mod cli;
pub mod error;
pub mod map;

pub use error::CliError;
