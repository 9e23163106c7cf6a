//! # Formats Module
//!
//! Binary snapshots of a [`Graph`](crate::Graph).
//!
//! Only the byte transformation lives here. Reading and writing files is
//! left to the application layer.

mod persistence;

pub use persistence::*;
