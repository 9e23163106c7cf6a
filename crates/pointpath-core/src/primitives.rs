//! # Engine Constants
//!
//! Fixed runtime constants for the Pointpath engine. These are compiled into
//! the binary and are immutable at runtime.

use crate::fixed::Fixed;

/// Weight scale given to points when the caller has no better value.
pub const DEFAULT_WEIGHT_SCALE: Fixed = Fixed::ONE;

/// Number of graph events retained for subscribers.
///
/// A subscriber that falls further behind than this is told to do a full
/// reset instead of replaying individual events.
pub const JOURNAL_CAPACITY: usize = 1024;

/// First pass number handed out by a search session.
///
/// Zero is never a valid pass, so freshly created search nodes are never
/// mistaken for open or closed ones.
pub const FIRST_PASS: u64 = 1;

/// Initial allocation for open lists and fringes.
pub const OPEN_LIST_RESERVE: usize = 20;

/// Magic bytes for the Pointpath snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"PPTH";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;
