//! # Map Files
//!
//! Loading point maps from disk.
//!
//! Two formats are accepted:
//! - `*.ppth`: a binary snapshot written by `pointpath export`
//! - anything else: a TOML description
//!
//! ```toml
//! [[points]]
//! id = 1
//! x = 0
//! y = 0
//! weight_scale = "1.5"   # optional, integer or decimal string, default 1
//! disabled = false       # optional
//!
//! [[edges]]
//! from = 1
//! to = 2
//! bidirectional = true   # optional, default true
//! ```

use crate::error::CliError;
use pointpath_core::{Fixed, Graph, IVec2, PointId, graph_from_bytes};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a TOML map (16 MB).
pub const MAX_MAP_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum size of a binary snapshot (256 MB).
pub const MAX_SNAPSHOT_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// File extension of binary snapshots.
pub const SNAPSHOT_EXTENSION: &str = "ppth";

// =============================================================================
// MAP SCHEMA
// =============================================================================

/// A point map as written in TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapFile {
    #[serde(default)]
    pub points: Vec<MapPoint>,
    #[serde(default)]
    pub edges: Vec<MapEdge>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapPoint {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub weight_scale: Option<WeightValue>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapEdge {
    pub from: u64,
    pub to: u64,
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
}

fn default_bidirectional() -> bool {
    true
}

/// A weight scale written either as an integer or as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WeightValue {
    Integer(i64),
    Decimal(String),
}

impl WeightValue {
    /// Convert to a fixed-point weight scale.
    pub fn to_fixed(&self) -> Result<Fixed, CliError> {
        match self {
            Self::Integer(value) => Ok(Fixed::from_int(*value)),
            Self::Decimal(text) => text
                .parse()
                .map_err(|e| CliError::InvalidArgument(format!("weight_scale: {}", e))),
        }
    }
}

impl MapFile {
    /// Parse a TOML map description.
    pub fn parse(text: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(text)?)
    }

    /// Build a graph from this map.
    ///
    /// Unlike `Graph::add_point`, a repeated point id is an error here:
    /// a map lists every point exactly once.
    pub fn to_graph(&self) -> Result<Graph, CliError> {
        let mut graph = Graph::new();

        for point in &self.points {
            let weight_scale = match &point.weight_scale {
                Some(value) => value.to_fixed()?,
                None => Fixed::ONE,
            };
            let id = PointId(point.id);
            if !graph.try_add_point(id, IVec2::new(point.x, point.y), weight_scale, &[])? {
                return Err(CliError::InvalidArgument(format!(
                    "Point id {} appears more than once",
                    id
                )));
            }
            if point.disabled {
                graph.set_point_disabled(id, true)?;
            }
        }

        for edge in &self.edges {
            graph.connect_points(PointId(edge.from), PointId(edge.to), edge.bidirectional)?;
        }

        tracing::debug!(
            points = graph.point_count(),
            segments = graph.segment_count(),
            "built graph from map"
        );
        Ok(graph)
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Validate file size before reading.
pub fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CliError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CliError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CliError::InvalidArgument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it names a regular file.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, CliError> {
    let canonical = path.canonicalize().map_err(|e| {
        CliError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CliError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Whether `path` names a binary snapshot rather than a TOML map.
pub fn is_snapshot_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SNAPSHOT_EXTENSION))
}

/// Load a graph from a TOML map or a binary snapshot.
pub fn load_graph(path: &Path) -> Result<Graph, CliError> {
    let path = validate_file_path(path)?;

    if is_snapshot_path(&path) {
        validate_file_size(&path, MAX_SNAPSHOT_FILE_SIZE)?;
        let bytes = std::fs::read(&path)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "loading snapshot");
        return Ok(graph_from_bytes(&bytes)?);
    }

    validate_file_size(&path, MAX_MAP_FILE_SIZE)?;
    let text = std::fs::read_to_string(&path)?;
    tracing::info!(path = %path.display(), "loading map");
    MapFile::parse(&text)?.to_graph()
}

// =============================================================================
// TESTS
// =============================================================================
