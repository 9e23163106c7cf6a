//! # Snapshot Format
//!
//! Format: Header (5 bytes) + postcard-serialized graph data.
//! - 4 bytes: Magic ("PPTH")
//! - 1 byte: Version
//!
//! The payload lists points and segments in ascending id order, so saving the
//! same graph twice produces identical bytes. Loading replays the payload
//! through the regular graph mutators; a snapshot that would break a graph
//! invariant is rejected instead of being loaded half-way.

use crate::fixed::Fixed;
use crate::geometry::IVec2;
use crate::graph::{Direction, Graph, Segment};
use crate::primitives;
use crate::types::{GraphError, PointId};
use serde::{Deserialize, Serialize};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted snapshot size.
///
/// Checked before any payload is decoded.
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all graph data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a new header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(GraphError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(GraphError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [a, b, c, d] = self.magic;
        [a, b, c, d, self.version]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        match bytes {
            [a, b, c, d, version, ..] => Ok(Self {
                magic: [*a, *b, *c, *d],
                version: *version,
            }),
            _ => Err(GraphError::SerializationError(
                "Header too short".to_string(),
            )),
        }
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Serialized form of one point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializablePoint {
    pub id: PointId,
    pub position: IVec2,
    pub weight_scale: Fixed,
    pub enabled: bool,
}

/// Serialized form of a whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub points: Vec<SerializablePoint>,
    pub segments: Vec<Segment>,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            points: graph
                .points()
                .map(|point| SerializablePoint {
                    id: point.id(),
                    position: point.position(),
                    weight_scale: point.weight_scale(),
                    enabled: point.is_enabled(),
                })
                .collect(),
            segments: graph.segments().collect(),
        }
    }
}

impl TryFrom<SerializableGraph> for Graph {
    type Error = GraphError;

    fn try_from(data: SerializableGraph) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        if data.points.len() > graph.point_capacity() {
            graph.reserve_space(data.points.len())?;
        }

        for point in &data.points {
            if !graph.try_add_point(point.id, point.position, point.weight_scale, &[])? {
                return Err(GraphError::SerializationError(format!(
                    "Duplicate point id {}",
                    point.id
                )));
            }
            if !point.enabled {
                graph.set_point_disabled(point.id, true)?;
            }
        }

        for segment in &data.segments {
            match segment.direction {
                Direction::None => {
                    return Err(GraphError::SerializationError(format!(
                        "Segment {}-{} has no direction",
                        segment.low, segment.high
                    )));
                }
                Direction::Forward => graph.connect_points(segment.low, segment.high, false)?,
                Direction::Backward => graph.connect_points(segment.high, segment.low, false)?,
                Direction::Bidirectional => {
                    graph.connect_points(segment.low, segment.high, true)?;
                }
            }
        }

        Ok(graph)
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a graph to bytes (header + payload).
pub fn graph_to_bytes(graph: &Graph) -> Result<Vec<u8>, GraphError> {
    let header = SnapshotHeader::new();
    let serializable = SerializableGraph::from(graph);

    let payload = postcard::to_stdvec(&serializable)
        .map_err(|e| GraphError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Deserialize a graph from bytes.
///
/// Size and header are validated before the payload is decoded.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<Graph, GraphError> {
    if bytes.len() < HEADER_SIZE {
        return Err(GraphError::SerializationError(format!(
            "Data too short: minimum {HEADER_SIZE} bytes required"
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(GraphError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    let serializable: SerializableGraph = postcard::from_bytes(payload).map_err(|e| {
        GraphError::SerializationError(format!("Failed to deserialize graph data: {}", e))
    })?;

    tracing::debug!(
        points = serializable.points.len(),
        segments = serializable.segments.len(),
        "decoded graph snapshot"
    );
    Graph::try_from(serializable)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> Graph {
        let mut graph = Graph::new();
        for n in 0..4u64 {
            graph
                .add_point(
                    PointId(n * 10),
                    IVec2::new(n as i32, -(n as i32)),
                    Fixed::from_int(n as i64 + 1),
                    &[],
                )
                .expect("add");
        }
        graph
            .connect_points(PointId(0), PointId(10), true)
            .expect("connect");
        graph
            .connect_points(PointId(20), PointId(10), false)
            .expect("connect");
        graph
            .connect_points(PointId(20), PointId(30), false)
            .expect("connect");
        graph.set_point_disabled(PointId(30), true).expect("disable");
        graph
    }

    #[test]
    fn header_roundtrip() {
        let header = SnapshotHeader::new();
        let restored = SnapshotHeader::from_bytes(&header.to_bytes()).expect("parse header");

        assert_eq!(restored, header);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn snapshot_is_bit_exact() {
        let graph = sample_graph();

        let first = graph_to_bytes(&graph).expect("first serialize");
        let restored = graph_from_bytes(&first).expect("deserialize");
        let second = graph_to_bytes(&restored).expect("second serialize");

        assert_eq!(first, second, "save -> load -> save must produce identical bytes");
    }

    #[test]
    fn snapshot_keeps_directions_and_flags() {
        let graph = sample_graph();
        let restored = graph_from_bytes(&graph_to_bytes(&graph).expect("serialize"))
            .expect("deserialize");

        assert!(restored.are_points_connected(PointId(10), PointId(0), false));
        assert!(restored.are_points_connected(PointId(20), PointId(10), false));
        assert!(!restored.are_points_connected(PointId(10), PointId(20), false));
        assert!(restored.is_point_disabled(PointId(30)));
        assert_eq!(
            restored.point_weight_scale(PointId(20)),
            Some(Fixed::from_int(3))
        );
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");

        assert!(graph_from_bytes(&bytes).is_err());
    }

    #[test]
    fn short_data_rejected() {
        assert!(graph_from_bytes(b"PPT").is_err());
    }

    #[test]
    fn directionless_segment_rejected() {
        let mut data = SerializableGraph::from(&sample_graph());
        if let Some(segment) = data.segments.first_mut() {
            segment.direction = Direction::None;
        }

        assert!(Graph::try_from(data).is_err());
    }

    #[test]
    fn duplicate_points_rejected() {
        let mut data = SerializableGraph::from(&sample_graph());
        let first = data.points[0].clone();
        data.points.push(first);

        assert!(Graph::try_from(data).is_err());
    }
}
