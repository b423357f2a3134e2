//! Error types for the topology engine.

use crate::graph::{NodeId, SegmentId, WallId};
use thiserror::Error;

/// Errors reported by graph construction, resolution and configuration.
///
/// None of these are fatal to an editing session: a failed operation leaves
/// the graph exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Segment not found: {0}")]
    SegmentNotFound(SegmentId),
    #[error("Wall not found: {0}")]
    WallNotFound(WallId),
    #[error("Segment endpoints must be distinct nodes (got {0} twice)")]
    SelfLoop(NodeId),
    #[error("Segment length {0} is too short")]
    ZeroLength(f64),
    #[error("Node {0} still has {1} connected segment(s)")]
    NodeInUse(NodeId, usize),
    #[error("Cannot split segment {0} at one of its own endpoints")]
    SplitAtEndpoint(SegmentId),
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;
