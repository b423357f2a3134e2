//! Floor Plan Core Library
//!
//! Planar wall topology for floor-plan editing: nodes, segments and walls
//! in an id-keyed graph, automatic splitting at crossings, spatial
//! selection queries and proximity merge detection.
//!
//! [`FloorPlan`] is the usual entry point. The services it wraps are public
//! for hosts that want to drive the graph themselves.

pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod graph;
pub mod intersection;
pub mod plan;
pub mod proximity;
pub mod query;

pub use config::{EngineConfig, ProximityConfig};
pub use error::{TopologyError, TopologyResult};
pub use events::{EngineEvent, EventBus, EventListener, MergeEvent, TopologyEvent};
pub use graph::{
    GraphStats, MergeId, Node, NodeId, NodeKind, Segment, SegmentId, Wall, WallGraph, WallId,
    WallType, WallUpdate,
};
pub use intersection::{IntersectionResolver, ResolveReport};
pub use plan::{DrawOutcome, FloorPlan};
pub use proximity::{Instant, MergeType, ProximityMerge, ProximityMergeDetector};
pub use query::{DeletionImpact, SpatialQueryService, WallInfo};
