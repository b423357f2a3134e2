//! Graph nodes.

use super::{NodeId, SegmentId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role of a node in the wall graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// A wall endpoint or chain vertex.
    #[default]
    Endpoint,
    /// A junction of three or more segment ends, or a resolved crossing.
    Intersection,
}

/// A 2D point where segments meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) connected_segments: BTreeSet<SegmentId>,
    pub(crate) kind: NodeKind,
    /// Set when the node was inserted by a crossing split; such nodes keep
    /// the intersection flag regardless of degree.
    pub(crate) from_crossing: bool,
}

impl Node {
    pub(crate) fn new(x: f64, y: f64) -> Self {
        Self {
            id: NodeId::new(),
            x,
            y,
            connected_segments: BTreeSet::new(),
            kind: NodeKind::Endpoint,
            from_crossing: false,
        }
    }

    pub(crate) fn crossing(x: f64, y: f64) -> Self {
        Self {
            kind: NodeKind::Intersection,
            from_crossing: true,
            ..Self::new(x, y)
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Position as a kurbo point.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_intersection(&self) -> bool {
        self.kind == NodeKind::Intersection
    }

    /// Whether the node was created by splitting a crossing.
    pub fn is_crossing(&self) -> bool {
        self.from_crossing
    }

    /// Segments attached to this node.
    pub fn connected_segments(&self) -> &BTreeSet<SegmentId> {
        &self.connected_segments
    }

    /// Number of attached segment ends.
    pub fn degree(&self) -> usize {
        self.connected_segments.len()
    }

    /// A node with no attached segments.
    pub fn is_orphaned(&self) -> bool {
        self.connected_segments.is_empty()
    }

    /// The kind this node should carry given its current attachments.
    pub(crate) fn expected_kind(&self) -> NodeKind {
        if self.from_crossing || self.connected_segments.len() >= 3 {
            NodeKind::Intersection
        } else {
            NodeKind::Endpoint
        }
    }

    pub(crate) fn attach(&mut self, segment: SegmentId) {
        self.connected_segments.insert(segment);
        self.kind = self.expected_kind();
    }

    pub(crate) fn detach(&mut self, segment: SegmentId) {
        self.connected_segments.remove(&segment);
        self.kind = self.expected_kind();
    }
}
