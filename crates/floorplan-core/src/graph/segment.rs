//! Straight segments between two nodes.

use super::{NodeId, SegmentId, WallId};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A straight edge between two distinct nodes, owned by one wall.
///
/// Splitting replaces a segment with new ones instead of editing it.
/// `length` and `angle` are cached and refreshed whenever an endpoint node
/// moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub(crate) id: SegmentId,
    pub(crate) start_node: NodeId,
    pub(crate) end_node: NodeId,
    pub(crate) start: Point,
    pub(crate) end: Point,
    pub(crate) length: f64,
    pub(crate) angle: f64,
    /// `None` between creation and wall assignment, or after the owning
    /// wall was deleted without cleanup.
    pub(crate) wall_id: Option<WallId>,
}

impl Segment {
    pub(crate) fn new(
        start_node: NodeId,
        start: Point,
        end_node: NodeId,
        end: Point,
        wall_id: Option<WallId>,
    ) -> Self {
        let delta = end - start;
        Self {
            id: SegmentId::new(),
            start_node,
            end_node,
            start,
            end,
            length: delta.hypot(),
            angle: delta.y.atan2(delta.x),
            wall_id,
        }
    }

    /// Recompute cached geometry after an endpoint moved.
    pub(crate) fn refresh(&mut self, start: Point, end: Point) {
        let delta = end - start;
        self.start = start;
        self.end = end;
        self.length = delta.hypot();
        self.angle = delta.y.atan2(delta.x);
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn start_node_id(&self) -> NodeId {
        self.start_node
    }

    pub fn end_node_id(&self) -> NodeId {
        self.end_node
    }

    /// Position of the start node.
    pub fn start(&self) -> Point {
        self.start
    }

    /// Position of the end node.
    pub fn end(&self) -> Point {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Direction from start to end in radians, in `(-π, π]`.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn wall_id(&self) -> Option<WallId> {
        self.wall_id
    }

    pub fn has_node(&self, node: NodeId) -> bool {
        self.start_node == node || self.end_node == node
    }

    /// Both endpoint node ids.
    pub fn nodes(&self) -> [NodeId; 2] {
        [self.start_node, self.end_node]
    }

    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.start_node {
            Some(self.end_node)
        } else if node == self.end_node {
            Some(self.start_node)
        } else {
            None
        }
    }

    pub fn shares_node_with(&self, other: &Segment) -> bool {
        self.has_node(other.start_node) || self.has_node(other.end_node)
    }
}
