//! The wall graph: an arena of nodes, segments and walls keyed by id.
//!
//! Entities never hold references to each other, only ids, so the cyclic
//! node <-> segment relationship needs no shared ownership. Every mutation
//! validates first and then updates all back-references in the same call,
//! leaving the graph consistent whether it succeeds or fails.

mod ids;
mod node;
mod segment;
mod wall;

pub use ids::{MergeId, NodeId, SegmentId, WallId};
pub use node::{Node, NodeKind};
pub use segment::Segment;
pub use wall::{Wall, WallType, WallUpdate};

use crate::config::EngineConfig;
use crate::error::{TopologyError, TopologyResult};
use crate::events::TopologyEvent;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Entity counts, used for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub segments: usize,
    pub walls: usize,
    pub intersection_nodes: usize,
    pub orphaned_nodes: usize,
    pub unowned_segments: usize,
}

/// Owner of all nodes, segments and walls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallGraph {
    nodes: HashMap<NodeId, Node>,
    segments: HashMap<SegmentId, Segment>,
    walls: HashMap<WallId, Wall>,
    /// Wall creation order (oldest first).
    wall_order: Vec<WallId>,
    /// Segments shorter than this are rejected.
    min_segment_length: f64,
    /// Structural events not yet collected.
    #[serde(skip)]
    events: Vec<TopologyEvent>,
}

impl Default for WallGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WallGraph {
    /// Create an empty graph with default tolerances.
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            segments: HashMap::new(),
            walls: HashMap::new(),
            wall_order: Vec::new(),
            min_segment_length: config.min_segment_length,
            events: Vec::new(),
        }
    }

    // --- Nodes ---

    /// Create a free-standing node.
    pub fn create_node(&mut self, x: f64, y: f64) -> NodeId {
        self.insert_node(Node::new(x, y))
    }

    /// Create a node inserted by a crossing split. It carries the
    /// intersection flag from the start.
    pub(crate) fn create_crossing_node(&mut self, point: Point) -> NodeId {
        self.insert_node(Node::crossing(point.x, point.y))
    }

    fn insert_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        self.events.push(TopologyEvent::NodeCreated(id));
        id
    }

    /// Remove a node. Only orphaned nodes can be removed.
    pub fn remove_node(&mut self, id: NodeId) -> TopologyResult<Node> {
        let node = self.nodes.get(&id).ok_or(TopologyError::NodeNotFound(id))?;
        if !node.is_orphaned() {
            return Err(TopologyError::NodeInUse(id, node.degree()));
        }
        let node = self.nodes.remove(&id).ok_or(TopologyError::NodeNotFound(id))?;
        self.events.push(TopologyEvent::NodeRemoved(id));
        Ok(node)
    }

    /// Move a node, dragging every attached segment along.
    ///
    /// Fails without moving anything if an attached segment would collapse.
    /// Crossings created by the move are not resolved here.
    pub fn move_node(&mut self, id: NodeId, to: Point) -> TopologyResult<()> {
        self.move_nodes(&HashMap::from([(id, to)]))
    }

    /// Translate every node touched by a wall's segments by `delta`.
    /// Walls sharing those nodes are stretched accordingly.
    pub fn translate_wall(&mut self, id: WallId, delta: Vec2) -> TopologyResult<()> {
        let wall = self.walls.get(&id).ok_or(TopologyError::WallNotFound(id))?;
        let mut targets = HashMap::new();
        for seg in wall.segment_ids.iter().filter_map(|s| self.segments.get(s)) {
            for node_id in seg.nodes() {
                if let Some(node) = self.nodes.get(&node_id) {
                    targets.insert(node_id, node.point() + delta);
                }
            }
        }
        self.move_nodes(&targets)
    }

    fn move_nodes(&mut self, targets: &HashMap<NodeId, Point>) -> TopologyResult<()> {
        let mut affected = BTreeSet::new();
        for (&node_id, to) in targets {
            let node = self
                .nodes
                .get(&node_id)
                .ok_or(TopologyError::NodeNotFound(node_id))?;
            if !(to.x.is_finite() && to.y.is_finite()) {
                return Err(TopologyError::Degenerate(format!(
                    "node {} cannot move to a non-finite position",
                    node_id
                )));
            }
            affected.extend(node.connected_segments.iter().copied());
        }

        let position = |node_id: NodeId, fallback: Point| -> Point {
            targets.get(&node_id).copied().unwrap_or(fallback)
        };
        let mut updates = Vec::with_capacity(affected.len());
        for seg_id in affected {
            let seg = self
                .segments
                .get(&seg_id)
                .ok_or(TopologyError::SegmentNotFound(seg_id))?;
            let start = position(seg.start_node, seg.start);
            let end = position(seg.end_node, seg.end);
            let length = start.distance(end);
            if length <= self.min_segment_length {
                return Err(TopologyError::ZeroLength(length));
            }
            updates.push((seg_id, start, end));
        }

        for (&node_id, to) in targets {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.x = to.x;
                node.y = to.y;
                self.events.push(TopologyEvent::NodeMoved(node_id));
            }
        }
        let mut touched_walls = BTreeSet::new();
        for (seg_id, start, end) in updates {
            if let Some(seg) = self.segments.get_mut(&seg_id) {
                seg.refresh(start, end);
                touched_walls.extend(seg.wall_id);
            }
        }
        for wall_id in touched_walls {
            self.touch_wall(wall_id);
        }
        Ok(())
    }

    /// The node nearest to `point` within `radius`, if any.
    pub fn find_node_near(&self, point: Point, radius: f64) -> Option<NodeId> {
        self.nodes
            .values()
            .map(|node| (node.id, node.point().distance(point)))
            .filter(|&(_, dist)| dist <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }

    // --- Segments ---

    /// Create an unowned segment between two existing, distinct nodes.
    ///
    /// Fails without touching the graph if either node is unknown, the nodes
    /// are the same, or the nodes are closer than the minimum length.
    pub fn create_segment(&mut self, start: NodeId, end: NodeId) -> TopologyResult<SegmentId> {
        self.insert_segment(start, end, None)
    }

    fn insert_segment(
        &mut self,
        start: NodeId,
        end: NodeId,
        wall_id: Option<WallId>,
    ) -> TopologyResult<SegmentId> {
        if start == end {
            return Err(TopologyError::SelfLoop(start));
        }
        let start_pt = self.node_point(start)?;
        let end_pt = self.node_point(end)?;
        let length = start_pt.distance(end_pt);
        if length <= self.min_segment_length {
            return Err(TopologyError::ZeroLength(length));
        }

        let segment = Segment::new(start, start_pt, end, end_pt, wall_id);
        let id = segment.id;
        self.segments.insert(id, segment);
        for node_id in [start, end] {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.attach(id);
            }
        }
        self.events.push(TopologyEvent::SegmentCreated(id));
        Ok(id)
    }

    /// Remove a segment, detaching it from its nodes and its wall. The nodes
    /// stay even if they become orphaned.
    pub fn remove_segment(&mut self, id: SegmentId) -> TopologyResult<Segment> {
        let segment = self
            .segments
            .remove(&id)
            .ok_or(TopologyError::SegmentNotFound(id))?;
        for node_id in segment.nodes() {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.detach(id);
            }
        }
        if let Some(wall) = segment.wall_id.and_then(|w| self.walls.get_mut(&w)) {
            if wall.remove_segment(id) {
                wall.touch();
                self.events.push(TopologyEvent::WallUpdated(wall.id));
            }
        }
        self.events.push(TopologyEvent::SegmentRemoved(id));
        Ok(segment)
    }

    /// Replace a segment by two segments meeting at `node`. Both halves
    /// inherit the original's wall and take its place in the wall's chain.
    pub fn split_segment(
        &mut self,
        id: SegmentId,
        node: NodeId,
    ) -> TopologyResult<(SegmentId, SegmentId)> {
        let segment = self
            .segments
            .get(&id)
            .ok_or(TopologyError::SegmentNotFound(id))?;
        if segment.has_node(node) {
            return Err(TopologyError::SplitAtEndpoint(id));
        }
        let split_pt = self.node_point(node)?;
        let first_len = segment.start.distance(split_pt);
        let second_len = split_pt.distance(segment.end);
        if first_len <= self.min_segment_length || second_len <= self.min_segment_length {
            return Err(TopologyError::ZeroLength(first_len.min(second_len)));
        }

        let (start, end, wall_id) = (segment.start_node, segment.end_node, segment.wall_id);

        // Detach the original without touching the wall chain; the halves
        // are spliced into its position below.
        if let Some(original) = self.segments.remove(&id) {
            for node_id in original.nodes() {
                if let Some(n) = self.nodes.get_mut(&node_id) {
                    n.detach(id);
                }
            }
        }
        self.events.push(TopologyEvent::SegmentRemoved(id));

        let first = self.insert_segment(start, node, wall_id)?;
        let second = self.insert_segment(node, end, wall_id)?;

        if let Some(wall) = wall_id.and_then(|w| self.walls.get_mut(&w)) {
            wall.replace_segment(id, &[first, second]);
            wall.touch();
            self.events.push(TopologyEvent::WallUpdated(wall.id));
        }
        log::debug!("Split segment {} into {} and {} at node {}", id, first, second, node);
        Ok((first, second))
    }

    // --- Walls ---

    /// Create a wall owning `segment_ids`.
    ///
    /// Segments already owned by another wall are moved to the new one.
    /// Fails without touching the graph if any segment is unknown.
    pub fn create_wall(
        &mut self,
        wall_type: WallType,
        segment_ids: &[SegmentId],
    ) -> TopologyResult<WallId> {
        self.check_segments(segment_ids)?;

        let mut wall = Wall::new(wall_type, Vec::new());
        for &segment in segment_ids {
            wall.push_segment(segment);
        }
        let id = wall.id;
        let owned = wall.segment_ids.clone();
        self.walls.insert(id, wall);
        self.wall_order.push(id);
        self.events.push(TopologyEvent::WallCreated(id));
        for segment in owned {
            self.assign_segment(segment, id);
        }
        Ok(id)
    }

    /// Apply a partial update to a wall. Returns false for an unknown id.
    pub fn update_wall(&mut self, id: WallId, update: WallUpdate) -> bool {
        match self.walls.get_mut(&id) {
            Some(wall) => {
                if wall.apply(update) {
                    self.events.push(TopologyEvent::WallUpdated(id));
                }
                true
            }
            None => false,
        }
    }

    /// Add segments to a wall without changing its type.
    pub fn add_segments_to_wall(
        &mut self,
        id: WallId,
        segment_ids: &[SegmentId],
    ) -> TopologyResult<()> {
        if !self.walls.contains_key(&id) {
            return Err(TopologyError::WallNotFound(id));
        }
        self.check_segments(segment_ids)?;

        let mut changed = false;
        for &segment in segment_ids {
            let added = self
                .walls
                .get_mut(&id)
                .is_some_and(|wall| wall.push_segment(segment));
            if added {
                self.assign_segment(segment, id);
                changed = true;
            }
        }
        if changed {
            self.touch_wall(id);
        }
        Ok(())
    }

    /// Remove segments from a wall. The segments stay in the graph, unowned.
    /// Ids that are not part of the wall are ignored.
    pub fn remove_segments_from_wall(
        &mut self,
        id: WallId,
        segment_ids: &[SegmentId],
    ) -> TopologyResult<()> {
        let wall = self.walls.get_mut(&id).ok_or(TopologyError::WallNotFound(id))?;
        let mut removed = Vec::new();
        for &segment in segment_ids {
            if wall.remove_segment(segment) {
                removed.push(segment);
            }
        }
        if removed.is_empty() {
            return Ok(());
        }
        for segment in removed {
            if let Some(seg) = self.segments.get_mut(&segment) {
                seg.wall_id = None;
            }
        }
        self.touch_wall(id);
        Ok(())
    }

    /// Delete the wall record. Its segments and nodes stay in the graph as
    /// unowned geometry; see deletion-impact analysis for cleanup.
    pub fn delete_wall(&mut self, id: WallId) -> Option<Wall> {
        let wall = self.walls.remove(&id)?;
        self.wall_order.retain(|&w| w != id);
        for segment in &wall.segment_ids {
            if let Some(seg) = self.segments.get_mut(segment) {
                if seg.wall_id == Some(id) {
                    seg.wall_id = None;
                }
            }
        }
        self.events.push(TopologyEvent::WallRemoved(id));
        Some(wall)
    }

    fn check_segments(&self, segment_ids: &[SegmentId]) -> TopologyResult<()> {
        match segment_ids.iter().find(|id| !self.segments.contains_key(id)) {
            Some(&missing) => Err(TopologyError::SegmentNotFound(missing)),
            None => Ok(()),
        }
    }

    /// Point `segment` at wall `id`, detaching it from any previous owner.
    fn assign_segment(&mut self, segment: SegmentId, id: WallId) {
        let previous = match self.segments.get_mut(&segment) {
            Some(seg) => seg.wall_id.replace(id),
            None => return,
        };
        if let Some(prev) = previous.filter(|&prev| prev != id) {
            if let Some(wall) = self.walls.get_mut(&prev) {
                if wall.remove_segment(segment) {
                    wall.touch();
                    self.events.push(TopologyEvent::WallUpdated(prev));
                }
            }
        }
    }

    fn touch_wall(&mut self, id: WallId) {
        if let Some(wall) = self.walls.get_mut(&id) {
            wall.touch();
            self.events.push(TopologyEvent::WallUpdated(id));
        }
    }

    // --- Accessors ---

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    pub fn get_wall(&self, id: WallId) -> Option<&Wall> {
        self.walls.get(&id)
    }

    /// All nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All segments, in no particular order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// All walls, oldest first.
    pub fn walls(&self) -> impl Iterator<Item = &Wall> {
        self.wall_order.iter().filter_map(|id| self.walls.get(id))
    }

    /// Wall ids, oldest first.
    pub fn wall_ids(&self) -> &[WallId] {
        &self.wall_order
    }

    /// Position of a wall in creation order.
    pub fn wall_rank(&self, id: WallId) -> Option<usize> {
        self.wall_order.iter().position(|&w| w == id)
    }

    /// Segments of a wall in chain order. Unknown walls yield nothing.
    pub fn wall_segments(&self, id: WallId) -> impl Iterator<Item = &Segment> {
        self.walls
            .get(&id)
            .map(|wall| wall.segment_ids.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|seg| self.segments.get(seg))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.segments.is_empty() && self.walls.is_empty()
    }

    pub fn min_segment_length(&self) -> f64 {
        self.min_segment_length
    }

    fn node_point(&self, id: NodeId) -> TopologyResult<Point> {
        self.nodes
            .get(&id)
            .map(Node::point)
            .ok_or(TopologyError::NodeNotFound(id))
    }

    // --- Events ---

    /// Take all structural events emitted since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<TopologyEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Diagnostics ---

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            segments: self.segments.len(),
            walls: self.walls.len(),
            intersection_nodes: self.nodes.values().filter(|n| n.is_intersection()).count(),
            orphaned_nodes: self.nodes.values().filter(|n| n.is_orphaned()).count(),
            unowned_segments: self.segments.values().filter(|s| s.wall_id.is_none()).count(),
        }
    }

    /// Check every referential and type invariant. Returns one message per
    /// violation; an empty list means the graph is consistent.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for node in self.nodes.values() {
            for seg in &node.connected_segments {
                match self.segments.get(seg) {
                    Some(s) if s.has_node(node.id) => {}
                    Some(_) => problems.push(format!(
                        "node {} lists segment {} which does not end there",
                        node.id, seg
                    )),
                    None => problems.push(format!(
                        "node {} lists missing segment {}",
                        node.id, seg
                    )),
                }
            }
            if node.kind != node.expected_kind() {
                problems.push(format!(
                    "node {} has kind {:?} with {} segment(s)",
                    node.id,
                    node.kind,
                    node.degree()
                ));
            }
        }

        for seg in self.segments.values() {
            if seg.start_node == seg.end_node {
                problems.push(format!("segment {} is a self loop", seg.id));
            }
            if seg.length <= self.min_segment_length {
                problems.push(format!("segment {} has length {}", seg.id, seg.length));
            }
            for node_id in seg.nodes() {
                match self.nodes.get(&node_id) {
                    Some(node) if node.connected_segments.contains(&seg.id) => {}
                    Some(_) => problems.push(format!(
                        "node {} does not list segment {}",
                        node_id, seg.id
                    )),
                    None => problems.push(format!(
                        "segment {} references missing node {}",
                        seg.id, node_id
                    )),
                }
            }
            if let Some(wall_id) = seg.wall_id {
                match self.walls.get(&wall_id) {
                    Some(wall) if wall.contains_segment(seg.id) => {}
                    Some(_) => problems.push(format!(
                        "wall {} does not list segment {}",
                        wall_id, seg.id
                    )),
                    None => problems.push(format!(
                        "segment {} references missing wall {}",
                        seg.id, wall_id
                    )),
                }
            }
        }

        for wall in self.walls.values() {
            for seg in &wall.segment_ids {
                match self.segments.get(seg) {
                    Some(s) if s.wall_id == Some(wall.id) => {}
                    Some(_) => problems.push(format!(
                        "segment {} is listed by wall {} but owned elsewhere",
                        seg, wall.id
                    )),
                    None => problems.push(format!(
                        "wall {} lists missing segment {}",
                        wall.id, seg
                    )),
                }
            }
        }

        if self.wall_order.len() != self.walls.len()
            || self.wall_order.iter().any(|id| !self.walls.contains_key(id))
        {
            problems.push("wall creation order is out of sync".to_string());
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes(graph: &mut WallGraph) -> (NodeId, NodeId) {
        (graph.create_node(0.0, 0.0), graph.create_node(10.0, 0.0))
    }

    #[test]
    fn test_create_segment_links_both_nodes() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();

        assert!(graph.get_node(a).unwrap().connected_segments().contains(&seg));
        assert!(graph.get_node(b).unwrap().connected_segments().contains(&seg));
        let segment = graph.get_segment(seg).unwrap();
        assert!((segment.length() - 10.0).abs() < f64::EPSILON);
        assert!(segment.angle().abs() < f64::EPSILON);
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_create_segment_rejects_invalid_input() {
        let mut graph = WallGraph::new();
        let a = graph.create_node(0.0, 0.0);
        let same_spot = graph.create_node(0.0, 0.0);
        let unknown = NodeId::new();

        assert_eq!(graph.create_segment(a, a), Err(TopologyError::SelfLoop(a)));
        assert_eq!(
            graph.create_segment(a, unknown),
            Err(TopologyError::NodeNotFound(unknown))
        );
        assert!(matches!(
            graph.create_segment(a, same_spot),
            Err(TopologyError::ZeroLength(_))
        ));
        assert_eq!(graph.segment_count(), 0);
        assert!(graph.get_node(a).unwrap().is_orphaned());
    }

    #[test]
    fn test_wall_thickness_tracks_type() {
        let mut graph = WallGraph::new();
        for wall_type in WallType::ALL {
            let id = graph.create_wall(wall_type, &[]).unwrap();
            assert!((graph.get_wall(id).unwrap().thickness() - wall_type.thickness()).abs() < f64::EPSILON);
        }

        let id = graph.create_wall(WallType::Layout, &[]).unwrap();
        let before = graph.get_wall(id).unwrap().updated_at();
        assert!(graph.update_wall(id, WallUpdate::wall_type(WallType::Zone)));
        let wall = graph.get_wall(id).unwrap();
        assert!((wall.thickness() - 250.0).abs() < f64::EPSILON);
        assert!(wall.updated_at() > before);
    }

    #[test]
    fn test_update_unknown_wall_is_false() {
        let mut graph = WallGraph::new();
        assert!(!graph.update_wall(WallId::new(), WallUpdate::visible(false)));
    }

    #[test]
    fn test_create_wall_with_unknown_segment_leaves_graph_unchanged() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();
        let missing = SegmentId::new();

        assert_eq!(
            graph.create_wall(WallType::Layout, &[seg, missing]),
            Err(TopologyError::SegmentNotFound(missing))
        );
        assert_eq!(graph.wall_count(), 0);
        assert_eq!(graph.get_segment(seg).unwrap().wall_id(), None);
    }

    #[test]
    fn test_add_and_remove_segments_preserve_type() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let c = graph.create_node(10.0, 10.0);
        let s1 = graph.create_segment(a, b).unwrap();
        let s2 = graph.create_segment(b, c).unwrap();
        let wall = graph.create_wall(WallType::Area, &[s1]).unwrap();

        graph.add_segments_to_wall(wall, &[s2]).unwrap();
        assert_eq!(graph.get_wall(wall).unwrap().segment_ids(), &[s1, s2]);
        assert_eq!(graph.get_segment(s2).unwrap().wall_id(), Some(wall));

        graph.remove_segments_from_wall(wall, &[s1]).unwrap();
        let w = graph.get_wall(wall).unwrap();
        assert_eq!(w.segment_ids(), &[s2]);
        assert_eq!(w.wall_type(), WallType::Area);
        assert!((w.thickness() - 150.0).abs() < f64::EPSILON);
        assert_eq!(graph.get_segment(s1).unwrap().wall_id(), None);
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_segment_moves_between_walls() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();
        let first = graph.create_wall(WallType::Layout, &[seg]).unwrap();
        let second = graph.create_wall(WallType::Zone, &[seg]).unwrap();

        assert!(graph.get_wall(first).unwrap().segment_ids().is_empty());
        assert_eq!(graph.get_segment(seg).unwrap().wall_id(), Some(second));
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_delete_wall_keeps_geometry() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();
        let wall = graph.create_wall(WallType::Layout, &[seg]).unwrap();

        assert!(graph.delete_wall(wall).is_some());
        assert!(graph.delete_wall(wall).is_none());
        assert_eq!(graph.segment_count(), 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.get_segment(seg).unwrap().wall_id(), None);
        assert!(graph.wall_ids().is_empty());
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_split_segment_preserves_wall_and_order() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let c = graph.create_node(10.0, 10.0);
        let s1 = graph.create_segment(a, b).unwrap();
        let s2 = graph.create_segment(b, c).unwrap();
        let wall = graph.create_wall(WallType::Zone, &[s1, s2]).unwrap();
        let mid = graph.create_node(5.0, 0.0);

        let (h1, h2) = graph.split_segment(s1, mid).unwrap();
        assert!(graph.get_segment(s1).is_none());
        assert_eq!(graph.get_wall(wall).unwrap().segment_ids(), &[h1, h2, s2]);
        assert_eq!(graph.get_segment(h1).unwrap().wall_id(), Some(wall));
        assert_eq!(graph.get_node(mid).unwrap().degree(), 2);
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_split_rejects_endpoint_and_degenerate_halves() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();
        assert_eq!(
            graph.split_segment(seg, a),
            Err(TopologyError::SplitAtEndpoint(seg))
        );
        let on_top_of_a = graph.create_node(0.0, 0.0);
        assert!(matches!(
            graph.split_segment(seg, on_top_of_a),
            Err(TopologyError::ZeroLength(_))
        ));
        assert!(graph.get_segment(seg).is_some());
    }

    #[test]
    fn test_remove_node_requires_orphan() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();
        assert_eq!(graph.remove_node(a), Err(TopologyError::NodeInUse(a, 1)));
        graph.remove_segment(seg).unwrap();
        assert!(graph.remove_node(a).is_ok());
        assert!(graph.get_node(a).is_none());
        assert_eq!(graph.stats().orphaned_nodes, 1);
    }

    #[test]
    fn test_events_are_emitted_in_order() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();
        let wall = graph.create_wall(WallType::Layout, &[seg]).unwrap();
        assert_eq!(
            graph.drain_events(),
            vec![
                TopologyEvent::NodeCreated(a),
                TopologyEvent::NodeCreated(b),
                TopologyEvent::SegmentCreated(seg),
                TopologyEvent::WallCreated(wall),
            ]
        );
        assert!(graph.drain_events().is_empty());
    }

    #[test]
    fn test_move_node_refreshes_segments() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let seg = graph.create_segment(a, b).unwrap();
        let wall = graph.create_wall(WallType::Layout, &[seg]).unwrap();
        let before = graph.get_wall(wall).unwrap().updated_at();

        graph.move_node(b, Point::new(0.0, 10.0)).unwrap();
        let segment = graph.get_segment(seg).unwrap();
        assert!((segment.length() - 10.0).abs() < f64::EPSILON);
        assert!((segment.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(graph.get_wall(wall).unwrap().updated_at() > before);

        // Collapsing the segment is refused and nothing moves.
        assert!(matches!(
            graph.move_node(b, Point::new(0.0, 0.0)),
            Err(TopologyError::ZeroLength(_))
        ));
        assert!((graph.get_node(b).unwrap().y() - 10.0).abs() < f64::EPSILON);
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_translate_wall_stretches_neighbours() {
        let mut graph = WallGraph::new();
        let (a, b) = two_nodes(&mut graph);
        let c = graph.create_node(10.0, 10.0);
        let s1 = graph.create_segment(a, b).unwrap();
        let s2 = graph.create_segment(b, c).unwrap();
        let moved = graph.create_wall(WallType::Layout, &[s1]).unwrap();
        graph.create_wall(WallType::Zone, &[s2]).unwrap();

        graph.translate_wall(moved, Vec2::new(0.0, -5.0)).unwrap();
        assert!((graph.get_segment(s1).unwrap().length() - 10.0).abs() < 1e-12);
        assert!((graph.get_segment(s2).unwrap().length() - 15.0).abs() < 1e-12);
        assert!(matches!(
            graph.translate_wall(WallId::new(), Vec2::ZERO),
            Err(TopologyError::WallNotFound(_))
        ));
    }

    #[test]
    fn test_find_node_near() {
        let mut graph = WallGraph::new();
        let a = graph.create_node(0.0, 0.0);
        graph.create_node(5.0, 0.0);
        assert_eq!(graph.find_node_near(Point::new(1e-7, 0.0), 1e-6), Some(a));
        assert_eq!(graph.find_node_near(Point::new(2.0, 0.0), 1e-6), None);
    }
}
