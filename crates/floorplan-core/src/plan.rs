//! The floor plan: one owner for the graph and every service built on it.
//!
//! All editing, querying and proximity scanning goes through `&mut self`,
//! so operations run one at a time and a scan can never overlap a
//! mutation. After each operation the pending events are published in
//! emission order.

use crate::config::EngineConfig;
use crate::error::{TopologyError, TopologyResult};
use crate::events::{EngineEvent, EventBus, EventListener, TopologyEvent};
use crate::graph::{NodeId, SegmentId, WallGraph, WallId, WallType, WallUpdate};
use crate::intersection::{IntersectionResolver, ResolveReport};
use crate::proximity::{Instant, ProximityMergeDetector};
use crate::query::{DeletionImpact, SpatialQueryService, WallInfo};
use kurbo::{Point, Vec2};

/// Result of drawing a wall.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOutcome {
    /// The new wall. It exists even if some crossings stayed unresolved.
    pub wall_id: WallId,
    pub report: ResolveReport,
}

/// A floor plan being edited.
#[derive(Debug)]
pub struct FloorPlan {
    config: EngineConfig,
    graph: WallGraph,
    resolver: IntersectionResolver,
    queries: SpatialQueryService,
    detector: ProximityMergeDetector,
    bus: EventBus,
    undo_stack: Vec<WallGraph>,
    redo_stack: Vec<WallGraph>,
}

impl Default for FloorPlan {
    fn default() -> Self {
        Self::from_valid_config(EngineConfig::default())
    }
}

impl FloorPlan {
    /// Create an empty plan with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty plan after validating `config`.
    pub fn with_config(config: EngineConfig) -> TopologyResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EngineConfig) -> Self {
        Self {
            graph: WallGraph::with_config(&config),
            resolver: IntersectionResolver::from_config(&config),
            queries: SpatialQueryService::from_config(&config),
            detector: ProximityMergeDetector::from_config(&config),
            bus: EventBus::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of the graph, e.g. for rendering.
    pub fn graph(&self) -> &WallGraph {
        &self.graph
    }

    pub fn detector(&self) -> &ProximityMergeDetector {
        &self.detector
    }

    // --- Events ---

    /// Register a listener for every later event.
    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.bus.subscribe(listener);
    }

    /// Take every event published so far, oldest first.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.bus.drain()
    }

    fn flush(&mut self) {
        let events = self.graph.drain_events();
        self.bus.publish(events.into_iter().map(EngineEvent::from));
    }

    // --- Editing ---

    /// Turn a drawn polyline into a wall and resolve its crossings.
    ///
    /// Points within the intersection epsilon of an existing node reuse
    /// that node; consecutive duplicates are dropped. Fails without
    /// changing the plan if fewer than two distinct points remain or a
    /// segment cannot be built.
    pub fn draw_wall(&mut self, points: &[Point], wall_type: WallType) -> TopologyResult<DrawOutcome> {
        let eps = self.config.intersection_epsilon;
        if let Some(bad) = points.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(TopologyError::Degenerate(format!(
                "non-finite point ({}, {})",
                bad.x, bad.y
            )));
        }
        let mut path: Vec<Point> = Vec::with_capacity(points.len());
        for &p in points {
            if path.last().is_none_or(|last| last.distance(p) > eps) {
                path.push(p);
            }
        }
        if path.len() < 2 {
            return Err(TopologyError::Degenerate(
                "a wall needs at least two distinct points".to_string(),
            ));
        }

        let snapshot = self.graph.clone();
        let wall_id = match self.build_wall(&path, wall_type) {
            Ok(id) => id,
            Err(err) => {
                self.graph = snapshot;
                return Err(err);
            }
        };
        self.remember(snapshot);

        let report = self.resolver.resolve_wall(&mut self.graph, wall_id);
        for err in &report.errors {
            log::warn!("Unresolved crossing on wall {}: {}", wall_id, err);
        }
        self.flush();
        Ok(DrawOutcome { wall_id, report })
    }

    fn build_wall(&mut self, path: &[Point], wall_type: WallType) -> TopologyResult<WallId> {
        let eps = self.config.intersection_epsilon;
        let mut nodes: Vec<NodeId> = Vec::with_capacity(path.len());
        for &p in path {
            let node = match self.graph.find_node_near(p, eps) {
                Some(existing) => existing,
                None => self.graph.create_node(p.x, p.y),
            };
            nodes.push(node);
        }
        let mut segments: Vec<SegmentId> = Vec::with_capacity(nodes.len() - 1);
        for pair in nodes.windows(2) {
            segments.push(self.graph.create_segment(pair[0], pair[1])?);
        }
        self.graph.create_wall(wall_type, &segments)
    }

    /// Apply a partial update. Returns false for an unknown wall.
    pub fn update_wall(&mut self, id: WallId, update: WallUpdate) -> bool {
        if self.graph.get_wall(id).is_none() {
            return false;
        }
        let snapshot = self.graph.clone();
        self.graph.update_wall(id, update);
        self.remember(snapshot);
        self.flush();
        true
    }

    /// Move a wall's nodes by `delta` and resolve any new crossings.
    ///
    /// Walls sharing a node with the moved wall are stretched along with it,
    /// so their crossings are resolved as well.
    pub fn move_wall(&mut self, id: WallId, delta: Vec2) -> TopologyResult<ResolveReport> {
        let stretched = self.queries.find_connected_walls(&self.graph, id);
        let snapshot = self.graph.clone();
        self.graph.translate_wall(id, delta)?;
        self.remember(snapshot);

        let mut report = self.resolver.resolve_wall(&mut self.graph, id);
        for wall in stretched {
            report.merge(self.resolver.resolve_wall(&mut self.graph, wall));
        }
        for err in &report.errors {
            log::warn!("Unresolved crossing after moving wall {}: {}", id, err);
        }
        self.flush();
        Ok(report)
    }

    /// Delete a wall.
    ///
    /// Without `cleanup` only the wall record goes and its geometry stays
    /// as unowned segments. With `cleanup` its segments and the nodes left
    /// without segments are removed too. Returns the impact computed
    /// before deleting.
    pub fn delete_wall(&mut self, id: WallId, cleanup: bool) -> TopologyResult<DeletionImpact> {
        let impact = self.queries.analyze_deletion_impact(&self.graph, id);
        if !impact.can_delete {
            return Err(TopologyError::WallNotFound(id));
        }
        self.apply_deletion(id, cleanup, &impact.orphaned_nodes)?;
        if !impact.connected_walls.is_empty() {
            log::debug!(
                "Deleted wall {} connected to {} other wall(s)",
                id,
                impact.connected_walls.len()
            );
        }
        self.flush();
        Ok(impact)
    }

    /// Delete `id` and, with `cleanup`, its segments and `orphans`. Either
    /// everything is removed or the graph is restored.
    fn apply_deletion(&mut self, id: WallId, cleanup: bool, orphans: &[NodeId]) -> TopologyResult<()> {
        let snapshot = self.graph.clone();
        if let Err(err) = self.remove_wall(id, cleanup, orphans) {
            self.graph = snapshot;
            return Err(err);
        }
        self.remember(snapshot);
        Ok(())
    }

    fn remove_wall(&mut self, id: WallId, cleanup: bool, orphans: &[NodeId]) -> TopologyResult<()> {
        let wall = self
            .graph
            .delete_wall(id)
            .ok_or(TopologyError::WallNotFound(id))?;
        if cleanup {
            for &seg in wall.segment_ids() {
                self.graph.remove_segment(seg)?;
            }
            for &node in orphans {
                self.graph.remove_node(node)?;
            }
        }
        Ok(())
    }

    // --- Undo / redo ---

    fn remember(&mut self, snapshot: WallGraph) {
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.undo_depth {
            self.undo_stack.remove(0);
        }
    }

    /// Restore the state before the last edit. Returns false if there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(snapshot) => {
                let current = std::mem::replace(&mut self.graph, snapshot);
                self.redo_stack.push(current);
                self.bus.publish([TopologyEvent::GraphRestored.into()]);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone edit. Returns false if there is nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(snapshot) => {
                let current = std::mem::replace(&mut self.graph, snapshot);
                self.undo_stack.push(current);
                self.bus.publish([TopologyEvent::GraphRestored.into()]);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // --- Queries ---

    pub fn find_wall_at_point(&self, point: Point) -> Option<WallId> {
        self.queries.find_wall_at_point(&self.graph, point)
    }

    pub fn find_walls_in_area(&self, top_left: Point, bottom_right: Point) -> Vec<WallId> {
        self.queries.find_walls_in_area(&self.graph, top_left, bottom_right)
    }

    pub fn get_wall_info(&self, id: WallId) -> Option<WallInfo> {
        self.queries.get_wall_info(&self.graph, id)
    }

    pub fn find_connected_walls(&self, id: WallId) -> Vec<WallId> {
        self.queries.find_connected_walls(&self.graph, id)
    }

    pub fn analyze_deletion_impact(&self, id: WallId) -> DeletionImpact {
        self.queries.analyze_deletion_impact(&self.graph, id)
    }

    pub fn selection_tolerance(&self) -> f64 {
        self.queries.selection_tolerance()
    }

    pub fn set_selection_tolerance(&mut self, tolerance: f64) {
        self.queries.set_selection_tolerance(tolerance);
    }

    // --- Proximity ---

    pub fn enable_proximity(&mut self) {
        self.detector.enable();
    }

    /// Disable the detector; merge records are cleared and their
    /// separations published before this returns.
    pub fn disable_proximity(&mut self) {
        let events = self.detector.disable();
        self.bus.publish(events.into_iter().map(EngineEvent::from));
    }

    pub fn set_proximity_threshold(&mut self, threshold: f64) {
        self.detector.set_threshold(threshold);
    }

    /// Drive the proximity detector. Call at a fixed cadence; scans run
    /// only when enabled and the interval has elapsed.
    pub fn tick(&mut self, now: Instant) {
        let events = self.detector.tick(&self.graph, now);
        self.bus.publish(events.into_iter().map(EngineEvent::from));
    }
}
