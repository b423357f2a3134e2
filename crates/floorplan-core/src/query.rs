//! Spatial queries over the wall graph: hit-testing, area selection,
//! connectivity and deletion impact.
//!
//! The service owns nothing but its hit-test radius; every call resolves ids
//! against the graph it is given.

use crate::config::EngineConfig;
use crate::geometry::{point_segment_distance, segment_intersects_rect};
use crate::graph::{NodeId, SegmentId, WallGraph, WallId};
use kurbo::{Point, Rect};
use std::collections::BTreeSet;

/// Summary of one wall's geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct WallInfo {
    pub wall_id: WallId,
    /// Segment ids in chain order.
    pub segments: Vec<SegmentId>,
    /// Every node touched by those segments, without duplicates.
    pub nodes: Vec<NodeId>,
    /// Sum of segment lengths.
    pub total_length: f64,
    /// Bounding box of the touched nodes; `None` for a wall with no segments.
    pub bounds: Option<Rect>,
}

/// What deleting a wall would do to the rest of the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionImpact {
    pub can_delete: bool,
    /// Walls sharing a node with the wall, oldest first.
    pub connected_walls: Vec<WallId>,
    /// Nodes that would have no segments left once the wall's segments go.
    pub orphaned_nodes: Vec<NodeId>,
    /// Human-readable notes for a confirmation prompt.
    pub warnings: Vec<String>,
}

/// Read-only spatial queries with a runtime-adjustable selection radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialQueryService {
    selection_tolerance: f64,
}

impl Default for SpatialQueryService {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SpatialQueryService {
    pub fn new(selection_tolerance: f64) -> Self {
        let mut service = Self {
            selection_tolerance: EngineConfig::default().selection_tolerance,
        };
        service.set_selection_tolerance(selection_tolerance);
        service
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.selection_tolerance)
    }

    pub fn selection_tolerance(&self) -> f64 {
        self.selection_tolerance
    }

    /// Change the hit-test radius used by later `find_wall_at_point` calls.
    /// Negative or non-finite values are ignored.
    pub fn set_selection_tolerance(&mut self, tolerance: f64) {
        if tolerance.is_finite() && tolerance >= 0.0 {
            self.selection_tolerance = tolerance;
        } else {
            log::warn!("Ignoring invalid selection tolerance {}", tolerance);
        }
    }

    /// The visible wall closest to `point`, if within the selection radius.
    ///
    /// Distance is point-to-segment (clamped projection). A distance equal to
    /// the radius counts as a hit. Ties go to the first-created wall.
    pub fn find_wall_at_point(&self, graph: &WallGraph, point: Point) -> Option<WallId> {
        let mut best: Option<(WallId, f64)> = None;
        for wall in graph.walls().filter(|w| w.is_visible()) {
            let Some(dist) = graph
                .wall_segments(wall.id())
                .map(|seg| point_segment_distance(point, seg.start(), seg.end()))
                .min_by(f64::total_cmp)
            else {
                continue;
            };
            if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((wall.id(), dist));
            }
        }
        best.filter(|&(_, dist)| dist <= self.selection_tolerance)
            .map(|(id, _)| id)
    }

    /// Visible walls with at least one segment touching the rectangle
    /// spanned by the two corners, oldest first.
    pub fn find_walls_in_area(
        &self,
        graph: &WallGraph,
        top_left: Point,
        bottom_right: Point,
    ) -> Vec<WallId> {
        let rect = Rect::from_points(top_left, bottom_right);
        graph
            .walls()
            .filter(|wall| wall.is_visible())
            .filter(|wall| {
                graph
                    .wall_segments(wall.id())
                    .any(|seg| segment_intersects_rect(seg.start(), seg.end(), rect))
            })
            .map(|wall| wall.id())
            .collect()
    }

    /// Segments, nodes, total length and bounds of a wall.
    pub fn get_wall_info(&self, graph: &WallGraph, wall_id: WallId) -> Option<WallInfo> {
        let wall = graph.get_wall(wall_id)?;
        let mut nodes = Vec::new();
        let mut seen = BTreeSet::new();
        let mut total_length = 0.0;
        let mut bounds: Option<Rect> = None;

        for seg in graph.wall_segments(wall_id) {
            total_length += seg.length();
            for (node, point) in [(seg.start_node_id(), seg.start()), (seg.end_node_id(), seg.end())] {
                if seen.insert(node) {
                    nodes.push(node);
                    bounds = Some(match bounds {
                        Some(r) => r.union_pt(point),
                        None => Rect::from_points(point, point),
                    });
                }
            }
        }

        Some(WallInfo {
            wall_id,
            segments: wall.segment_ids().to_vec(),
            nodes,
            total_length,
            bounds,
        })
    }

    /// Walls that share at least one node with `wall_id`, oldest first.
    /// The wall itself is never included.
    pub fn find_connected_walls(&self, graph: &WallGraph, wall_id: WallId) -> Vec<WallId> {
        let mut connected = BTreeSet::new();
        for node in wall_nodes(graph, wall_id) {
            let Some(node) = graph.get_node(node) else {
                continue;
            };
            for seg in node.connected_segments() {
                if let Some(other) = graph.get_segment(*seg).and_then(|s| s.wall_id()) {
                    if other != wall_id {
                        connected.insert(other);
                    }
                }
            }
        }
        let mut walls: Vec<WallId> = connected.into_iter().collect();
        walls.sort_by_key(|&id| graph.wall_rank(id).unwrap_or(usize::MAX));
        walls
    }

    /// Report the consequences of deleting `wall_id` together with its
    /// segments.
    pub fn analyze_deletion_impact(&self, graph: &WallGraph, wall_id: WallId) -> DeletionImpact {
        let Some(wall) = graph.get_wall(wall_id) else {
            return DeletionImpact {
                can_delete: false,
                warnings: vec!["Wall not found".to_string()],
                ..DeletionImpact::default()
            };
        };

        let connected_walls = self.find_connected_walls(graph, wall_id);
        let own: BTreeSet<SegmentId> = wall.segment_ids().iter().copied().collect();
        let orphaned_nodes: Vec<NodeId> = wall_nodes(graph, wall_id)
            .into_iter()
            .filter(|&node| {
                graph
                    .get_node(node)
                    .is_some_and(|n| n.connected_segments().iter().all(|s| own.contains(s)))
            })
            .collect();

        let mut warnings = Vec::new();
        if !connected_walls.is_empty() {
            warnings.push(format!(
                "Deleting this wall will disconnect {} connected wall(s)",
                connected_walls.len()
            ));
        }
        if !orphaned_nodes.is_empty() {
            warnings.push(format!(
                "{} node(s) will be left without segments",
                orphaned_nodes.len()
            ));
        }

        DeletionImpact {
            can_delete: true,
            connected_walls,
            orphaned_nodes,
            warnings,
        }
    }
}

/// Nodes touched by a wall's segments, in chain order without duplicates.
fn wall_nodes(graph: &WallGraph, wall_id: WallId) -> Vec<NodeId> {
    let mut seen = BTreeSet::new();
    graph
        .wall_segments(wall_id)
        .flat_map(|seg| seg.nodes())
        .filter(|&node| seen.insert(node))
        .collect()
}
