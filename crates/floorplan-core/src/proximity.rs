//! Proximity merge detection.
//!
//! Walls that come within `threshold` of each other without sharing a node
//! are "merged" for display purposes. The relationship is level-triggered:
//! every scan recomputes the full set and emits `Created` / `Separated`
//! events for the differences. The detector owns no timer; the host calls
//! [`ProximityMergeDetector::tick`] at its own cadence.
//!
//! Merge types are classified from the two closest segments:
//! - angle ≤ `parallel_tolerance_deg` and overlapping projections:
//!   [`MergeType::ParallelOverlap`]
//! - angle ≤ `parallel_tolerance_deg` without overlap: [`MergeType::EndToEnd`]
//! - angle ≥ 90° − `perpendicular_tolerance_deg`: [`MergeType::CornerTouch`]
//! - anything else: [`MergeType::Oblique`]

use crate::config::{EngineConfig, ProximityConfig};
use crate::events::MergeEvent;
use crate::geometry::{acute_angle_between, projected_overlap, segment_distance};
use crate::graph::{MergeId, NodeId, Segment, SegmentId, WallGraph, WallId};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

/// Geometric relationship between two merged walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeType {
    /// Near-parallel segments running alongside each other.
    ParallelOverlap,
    /// Near-parallel segments meeting end to end.
    EndToEnd,
    /// Near-perpendicular segments, typically a corner.
    CornerTouch,
    /// Any other angle.
    Oblique,
}

/// A detected near-adjacency between two walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityMerge {
    pub id: MergeId,
    /// The two walls, ordered by id.
    pub walls: (WallId, WallId),
    /// The closest segment of each wall, in the same order as `walls`.
    pub segments: (SegmentId, SegmentId),
    /// Minimum segment-to-segment distance at the last scan.
    pub distance: f64,
    pub merge_type: MergeType,
}

impl ProximityMerge {
    pub fn involves(&self, wall: WallId) -> bool {
        self.walls.0 == wall || self.walls.1 == wall
    }
}

type PairKey = (WallId, WallId);

fn pair_key(a: WallId, b: WallId) -> PairKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// Closest approach between two walls.
#[derive(Debug, Clone, Copy)]
struct Measurement {
    distance: f64,
    segments: (SegmentId, SegmentId),
    merge_type: MergeType,
}

/// Per-wall data gathered once per scan.
struct WallFootprint<'a> {
    id: WallId,
    segments: Vec<&'a Segment>,
    nodes: BTreeSet<NodeId>,
    bounds: Option<Rect>,
}

/// Maintains the set of proximity merges.
#[derive(Debug, Clone)]
pub struct ProximityMergeDetector {
    config: ProximityConfig,
    epsilon: f64,
    enabled: bool,
    merges: HashMap<PairKey, ProximityMerge>,
    last_scan: Option<Instant>,
}

impl Default for ProximityMergeDetector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ProximityMergeDetector {
    pub fn new(config: ProximityConfig, epsilon: f64) -> Self {
        Self {
            enabled: config.enabled,
            config,
            epsilon,
            merges: HashMap::new(),
            last_scan: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.proximity.clone(), config.intersection_epsilon)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start periodic evaluation. The next `tick` scans immediately.
    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.last_scan = None;
            log::info!(
                "Proximity detection enabled (threshold {}, every {:?})",
                self.config.threshold,
                self.config.scan_interval()
            );
        }
    }

    /// Stop evaluation and drop every merge record at once. Returns a
    /// `Separated` event per dropped merge. Any scan the host had planned
    /// becomes a no-op.
    pub fn disable(&mut self) -> Vec<MergeEvent> {
        if !self.enabled {
            return Vec::new();
        }
        self.enabled = false;
        self.last_scan = None;
        let mut dropped: Vec<ProximityMerge> = self.merges.drain().map(|(_, m)| m).collect();
        dropped.sort_by_key(|m| m.walls);
        log::info!("Proximity detection disabled, cleared {} merge(s)", dropped.len());
        dropped.into_iter().map(MergeEvent::Separated).collect()
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Change the merge distance. Takes effect at the next scan.
    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold.is_finite() && threshold >= 0.0 {
            self.config.threshold = threshold;
        } else {
            log::warn!("Ignoring invalid proximity threshold {}", threshold);
        }
    }

    pub fn scan_interval(&self) -> Duration {
        self.config.scan_interval()
    }

    pub fn set_scan_interval(&mut self, interval: Duration) {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            log::warn!("Ignoring zero proximity scan interval");
            return;
        }
        self.config.scan_interval_ms = millis;
    }

    /// Whether a scan is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.enabled
            && self
                .last_scan
                .is_none_or(|last| now.saturating_duration_since(last) >= self.config.scan_interval())
    }

    /// Scan if enabled and the interval has elapsed since the last scan.
    pub fn tick(&mut self, graph: &WallGraph, now: Instant) -> Vec<MergeEvent> {
        if !self.is_due(now) {
            return Vec::new();
        }
        self.scan(graph, now)
    }

    /// Re-evaluate every pair of visible walls now, regardless of the
    /// interval. Does nothing while disabled.
    ///
    /// Separations are reported before creations; within each group events
    /// follow wall creation order.
    pub fn scan(&mut self, graph: &WallGraph, now: Instant) -> Vec<MergeEvent> {
        if !self.enabled {
            return Vec::new();
        }
        self.last_scan = Some(now);

        let footprints = footprints(graph);
        let mut found: Vec<(PairKey, Measurement)> = Vec::new();
        for (i, a) in footprints.iter().enumerate() {
            for b in &footprints[i + 1..] {
                if let Some(m) = self.evaluate_pair(a, b) {
                    found.push((pair_key(a.id, b.id), m));
                }
            }
        }

        let mut events = Vec::new();
        let current: HashMap<PairKey, Measurement> = found.iter().copied().collect();

        let mut gone: Vec<PairKey> = self
            .merges
            .keys()
            .filter(|key| !current.contains_key(key))
            .copied()
            .collect();
        gone.sort_by_key(|&(a, b)| (rank(graph, a), rank(graph, b)));
        for key in gone {
            if let Some(merge) = self.merges.remove(&key) {
                log::debug!("Walls {} and {} separated", key.0, key.1);
                events.push(MergeEvent::Separated(merge));
            }
        }

        for (key, m) in found {
            match self.merges.get_mut(&key) {
                Some(existing) => {
                    existing.distance = m.distance;
                    existing.segments = m.segments;
                    existing.merge_type = m.merge_type;
                }
                None => {
                    let merge = ProximityMerge {
                        id: MergeId::new(),
                        walls: key,
                        segments: m.segments,
                        distance: m.distance,
                        merge_type: m.merge_type,
                    };
                    log::debug!(
                        "Walls {} and {} merged ({:?}, distance {:.3})",
                        key.0,
                        key.1,
                        m.merge_type,
                        m.distance
                    );
                    self.merges.insert(key, merge.clone());
                    events.push(MergeEvent::Created(merge));
                }
            }
        }

        events
    }

    /// Active merges, sorted by wall pair.
    pub fn merges(&self) -> Vec<&ProximityMerge> {
        let mut merges: Vec<&ProximityMerge> = self.merges.values().collect();
        merges.sort_by_key(|m| m.walls);
        merges
    }

    pub fn merge_between(&self, a: WallId, b: WallId) -> Option<&ProximityMerge> {
        self.merges.get(&pair_key(a, b))
    }

    pub fn merge_count(&self) -> usize {
        self.merges.len()
    }

    fn evaluate_pair(&self, a: &WallFootprint<'_>, b: &WallFootprint<'_>) -> Option<Measurement> {
        // A shared node is a real connection, not a proximity artifact.
        if !a.nodes.is_disjoint(&b.nodes) {
            return None;
        }
        let threshold = self.config.threshold;
        let (ra, rb) = (a.bounds?, b.bounds?);
        if ra.x0 - threshold > rb.x1
            || rb.x0 - threshold > ra.x1
            || ra.y0 - threshold > rb.y1
            || rb.y0 - threshold > ra.y1
        {
            return None;
        }

        let mut best: Option<(f64, &Segment, &Segment)> = None;
        for &sa in &a.segments {
            for &sb in &b.segments {
                let d = segment_distance(sa.start(), sa.end(), sb.start(), sb.end());
                if best.is_none_or(|(bd, _, _)| d < bd) {
                    best = Some((d, sa, sb));
                }
            }
        }
        let (distance, sa, sb) = best?;
        // Touching or crossing geometry is an unresolved crossing.
        if distance <= self.epsilon || distance >= threshold {
            return None;
        }

        let (first, second) = if a.id <= b.id { (sa, sb) } else { (sb, sa) };
        Some(Measurement {
            distance,
            segments: (first.id(), second.id()),
            merge_type: self.classify(first, second),
        })
    }

    fn classify(&self, a: &Segment, b: &Segment) -> MergeType {
        let angle = acute_angle_between(a.end() - a.start(), b.end() - b.start());
        if angle <= self.config.parallel_tolerance_deg.to_radians() {
            let overlap = projected_overlap(a.start(), a.end(), b.start(), b.end());
            if overlap > self.epsilon {
                MergeType::ParallelOverlap
            } else {
                MergeType::EndToEnd
            }
        } else if angle >= FRAC_PI_2 - self.config.perpendicular_tolerance_deg.to_radians() {
            MergeType::CornerTouch
        } else {
            MergeType::Oblique
        }
    }
}

fn rank(graph: &WallGraph, id: WallId) -> usize {
    graph.wall_rank(id).unwrap_or(usize::MAX)
}

fn footprints(graph: &WallGraph) -> Vec<WallFootprint<'_>> {
    graph
        .walls()
        .filter(|wall| wall.is_visible())
        .map(|wall| {
            let segments: Vec<&Segment> = graph.wall_segments(wall.id()).collect();
            let nodes = segments.iter().flat_map(|s| s.nodes()).collect();
            let bounds = segments
                .iter()
                .map(|s| Rect::from_points(s.start(), s.end()))
                .reduce(|acc, r| acc.union(r));
            WallFootprint {
                id: wall.id(),
                segments,
                nodes,
                bounds,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{WallType, WallUpdate};
    use kurbo::Vec2;

    fn draw(graph: &mut WallGraph, points: &[(f64, f64)]) -> WallId {
        let nodes: Vec<NodeId> = points.iter().map(|&(x, y)| graph.create_node(x, y)).collect();
        let segments: Vec<SegmentId> = nodes
            .windows(2)
            .map(|pair| graph.create_segment(pair[0], pair[1]).unwrap())
            .collect();
        graph.create_wall(WallType::Layout, &segments).unwrap()
    }

    fn enabled_detector() -> ProximityMergeDetector {
        let mut detector = ProximityMergeDetector::default();
        detector.enable();
        detector
    }

    #[test]
    fn test_disabled_detector_never_scans() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        draw(&mut graph, &[(0.0, 5.0), (100.0, 5.0)]);
        let mut detector = ProximityMergeDetector::default();
        assert!(!detector.is_enabled());
        assert!(detector.scan(&graph, Instant::now()).is_empty());
        assert!(detector.tick(&graph, Instant::now()).is_empty());
        assert_eq!(detector.merge_count(), 0);
    }

    #[test]
    fn test_level_triggered_create_then_separate() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        let moving = draw(&mut graph, &[(0.0, 20.0), (100.0, 20.0)]);
        let mut detector = enabled_detector();
        let mut now = Instant::now();
        let mut events = Vec::new();

        events.extend(detector.scan(&graph, now));
        graph.translate_wall(moving, Vec2::new(0.0, -10.0)).unwrap();
        now += Duration::from_secs(1);
        events.extend(detector.scan(&graph, now));
        // A repeated scan at the same distance changes nothing.
        events.extend(detector.scan(&graph, now));
        graph.translate_wall(moving, Vec2::new(0.0, 10.0)).unwrap();
        now += Duration::from_secs(1);
        events.extend(detector.scan(&graph, now));

        assert_eq!(events.len(), 2);
        assert!(events[0].is_created());
        assert!(!events[1].is_created());
        assert_eq!(events[0].merge().id, events[1].merge().id);
        assert_eq!(detector.merge_count(), 0);
    }

    #[test]
    fn test_parallel_overlap_classification() {
        let mut graph = WallGraph::new();
        let a = draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        let b = draw(&mut graph, &[(20.0, 10.0), (80.0, 10.0)]);
        let mut detector = enabled_detector();
        detector.scan(&graph, Instant::now());

        let merge = detector.merge_between(a, b).unwrap();
        assert_eq!(merge.merge_type, MergeType::ParallelOverlap);
        assert!((merge.distance - 10.0).abs() < 1e-9);
        assert!(merge.involves(a) && merge.involves(b));
    }

    #[test]
    fn test_corner_touch_classification() {
        let mut graph = WallGraph::new();
        let a = draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        let b = draw(&mut graph, &[(105.0, 5.0), (105.0, 100.0)]);
        let mut detector = enabled_detector();
        detector.scan(&graph, Instant::now());
        assert_eq!(
            detector.merge_between(a, b).unwrap().merge_type,
            MergeType::CornerTouch
        );
    }

    #[test]
    fn test_end_to_end_and_oblique_classification() {
        let mut graph = WallGraph::new();
        let a = draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        let b = draw(&mut graph, &[(110.0, 0.0), (200.0, 0.0)]);
        let c = draw(&mut graph, &[(-5.0, 8.0), (-60.0, 63.0)]);
        let mut detector = enabled_detector();
        detector.scan(&graph, Instant::now());

        assert_eq!(detector.merge_between(a, b).unwrap().merge_type, MergeType::EndToEnd);
        assert_eq!(detector.merge_between(a, c).unwrap().merge_type, MergeType::Oblique);
    }

    #[test]
    fn test_shared_node_supersedes_proximity() {
        let mut graph = WallGraph::new();
        let a = graph.create_node(0.0, 0.0);
        let shared = graph.create_node(100.0, 0.0);
        let c = graph.create_node(0.0, 5.0);
        let s1 = graph.create_segment(a, shared).unwrap();
        let s2 = graph.create_segment(shared, c).unwrap();
        graph.create_wall(WallType::Layout, &[s1]).unwrap();
        graph.create_wall(WallType::Layout, &[s2]).unwrap();

        let mut detector = enabled_detector();
        assert!(detector.scan(&graph, Instant::now()).is_empty());
    }

    #[test]
    fn test_crossing_geometry_is_not_a_merge() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 5.0), (10.0, 5.0)]);
        draw(&mut graph, &[(5.0, 0.0), (5.0, 10.0)]);
        let mut detector = enabled_detector();
        assert!(detector.scan(&graph, Instant::now()).is_empty());
    }

    #[test]
    fn test_hiding_a_wall_separates() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        let b = draw(&mut graph, &[(0.0, 5.0), (100.0, 5.0)]);
        let mut detector = enabled_detector();
        assert_eq!(detector.scan(&graph, Instant::now()).len(), 1);

        graph.update_wall(b, WallUpdate::visible(false));
        let events = detector.scan(&graph, Instant::now());
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_created());
    }

    #[test]
    fn test_deleted_wall_separates() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        let b = draw(&mut graph, &[(0.0, 5.0), (100.0, 5.0)]);
        let mut detector = enabled_detector();
        detector.scan(&graph, Instant::now());

        graph.delete_wall(b);
        let events = detector.scan(&graph, Instant::now());
        assert!(matches!(events.as_slice(), [MergeEvent::Separated(m)] if m.involves(b)));
    }

    #[test]
    fn test_tick_respects_interval() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        let moving = draw(&mut graph, &[(0.0, 30.0), (100.0, 30.0)]);
        let mut detector = enabled_detector();
        detector.set_scan_interval(Duration::from_millis(500));
        let start = Instant::now();

        assert!(detector.tick(&graph, start).is_empty());
        graph.translate_wall(moving, Vec2::new(0.0, -25.0)).unwrap();
        // Not due yet.
        assert!(detector.tick(&graph, start + Duration::from_millis(100)).is_empty());
        assert!(!detector.is_due(start + Duration::from_millis(499)));
        let events = detector.tick(&graph, start + Duration::from_millis(500));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_disable_clears_immediately() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        draw(&mut graph, &[(0.0, 5.0), (100.0, 5.0)]);
        draw(&mut graph, &[(0.0, -5.0), (100.0, -5.0)]);
        let mut detector = enabled_detector();
        detector.scan(&graph, Instant::now());
        assert_eq!(detector.merge_count(), 3);

        let events = detector.disable();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| !e.is_created()));
        assert_eq!(detector.merge_count(), 0);
        // A tick the host had already scheduled does nothing.
        assert!(detector.tick(&graph, Instant::now()).is_empty());
        assert!(detector.disable().is_empty());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let mut graph = WallGraph::new();
        draw(&mut graph, &[(0.0, 0.0), (100.0, 0.0)]);
        draw(&mut graph, &[(0.0, 18.0), (100.0, 18.0)]);
        let mut detector = enabled_detector();
        assert!(detector.scan(&graph, Instant::now()).is_empty());
        detector.set_threshold(20.0);
        assert_eq!(detector.scan(&graph, Instant::now()).len(), 1);
    }
}
