//! Intersection resolution for freshly drawn walls.
//!
//! Every segment of the new wall is checked against every segment it does
//! not already share a node with, including the wall's own non-adjacent
//! links, so a self-crossing polyline is resolved too. Each crossing gets a
//! shared node and both segments are split there. Resolution is best effort: a pair that cannot
//! be split is skipped and reported, and the wall stays in the graph.

use crate::config::EngineConfig;
use crate::error::{TopologyError, TopologyResult};
use crate::geometry::segment_intersection;
use crate::graph::{NodeId, Segment, SegmentId, WallGraph, WallId};
use kurbo::Point;
use std::collections::{HashSet, VecDeque};

/// Outcome of resolving one wall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    /// Nodes where crossings were resolved, in resolution order.
    pub crossings: Vec<NodeId>,
    /// Number of segment splits performed.
    pub splits: usize,
    /// Recoverable geometric errors; the affected pairs were left as is.
    pub errors: Vec<TopologyError>,
}

impl ResolveReport {
    /// True when every detected crossing was resolved.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another wall's report into this one.
    pub fn merge(&mut self, other: ResolveReport) {
        for node in other.crossings {
            if !self.crossings.contains(&node) {
                self.crossings.push(node);
            }
        }
        self.splits += other.splits;
        self.errors.extend(other.errors);
    }
}

/// The nearest crossing along a segment.
#[derive(Debug, Clone, Copy)]
struct Hit {
    other: SegmentId,
    /// `other` belongs to the wall being resolved.
    own: bool,
    point: Point,
    t: f64,
}

/// Result of splitting one crossing.
#[derive(Debug, Clone, Copy)]
struct Split {
    node: NodeId,
    /// Part of the resolved segment still to be checked.
    remainder: SegmentId,
    /// Halves of the other segment, if it was split.
    other_halves: Option<(SegmentId, SegmentId)>,
    splits: usize,
}

/// Splits crossing segments and inserts intersection nodes.
#[derive(Debug, Clone, Copy)]
pub struct IntersectionResolver {
    epsilon: f64,
    max_iterations: usize,
}

impl Default for IntersectionResolver {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl IntersectionResolver {
    pub fn new(epsilon: f64, max_iterations: usize) -> Self {
        Self {
            epsilon,
            max_iterations,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.intersection_epsilon, config.max_resolve_iterations)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Resolve every crossing between `wall_id`'s segments and the rest of
    /// the graph.
    ///
    /// Segments are processed in chain order; along each one the nearest
    /// crossing is resolved first, then the remainder is re-checked, so a
    /// segment crossing several others ends up split at each of them.
    pub fn resolve_wall(&self, graph: &mut WallGraph, wall_id: WallId) -> ResolveReport {
        let mut report = ResolveReport::default();
        let mut queue: VecDeque<SegmentId> = match graph.get_wall(wall_id) {
            Some(wall) => wall.segment_ids().iter().copied().collect(),
            None => {
                report.errors.push(TopologyError::WallNotFound(wall_id));
                return report;
            }
        };
        let mut skipped: HashSet<(SegmentId, SegmentId)> = HashSet::new();
        let mut steps = 0usize;

        while let Some(seg_id) = queue.pop_front() {
            let view: &WallGraph = graph;
            let Some(hit) = view
                .get_segment(seg_id)
                .and_then(|seg| self.nearest_hit(view, seg, wall_id, &skipped))
            else {
                continue;
            };

            steps += 1;
            if steps > self.max_iterations {
                log::warn!(
                    "Giving up on wall {} after {} split steps",
                    wall_id,
                    self.max_iterations
                );
                report.errors.push(TopologyError::Degenerate(format!(
                    "resolution of wall {} exceeded {} steps",
                    wall_id, self.max_iterations
                )));
                break;
            }

            match self.apply_hit(graph, seg_id, hit) {
                Ok(split) => {
                    if !report.crossings.contains(&split.node) {
                        report.crossings.push(split.node);
                    }
                    report.splits += split.splits;
                    queue.push_front(split.remainder);
                    // Halves of our own segment still need their own pass.
                    if let Some((first, second)) = split.other_halves.filter(|_| hit.own) {
                        queue.push_back(first);
                        queue.push_back(second);
                    }
                }
                Err(err) => {
                    log::warn!(
                        "Skipping crossing of {} and {} at ({:.3}, {:.3}): {}",
                        seg_id,
                        hit.other,
                        hit.point.x,
                        hit.point.y,
                        err
                    );
                    skipped.insert((seg_id, hit.other));
                    report.errors.push(err);
                    queue.push_front(seg_id);
                }
            }
        }

        if !report.crossings.is_empty() {
            log::debug!(
                "Resolved {} crossing(s) for wall {} with {} split(s)",
                report.crossings.len(),
                wall_id,
                report.splits
            );
        }
        report
    }

    /// Nearest crossing along `seg` with a segment it shares no node with.
    fn nearest_hit(
        &self,
        graph: &WallGraph,
        seg: &Segment,
        own_wall: WallId,
        skipped: &HashSet<(SegmentId, SegmentId)>,
    ) -> Option<Hit> {
        graph
            .segments()
            .filter(|other| {
                other.id() != seg.id()
                    && !seg.shares_node_with(other)
                    && !skipped.contains(&(seg.id(), other.id()))
            })
            .filter_map(|other| {
                let crossing = segment_intersection(
                    seg.start(),
                    seg.end(),
                    other.start(),
                    other.end(),
                    self.epsilon,
                )?;
                // Two endpoints meeting is a touch, not a crossing.
                if self.endpoint_at(seg, crossing.point).is_some()
                    && self.endpoint_at(other, crossing.point).is_some()
                {
                    return None;
                }
                Some(Hit {
                    other: other.id(),
                    own: other.wall_id() == Some(own_wall),
                    point: crossing.point,
                    t: crossing.t,
                })
            })
            .min_by(|a, b| a.t.total_cmp(&b.t).then_with(|| a.other.cmp(&b.other)))
    }

    /// The endpoint of `seg` within epsilon of `point`, if any.
    fn endpoint_at(&self, seg: &Segment, point: Point) -> Option<NodeId> {
        if seg.start().distance(point) <= self.epsilon {
            Some(seg.start_node_id())
        } else if seg.end().distance(point) <= self.epsilon {
            Some(seg.end_node_id())
        } else {
            None
        }
    }

    /// Split `seg_id` and `hit.other` at the crossing.
    ///
    /// All checks run before the first mutation, so a failure leaves the
    /// graph untouched.
    fn apply_hit(
        &self,
        graph: &mut WallGraph,
        seg_id: SegmentId,
        hit: Hit,
    ) -> TopologyResult<Split> {
        let seg = graph
            .get_segment(seg_id)
            .ok_or(TopologyError::SegmentNotFound(seg_id))?;
        let other = graph
            .get_segment(hit.other)
            .ok_or(TopologyError::SegmentNotFound(hit.other))?;
        let at_seg = self.endpoint_at(seg, hit.point);
        let at_other = self.endpoint_at(other, hit.point);

        let min_len = graph.min_segment_length();
        for (s, at) in [(seg, at_seg), (other, at_other)] {
            if at.is_none() {
                let shortest = s.start().distance(hit.point).min(hit.point.distance(s.end()));
                if shortest <= min_len {
                    return Err(TopologyError::ZeroLength(shortest));
                }
            }
        }

        let (node, created) = match (at_seg, at_other) {
            (Some(_), Some(_)) => {
                return Err(TopologyError::Degenerate(format!(
                    "segments {} and {} only touch at their endpoints",
                    seg_id, hit.other
                )));
            }
            (Some(node), None) | (None, Some(node)) => (node, false),
            (None, None) => match graph.find_node_near(hit.point, self.epsilon) {
                Some(node) => (node, false),
                None => (graph.create_crossing_node(hit.point), true),
            },
        };

        let split_seg = at_seg.is_none();
        let split_other = at_other.is_none();

        let remainder = if split_seg {
            match graph.split_segment(seg_id, node) {
                Ok((_, second)) => second,
                Err(err) => {
                    if created {
                        if let Err(cleanup) = graph.remove_node(node) {
                            log::warn!("Could not remove unused crossing node {}: {}", node, cleanup);
                        }
                    }
                    return Err(err);
                }
            }
        } else {
            seg_id
        };

        let other_halves = if split_other {
            // Cannot fail: the length check above already covered it and
            // `node` is not one of its endpoints.
            Some(graph.split_segment(hit.other, node)?)
        } else {
            None
        };

        log::debug!(
            "Crossing at ({:.3}, {:.3}) resolved on node {}",
            hit.point.x,
            hit.point.y,
            node
        );
        Ok(Split {
            node,
            remainder,
            other_halves,
            splits: usize::from(split_seg) + usize::from(split_other),
        })
    }
}
