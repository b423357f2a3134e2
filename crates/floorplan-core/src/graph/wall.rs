//! Walls: typed aggregates of segments.

use super::{SegmentId, WallId};
use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

/// Wall category. Thickness is always derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WallType {
    /// Structural layout wall.
    #[default]
    Layout,
    /// Zone partition.
    Zone,
    /// Area outline.
    Area,
}

impl WallType {
    /// Every wall type, heaviest first.
    pub const ALL: [WallType; 3] = [WallType::Layout, WallType::Zone, WallType::Area];

    /// Thickness in model units.
    pub fn thickness(self) -> f64 {
        match self {
            WallType::Layout => 350.0,
            WallType::Zone => 250.0,
            WallType::Area => 150.0,
        }
    }
}

/// Partial update applied by `WallGraph::update_wall`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallUpdate {
    pub wall_type: Option<WallType>,
    pub visible: Option<bool>,
}

impl WallUpdate {
    pub fn wall_type(wall_type: WallType) -> Self {
        Self {
            wall_type: Some(wall_type),
            ..Self::default()
        }
    }

    pub fn visible(visible: bool) -> Self {
        Self {
            visible: Some(visible),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wall_type.is_none() && self.visible.is_none()
    }
}

/// A drawn wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub(crate) id: WallId,
    pub(crate) wall_type: WallType,
    /// Segment ids in drawing order; order carries no topological meaning.
    pub(crate) segment_ids: Vec<SegmentId>,
    pub(crate) visible: bool,
    /// Unix milliseconds.
    pub(crate) created_at: u64,
    /// Unix milliseconds, strictly increasing on every mutation.
    pub(crate) updated_at: u64,
}

impl Wall {
    pub(crate) fn new(wall_type: WallType, segment_ids: Vec<SegmentId>) -> Self {
        let now = now_millis();
        Self {
            id: WallId::new(),
            wall_type,
            segment_ids,
            visible: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> WallId {
        self.id
    }

    pub fn wall_type(&self) -> WallType {
        self.wall_type
    }

    pub fn thickness(&self) -> f64 {
        self.wall_type.thickness()
    }

    pub fn segment_ids(&self) -> &[SegmentId] {
        &self.segment_ids
    }

    pub fn contains_segment(&self, segment: SegmentId) -> bool {
        self.segment_ids.contains(&segment)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    /// Bump `updated_at`, never going backwards even if the clock does.
    pub(crate) fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at + 1);
    }

    /// Apply a partial update. Returns whether anything changed.
    pub(crate) fn apply(&mut self, update: WallUpdate) -> bool {
        let mut changed = false;
        if let Some(wall_type) = update.wall_type {
            if wall_type != self.wall_type {
                self.wall_type = wall_type;
                changed = true;
            }
        }
        if let Some(visible) = update.visible {
            if visible != self.visible {
                self.visible = visible;
                changed = true;
            }
        }
        if changed {
            self.touch();
        }
        changed
    }

    pub(crate) fn push_segment(&mut self, segment: SegmentId) -> bool {
        if self.segment_ids.contains(&segment) {
            return false;
        }
        self.segment_ids.push(segment);
        true
    }

    pub(crate) fn remove_segment(&mut self, segment: SegmentId) -> bool {
        let before = self.segment_ids.len();
        self.segment_ids.retain(|&id| id != segment);
        self.segment_ids.len() != before
    }

    /// Replace `original` in place with `replacements`, keeping chain order.
    pub(crate) fn replace_segment(&mut self, original: SegmentId, replacements: &[SegmentId]) {
        match self.segment_ids.iter().position(|&id| id == original) {
            Some(pos) => {
                self.segment_ids.remove(pos);
                for (offset, &id) in replacements.iter().enumerate() {
                    self.segment_ids.insert(pos + offset, id);
                }
            }
            None => self.segment_ids.extend_from_slice(replacements),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
