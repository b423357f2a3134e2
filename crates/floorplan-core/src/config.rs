//! Engine configuration.
//!
//! All tolerances are policy defaults rather than invariants. Hosts can
//! override them from a JSON document, e.g.
//!
//! ```json
//! { "selection_tolerance": 6.0, "proximity": { "threshold": 20.0 } }
//! ```

use crate::error::{TopologyError, TopologyResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Radius (model units) inside which a crossing reuses an existing node.
pub const DEFAULT_INTERSECTION_EPSILON: f64 = 1e-6;
/// Default hit-test radius for `find_wall_at_point`.
pub const DEFAULT_SELECTION_TOLERANCE: f64 = 10.0;
/// Default distance below which two walls are considered merged.
pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 15.0;
/// Default cadence of proximity scans in milliseconds.
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 500;

/// Top-level configuration for the topology engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Node dedup radius used by the intersection resolver and by drawing.
    pub intersection_epsilon: f64,
    /// Initial hit-test radius of the spatial query service.
    pub selection_tolerance: f64,
    /// Segments shorter than this are rejected as zero-length.
    pub min_segment_length: f64,
    /// Upper bound on split steps for a single resolve pass.
    pub max_resolve_iterations: usize,
    /// Maximum number of undo snapshots kept by the facade.
    pub undo_depth: usize,
    /// Proximity merge detector settings.
    pub proximity: ProximityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intersection_epsilon: DEFAULT_INTERSECTION_EPSILON,
            selection_tolerance: DEFAULT_SELECTION_TOLERANCE,
            min_segment_length: 1e-9,
            max_resolve_iterations: 10_000,
            undo_depth: 50,
            proximity: ProximityConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> TopologyResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TopologyError::Config(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check that every tolerance is finite and non-negative.
    pub fn validate(&self) -> TopologyResult<()> {
        check_tolerance("intersection_epsilon", self.intersection_epsilon)?;
        check_tolerance("selection_tolerance", self.selection_tolerance)?;
        check_tolerance("min_segment_length", self.min_segment_length)?;
        if self.max_resolve_iterations == 0 {
            return Err(TopologyError::Config(
                "max_resolve_iterations must be positive".to_string(),
            ));
        }
        self.proximity.validate()
    }
}

/// Settings for the proximity merge detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Whether the detector starts enabled.
    pub enabled: bool,
    /// Distance below which two walls are merged.
    pub threshold: f64,
    /// Minimum time between two scans, in milliseconds.
    pub scan_interval_ms: u64,
    /// Maximum angle (degrees) between segments still treated as parallel.
    pub parallel_tolerance_deg: f64,
    /// Maximum deviation (degrees) from 90° still treated as perpendicular.
    pub perpendicular_tolerance_deg: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_PROXIMITY_THRESHOLD,
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            parallel_tolerance_deg: 10.0,
            perpendicular_tolerance_deg: 10.0,
        }
    }
}

impl ProximityConfig {
    /// Scan interval as a `Duration`.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    fn validate(&self) -> TopologyResult<()> {
        check_tolerance("proximity.threshold", self.threshold)?;
        check_tolerance("proximity.parallel_tolerance_deg", self.parallel_tolerance_deg)?;
        check_tolerance(
            "proximity.perpendicular_tolerance_deg",
            self.perpendicular_tolerance_deg,
        )?;
        if self.scan_interval_ms == 0 {
            return Err(TopologyError::Config(
                "proximity.scan_interval_ms must be positive".to_string(),
            ));
        }
        if self.parallel_tolerance_deg + self.perpendicular_tolerance_deg > 90.0 {
            return Err(TopologyError::Config(
                "parallel and perpendicular tolerances overlap".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_tolerance(name: &str, value: f64) -> TopologyResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TopologyError::Config(format!(
            "{} must be a finite, non-negative number (got {})",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!((config.intersection_epsilon - 1e-6).abs() < f64::EPSILON);
        assert!((config.selection_tolerance - 10.0).abs() < f64::EPSILON);
        assert!((config.proximity.threshold - 15.0).abs() < f64::EPSILON);
        assert!(!config.proximity.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json(r#"{ "proximity": { "threshold": 20.0 } }"#).unwrap();
        assert!((config.proximity.threshold - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.proximity.scan_interval_ms, DEFAULT_SCAN_INTERVAL_MS);
        assert!((config.selection_tolerance - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let err = EngineConfig::from_json(r#"{ "selection_tolerance": -1.0 }"#).unwrap_err();
        assert!(matches!(err, TopologyError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err =
            EngineConfig::from_json(r#"{ "proximity": { "scan_interval_ms": 0 } }"#).unwrap_err();
        assert!(matches!(err, TopologyError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(EngineConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
