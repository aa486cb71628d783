//! Meshing thresholds
//!
//! Defaults were tuned by hand for interactive use and have no physical
//! derivation.

use serde::{Deserialize, Serialize};

/// Configuration for the connectivity engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Max |distance - ideal| for snapping a dragged gear into mesh
    pub snap_threshold: f64,
    /// Pairs closer than this to ideal are left where they are while dragging
    pub snap_floor: f64,
    /// Max |distance - ideal| for the authoritative graph rebuild
    pub mesh_threshold: f64,
    /// Centres closer than `overlap_ratio * ideal` overlap
    pub overlap_ratio: f64,
    /// Max module difference for two gears to be compatible
    pub module_tolerance: f64,
    /// An incompatible flag is kept until the pair is this far from ideal
    pub incompatible_hysteresis: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            snap_threshold: 5.0,
            snap_floor: 0.1,
            mesh_threshold: 3.0,
            overlap_ratio: 0.9,
            module_tolerance: 0.001,
            incompatible_hysteresis: 10.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set snap threshold (builder pattern)
    pub fn with_snap_threshold(mut self, threshold: f64) -> Self {
        self.snap_threshold = threshold.max(0.0);
        self
    }

    pub fn with_snap_floor(mut self, floor: f64) -> Self {
        self.snap_floor = floor.max(0.0);
        self
    }

    pub fn with_mesh_threshold(mut self, threshold: f64) -> Self {
        self.mesh_threshold = threshold.max(0.0);
        self
    }

    /// Set overlap ratio, limited to (0, 1]
    pub fn with_overlap_ratio(mut self, ratio: f64) -> Self {
        self.overlap_ratio = ratio.clamp(f64::EPSILON, 1.0);
        self
    }

    pub fn with_module_tolerance(mut self, tolerance: f64) -> Self {
        self.module_tolerance = tolerance.max(0.0);
        self
    }

    pub fn with_incompatible_hysteresis(mut self, margin: f64) -> Self {
        self.incompatible_hysteresis = margin.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "mesh_threshold": 1.5 }"#).unwrap();
        assert_eq!(config.mesh_threshold, 1.5);
        assert_eq!(config.snap_threshold, 5.0);
        assert_eq!(config.overlap_ratio, 0.9);
    }

    #[test]
    fn test_builder_limits() {
        let config = EngineConfig::new()
            .with_overlap_ratio(3.0)
            .with_mesh_threshold(-1.0);
        assert_eq!(config.overlap_ratio, 1.0);
        assert_eq!(config.mesh_threshold, 0.0);
    }
}
