//! Classification policy: every threshold the engine applies, with defaults.
//!
//! The values are clinical policy rather than physics, so they live here instead
//! of inside the geometry code and can be overridden from a JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Thresholds used when deriving fracture geometry and damage type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryPolicy {
    /// Break location assumed when no detection confirms one.
    pub fallback_location: f64,
    /// Pixels added around a bone's head/tail bounding box to form its region.
    pub region_padding: f64,
    /// Deviations strictly below this many degrees are cracks.
    pub crack_max_deviation: f64,
    /// Deviations strictly above this many degrees are displaced fractures.
    pub displaced_min_deviation: f64,
    /// Number of detections on one bone that makes a fracture comminuted.
    pub comminuted_min_detections: usize,
}

impl Default for GeometryPolicy {
    fn default() -> Self {
        Self {
            fallback_location: 0.5,
            region_padding: 25.0,
            crack_max_deviation: 5.0,
            displaced_min_deviation: 25.0,
            comminuted_min_detections: 2,
        }
    }
}

/// Thresholds for the ordered severity rules.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    /// Deviations at or above this many degrees are severe.
    pub severe_min_deviation: f64,
    /// Confidences strictly below this may be classified mild.
    pub mild_max_confidence: f64,
    /// Deviations strictly below this many degrees may be classified mild.
    pub mild_max_deviation: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            severe_min_deviation: 40.0,
            mild_max_confidence: 0.5,
            mild_max_deviation: 10.0,
        }
    }
}

/// Settings for reconciling detector output with landmark geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionPolicy {
    /// Confidence reported for a geometry-only, unconfirmed estimate.
    pub unconfirmed_confidence: f64,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            unconfirmed_confidence: 0.3,
        }
    }
}

/// Scale factors for renderer deformation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformationPolicy {
    /// Base fragment gap for moderate fractures, as a fraction of bone length.
    pub moderate_gap: f64,
    /// Base fragment gap for severe fractures, as a fraction of bone length.
    pub severe_gap: f64,
    /// Deviation in degrees at which the base gap doubles.
    pub deviation_scale: f64,
}

impl Default for DeformationPolicy {
    fn default() -> Self {
        Self {
            moderate_gap: 0.02,
            severe_gap: 0.05,
            deviation_scale: 90.0,
        }
    }
}

/// Complete engine configuration.
///
/// # Examples
/// ```
/// use fracturex::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{"fusion": {"unconfirmed_confidence": 0.25}}"#)
///     .expect("valid config");
/// assert_eq!(config.fusion.unconfirmed_confidence, 0.25);
/// assert_eq!(config.geometry.fallback_location, 0.5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Geometry and damage-type policy.
    pub geometry: GeometryPolicy,
    /// Severity rules.
    pub severity: SeverityPolicy,
    /// Fusion fallback policy.
    pub fusion: FusionPolicy,
    /// Deformation scaling.
    pub deformation: DeformationPolicy,
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `json` is not a valid configuration.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Load an [`EngineConfig`] from a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] when the file cannot be read and
/// [`ConfigError::Parse`] when its content is not a valid configuration.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    EngineConfig::from_json_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("valid config");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = EngineConfig::from_json_str(r#"{"severity": {"severe_min_deviation": 30}}"#)
            .expect("valid config");
        assert_eq!(config.severity.severe_min_deviation, 30.0);
        assert_eq!(config.severity.mild_max_confidence, 0.5);
    }

    #[test]
    fn missing_file_reports_path() {
        let path = Path::new("/nonexistent/fracturex-policy.json");
        let error = load_config(path).expect_err("file does not exist");
        assert!(matches!(error, ConfigError::Read { .. }));
        assert!(error.to_string().contains("fracturex-policy.json"));
    }
}
