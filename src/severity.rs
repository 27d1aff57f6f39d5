//! Ordered threshold rules mapping fracture geometry to a severity tier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SeverityPolicy;
use crate::fracture::{DamageType, FractureDescriptor};

/// Severity tier, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Aligned fragments with low detector confidence.
    Mild,
    /// Neither mild nor severe.
    Moderate,
    /// Comminuted or strongly angulated.
    Severe,
}

impl Severity {
    /// Lower-case name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a fracture given the confidence of the detection that confirmed it.
///
/// Rules are applied in order and the first match wins:
///
/// 1. comminuted, or deviation at or above the severe threshold: severe;
/// 2. confidence and deviation both below the mild thresholds: mild;
/// 3. otherwise moderate.
///
/// Values exactly on a threshold take the higher tier, and a NaN confidence
/// never yields mild.
///
/// # Examples
/// ```
/// use fracturex::{classify, compute, point, Bone, BoneAxis, EngineConfig, Severity};
///
/// let config = EngineConfig::default();
/// let axis = BoneAxis::new(Bone::Radius, point(150.0, 210.0), point(170.0, 410.0));
/// let fracture = compute(&axis, None, &config.geometry).expect("valid axis");
/// assert_eq!(classify(&fracture, 0.3, &config.severity), Severity::Mild);
/// assert_eq!(classify(&fracture, 0.9, &config.severity), Severity::Moderate);
/// ```
#[must_use]
pub fn classify(
    descriptor: &FractureDescriptor,
    detection_confidence: f64,
    policy: &SeverityPolicy,
) -> Severity {
    let deviation = descriptor.angular_deviation();
    if descriptor.damage == DamageType::Comminuted || deviation >= policy.severe_min_deviation {
        Severity::Severe
    } else if detection_confidence < policy.mild_max_confidence
        && deviation < policy.mild_max_deviation
    {
        Severity::Mild
    } else {
        Severity::Moderate
    }
}
