//! Neurovascular structures at risk for a classified fracture.
//!
//! The tables follow the usual forearm and lower-leg anatomy: nerve injury is
//! more common near the proximal end of a bone, vascular injury near the distal
//! end, and the middle third exposes both.

use serde::{Deserialize, Serialize};

use crate::anatomy::{Bone, BonePair};
use crate::errors::GeometryError;
use crate::fracture::{DamageType, FractureDescriptor};
use crate::severity::Severity;

/// Third of the bone containing the break.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Location below 0.3.
    Proximal,
    /// Location from 0.3 to 0.7.
    Middle,
    /// Location above 0.7.
    Distal,
}

impl Zone {
    /// Zone for a break location along the head-to-tail axis.
    #[must_use]
    pub fn from_location(location: f64) -> Self {
        if location < 0.3 {
            Zone::Proximal
        } else if location <= 0.7 {
            Zone::Middle
        } else {
            Zone::Distal
        }
    }
}

/// Likelihood of neurovascular compromise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Mild fractures.
    Low,
    /// Moderate fractures; monitor closely.
    Moderate,
    /// Severe fractures.
    High,
}

impl From<Severity> for RiskLevel {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Mild => RiskLevel::Low,
            Severity::Moderate => RiskLevel::Moderate,
            Severity::Severe => RiskLevel::High,
        }
    }
}

/// Structures most likely affected by one fracture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    /// Bone assessed.
    pub bone: Bone,
    /// Third of the bone containing the break.
    pub zone: Zone,
    /// Overall risk level.
    pub level: RiskLevel,
    /// Nerves and vessels at risk, most relevant first.
    pub structures: Vec<&'static str>,
}

/// Nerves running alongside each bone.
const fn nerves(bone: Bone) -> &'static [&'static str] {
    match bone {
        Bone::Radius => &["superficial radial nerve"],
        Bone::Ulna => &["ulnar nerve"],
        Bone::Tibia => &["tibial nerve"],
        Bone::Fibula => &["common fibular nerve"],
    }
}

/// Vessels running alongside each bone.
const fn vessels(bone: Bone) -> &'static [&'static str] {
    match bone {
        Bone::Radius => &["radial artery"],
        Bone::Ulna => &["ulnar artery"],
        Bone::Tibia => &["anterior tibial artery", "posterior tibial artery"],
        Bone::Fibula => &["fibular artery"],
    }
}

/// Assess which structures a classified fracture endangers.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidSeverity`] when the descriptor has not been
/// classified yet.
pub fn assess(descriptor: &FractureDescriptor) -> Result<RiskAssessment, GeometryError> {
    let severity = descriptor
        .severity
        .ok_or(GeometryError::InvalidSeverity(descriptor.bone))?;
    let zone = Zone::from_location(descriptor.location);

    let mut structures: Vec<&'static str> = match zone {
        Zone::Proximal => nerves(descriptor.bone).to_vec(),
        Zone::Distal => vessels(descriptor.bone).to_vec(),
        Zone::Middle => {
            let mut both = vessels(descriptor.bone).to_vec();
            both.extend_from_slice(nerves(descriptor.bone));
            both
        }
    };
    let disrupted = matches!(
        descriptor.damage,
        DamageType::Displaced | DamageType::Comminuted
    );
    if severity == Severity::Severe && disrupted && descriptor.bone.pair() == BonePair::Forearm {
        structures.push("median nerve");
    }

    Ok(RiskAssessment {
        bone: descriptor.bone,
        zone,
        level: severity.into(),
        structures,
    })
}
