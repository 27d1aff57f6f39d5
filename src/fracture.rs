//! Per-bone fracture geometry: break location, fragment angles and damage type.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::anatomy::Bone;
use crate::axis::BoneAxis;
use crate::config::GeometryPolicy;
use crate::detection::DetectionBox;
use crate::errors::GeometryError;
use crate::geometry::{inclination, normalize_degrees, Point};
use crate::severity::Severity;

/// Kind of damage inferred for a bone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    /// Fragments remain aligned.
    Crack,
    /// Fragments are separated with mild angulation.
    Complete,
    /// The bone is broken into several pieces.
    Comminuted,
    /// Fragments are strongly angulated relative to each other.
    Displaced,
}

impl DamageType {
    /// Lower-case name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            DamageType::Crack => "crack",
            DamageType::Complete => "complete",
            DamageType::Comminuted => "comminuted",
            DamageType::Displaced => "displaced",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured description of the fracture of one bone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractureDescriptor {
    /// Bone the fracture belongs to.
    pub bone: Bone,
    /// Damage type.
    pub damage: DamageType,
    /// Break position along the head-to-tail axis in `[0, 1]`.
    pub location: f64,
    /// Angle of the head fragment from image-up in degrees, clockwise positive.
    pub top_angle: f64,
    /// Angle of the tail fragment from image-up in degrees, clockwise positive.
    pub bottom_angle: f64,
    /// Severity tier, absent until the descriptor has been classified.
    pub severity: Option<Severity>,
}

impl FractureDescriptor {
    /// Angle between the two fragments in degrees, in `[0, 90]`.
    #[must_use]
    pub fn angular_deviation(&self) -> f64 {
        let difference = normalize_degrees(self.top_angle - self.bottom_angle).abs();
        if difference > 90.0 {
            180.0 - difference
        } else {
            difference
        }
    }

    /// Copy of this descriptor carrying `severity`.
    #[must_use]
    pub const fn with_severity(self, severity: Severity) -> Self {
        Self {
            severity: Some(severity),
            ..self
        }
    }
}

/// Derive the fracture of one bone from its axis and an optional detection.
///
/// Without a detection whose centre lies in the bone's region, the break is
/// placed at [`GeometryPolicy::fallback_location`] on the axis.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateAxis`] when head and tail coincide or
/// the axis length overflows.
///
/// # Examples
/// ```
/// use fracturex::{compute, point, Bone, BoneAxis, DamageType, GeometryPolicy};
///
/// let axis = BoneAxis::new(Bone::Ulna, point(100.0, 200.0), point(100.0, 400.0));
/// let fracture = compute(&axis, None, &GeometryPolicy::default()).expect("valid axis");
/// assert_eq!(fracture.location, 0.5);
/// assert_eq!(fracture.damage, DamageType::Crack);
/// assert!(fracture.severity.is_none());
/// ```
pub fn compute(
    axis: &BoneAxis,
    detection: Option<&DetectionBox>,
    policy: &GeometryPolicy,
) -> Result<FractureDescriptor, GeometryError> {
    let detections: Vec<&DetectionBox> = detection.into_iter().collect();
    compute_with_detections(axis, &detections, policy)
}

/// Derive the fracture of one bone from every detection associated with it.
///
/// The most confident detection centred inside the bone region marks the
/// break; the number of detections decides whether the fracture is comminuted.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateAxis`] when head and tail coincide or
/// the axis length overflows.
pub fn compute_with_detections(
    axis: &BoneAxis,
    detections: &[&DetectionBox],
    policy: &GeometryPolicy,
) -> Result<FractureDescriptor, GeometryError> {
    if axis.is_degenerate() {
        return Err(GeometryError::DegenerateAxis(axis.bone));
    }

    let region = axis.region(policy.region_padding);
    let primary = detections
        .iter()
        .copied()
        .filter(|detection| region.contains(detection.center()))
        .fold(None::<&DetectionBox>, |best, candidate| match best {
            Some(best) if best.confidence >= candidate.confidence => Some(best),
            _ => Some(candidate),
        });

    let (break_point, location) = match primary {
        Some(detection) => {
            let center = detection.center();
            let t = axis
                .parameter_of(center)
                .ok_or(GeometryError::DegenerateAxis(axis.bone))?;
            (center, t.clamp(0.0, 1.0))
        }
        None => {
            debug!(
                "{}: no detection inside bone region, assuming break at {}",
                axis.bone, policy.fallback_location
            );
            (
                axis.point_at(policy.fallback_location),
                policy.fallback_location,
            )
        }
    };

    let mut descriptor = FractureDescriptor {
        bone: axis.bone,
        damage: DamageType::Crack,
        location,
        top_angle: fragment_angle(axis.head, break_point),
        bottom_angle: fragment_angle(break_point, axis.tail),
        severity: None,
    };
    descriptor.damage = damage_type(descriptor.angular_deviation(), detections.len(), policy);
    Ok(descriptor)
}

/// Angle of the fragment from `start` to `end`.
fn fragment_angle(start: Point, end: Point) -> f64 {
    inclination(end.to_vector() - start.to_vector())
}

/// Damage type for a fragment deviation and number of detections on the bone.
#[must_use]
pub fn damage_type(deviation: f64, detections: usize, policy: &GeometryPolicy) -> DamageType {
    if detections >= policy.comminuted_min_detections {
        DamageType::Comminuted
    } else if deviation < policy.crack_max_deviation {
        DamageType::Crack
    } else if deviation <= policy.displaced_min_deviation {
        DamageType::Complete
    } else {
        DamageType::Displaced
    }
}
