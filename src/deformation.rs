//! Renderer parameters describing how to deform a reference bone model.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::anatomy::Bone;
use crate::config::DeformationPolicy;
use crate::errors::GeometryError;
use crate::fracture::FractureDescriptor;
use crate::fusion::AnalysisReport;
use crate::severity::Severity;

/// Hinge, rotation and gap values for one bone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeformationParams {
    /// Bone the parameters apply to.
    pub bone: Bone,
    /// Split position measured from the head end, in `[0, 1]`.
    pub hinge_position: f64,
    /// Rotation of the head fragment in degrees, clockwise positive.
    pub rotation_top: f64,
    /// Rotation of the tail fragment in degrees, clockwise positive.
    pub rotation_bottom: f64,
    /// Separation between fragments as a fraction of bone length.
    pub gap: f64,
}

/// Derive renderer parameters from a classified fracture.
///
/// Rotations are copied from the fragment angles unchanged. The gap is zero
/// for mild fractures and grows with both severity tier and fragment deviation.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidSeverity`] when the descriptor has not been
/// classified yet.
///
/// # Examples
/// ```
/// use fracturex::{map, point, Bone, BoneAxis, compute, EngineConfig, Severity};
///
/// let config = EngineConfig::default();
/// let axis = BoneAxis::new(Bone::Ulna, point(100.0, 200.0), point(120.0, 400.0));
/// let fracture = compute(&axis, None, &config.geometry).expect("valid axis");
/// assert!(map(&fracture, &config.deformation).is_err());
///
/// let params = map(&fracture.with_severity(Severity::Mild), &config.deformation)
///     .expect("classified fracture");
/// assert_eq!(params.hinge_position, 0.5);
/// assert_eq!(params.gap, 0.0);
/// ```
pub fn map(
    descriptor: &FractureDescriptor,
    policy: &DeformationPolicy,
) -> Result<DeformationParams, GeometryError> {
    let severity = descriptor
        .severity
        .ok_or(GeometryError::InvalidSeverity(descriptor.bone))?;
    let base = match severity {
        Severity::Mild => 0.0,
        Severity::Moderate => policy.moderate_gap,
        Severity::Severe => policy.severe_gap,
    };
    let spread = if policy.deviation_scale > 0.0 {
        descriptor.angular_deviation() / policy.deviation_scale
    } else {
        0.0
    };
    Ok(DeformationParams {
        bone: descriptor.bone,
        hinge_position: descriptor.location,
        rotation_top: descriptor.top_angle,
        rotation_bottom: descriptor.bottom_angle,
        gap: (base * (1.0 + spread)).max(0.0),
    })
}

/// Derive renderer parameters for every fracture of a report.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidSeverity`] for the first unclassified fracture.
pub fn map_report(
    report: &AnalysisReport,
    policy: &DeformationPolicy,
) -> Result<Vec<DeformationParams>, GeometryError> {
    report
        .fractures
        .iter()
        .map(|fracture| map(fracture, policy))
        .collect()
}

/// Apply deformation parameters to the vertices of a reference bone model.
///
/// The model is expected upright: `y` up with the head at the largest `y`.
/// Vertices at or above the hinge height form the head fragment, the rest the
/// tail fragment. Each fragment is rotated about the `z` axis through its own
/// centre on the hinge plane (clockwise as seen from `+z` for positive
/// angles), then the fragments are pushed apart along `y` by `gap` times the
/// model height.
#[must_use]
pub fn deform_vertices(vertices: &[Vector3<f64>], params: &DeformationParams) -> Vec<Vector3<f64>> {
    let Some((min_y, max_y)) = vertical_extent(vertices) else {
        return Vec::new();
    };
    let height = max_y - min_y;
    let hinge_y = max_y - height * params.hinge_position;
    let in_top: Vec<bool> = vertices.iter().map(|vertex| vertex.y >= hinge_y).collect();

    let top_pivot = fragment_pivot(vertices, &in_top, true, hinge_y);
    let bottom_pivot = fragment_pivot(vertices, &in_top, false, hinge_y);
    let top_rotation = clockwise_about_z(params.rotation_top);
    let bottom_rotation = clockwise_about_z(params.rotation_bottom);
    let half_gap = Vector3::new(0.0, params.gap * height / 2.0, 0.0);

    vertices
        .iter()
        .zip(&in_top)
        .map(|(vertex, &top)| {
            if top {
                top_rotation * (vertex - top_pivot) + top_pivot + half_gap
            } else {
                bottom_rotation * (vertex - bottom_pivot) + bottom_pivot - half_gap
            }
        })
        .collect()
}

/// Smallest and largest `y` of the vertex cloud.
fn vertical_extent(vertices: &[Vector3<f64>]) -> Option<(f64, f64)> {
    vertices.iter().fold(None, |extent, vertex| match extent {
        None => Some((vertex.y, vertex.y)),
        Some((low, high)) => Some((low.min(vertex.y), high.max(vertex.y))),
    })
}

/// Mean `x`/`z` of one fragment, placed on the hinge plane.
fn fragment_pivot(
    vertices: &[Vector3<f64>],
    in_top: &[bool],
    top: bool,
    hinge_y: f64,
) -> Vector3<f64> {
    let (sum, count) = vertices
        .iter()
        .zip(in_top)
        .filter(|(_, &is_top)| is_top == top)
        .fold((Vector3::zeros(), 0_usize), |(sum, count), (vertex, _)| {
            (sum + vertex, count + 1)
        });
    let mean = if count > 0 { sum / count as f64 } else { sum };
    Vector3::new(mean.x, hinge_y, mean.z)
}

/// Rotation about `z` that turns clockwise when viewed from `+z`.
fn clockwise_about_z(degrees: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), -degrees.to_radians())
}
