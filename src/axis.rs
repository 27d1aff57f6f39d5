//! Grouping of clinician-placed landmarks into oriented bone axes.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::anatomy::{normalize_label, Bone, LandmarkLabel, Role};
use crate::errors::GeometryError;
use crate::geometry::{axis_vector, projection_parameter, Point, Rect};

/// A labeled point placed by the clinician on the radiograph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal pixel coordinate.
    pub x: f64,
    /// Vertical pixel coordinate.
    pub y: f64,
    /// Label from the supported vocabulary, e.g. `ulna_head`.
    pub label: String,
}

impl Landmark {
    /// Create a [`Landmark`].
    pub fn new(x: f64, y: f64, label: impl Into<String>) -> Self {
        Self {
            x,
            y,
            label: label.into(),
        }
    }

    /// Position of the landmark.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Segment from the head landmark of a bone to its tail landmark.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneAxis {
    /// Bone the axis belongs to.
    pub bone: Bone,
    /// Head landmark position.
    pub head: Point,
    /// Tail landmark position.
    pub tail: Point,
}

impl BoneAxis {
    /// Create a [`BoneAxis`].
    #[must_use]
    pub const fn new(bone: Bone, head: Point, tail: Point) -> Self {
        Self { bone, head, tail }
    }

    /// Vector from head to tail.
    #[must_use]
    pub fn vector(&self) -> Vector2<f64> {
        axis_vector(self.head, self.tail)
    }

    /// Distance between head and tail in pixels.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    /// Return `true` when head and tail coincide or lie so far apart that
    /// the squared length overflows.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.head == self.tail || !self.vector().norm_squared().is_finite()
    }

    /// Point at parameter `t` along the axis, `0` being the head.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point {
        self.head.lerp(self.tail, t)
    }

    /// Unclamped parameter of `point` projected on the axis.
    #[must_use]
    pub fn parameter_of(&self, point: Point) -> Option<f64> {
        projection_parameter(self.head, self.tail, point)
    }

    /// Bounding box of the axis grown by `padding` pixels on every side.
    #[must_use]
    pub fn region(&self, padding: f64) -> Rect {
        Rect::from_corners(self.head, self.tail).padded(padding)
    }

    /// The same segment traversed from tail to head.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self::new(self.bone, self.tail, self.head)
    }
}

/// Resolved axes keyed by bone, iterated in bone-name order.
pub type AxisMap = BTreeMap<Bone, BoneAxis>;

/// Outcome of landmark resolution including bones that could not be resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    /// Axes for every bone with both landmarks present.
    pub axes: AxisMap,
    /// One [`GeometryError::MissingLandmark`] per bone with a single landmark.
    pub incomplete: Vec<GeometryError>,
}

/// Group landmarks into bone axes, omitting bones that lack a head or tail.
///
/// # Errors
///
/// Returns [`GeometryError::UnknownLabel`] for labels outside the vocabulary,
/// [`GeometryError::NonFiniteCoordinate`] for NaN or infinite coordinates and
/// [`GeometryError::DuplicateLabel`] when a label is supplied twice.
///
/// # Examples
/// ```
/// use fracturex::{resolve, Bone, Landmark};
///
/// let axes = resolve(&[
///     Landmark::new(120.0, 400.0, "ulna_tail"),
///     Landmark::new(100.0, 200.0, "ulna_head"),
///     Landmark::new(150.0, 210.0, "radius_head"),
/// ])
/// .expect("valid landmarks");
/// assert!(axes.contains_key(&Bone::Ulna));
/// assert!(!axes.contains_key(&Bone::Radius));
/// ```
pub fn resolve(landmarks: &[Landmark]) -> Result<AxisMap, GeometryError> {
    resolve_detailed(landmarks).map(|resolution| resolution.axes)
}

/// Group landmarks into bone axes and report the bones that were omitted.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_detailed(landmarks: &[Landmark]) -> Result<Resolution, GeometryError> {
    let mut seen = HashSet::new();
    let mut ends: BTreeMap<Bone, (Option<Point>, Option<Point>)> = BTreeMap::new();

    for landmark in landmarks {
        let label = LandmarkLabel::parse(&landmark.label)
            .ok_or_else(|| GeometryError::UnknownLabel(normalize_label(&landmark.label)))?;
        let position = landmark.position();
        if !position.is_finite() {
            return Err(GeometryError::NonFiniteCoordinate {
                label: label.as_str().to_string(),
                x: landmark.x,
                y: landmark.y,
            });
        }
        if !seen.insert(label) {
            return Err(GeometryError::DuplicateLabel(label.as_str().to_string()));
        }
        let entry = ends.entry(label.bone).or_default();
        match label.role {
            Role::Head => entry.0 = Some(position),
            Role::Tail => entry.1 = Some(position),
        }
    }

    let mut resolution = Resolution::default();
    for (bone, pair) in ends {
        match pair {
            (Some(head), Some(tail)) => {
                resolution.axes.insert(bone, BoneAxis::new(bone, head, tail));
            }
            (None, _) => {
                debug!("omitting {bone}: no {} landmark", bone.head_label());
                resolution.incomplete.push(GeometryError::MissingLandmark {
                    bone,
                    label: bone.head_label().to_string(),
                });
            }
            (_, None) => {
                debug!("omitting {bone}: no {} landmark", bone.tail_label());
                resolution.incomplete.push(GeometryError::MissingLandmark {
                    bone,
                    label: bone.tail_label().to_string(),
                });
            }
        }
    }
    Ok(resolution)
}

/// Group landmarks into bone axes, requiring a complete pair for every bone in `required`.
///
/// # Errors
///
/// Returns [`GeometryError::MissingLandmark`] naming the first absent label of
/// a required bone (head before tail), plus every error of [`resolve`].
pub fn resolve_required(
    landmarks: &[Landmark],
    required: &[Bone],
) -> Result<AxisMap, GeometryError> {
    let axes = resolve(landmarks)?;
    for bone in required {
        if axes.contains_key(bone) {
            continue;
        }
        let has_head = landmarks
            .iter()
            .filter_map(|landmark| LandmarkLabel::parse(&landmark.label))
            .any(|label| label.bone == *bone && label.role == Role::Head);
        let label = if has_head {
            bone.tail_label()
        } else {
            bone.head_label()
        };
        return Err(GeometryError::MissingLandmark {
            bone: *bone,
            label: label.to_string(),
        });
    }
    Ok(axes)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;

    fn forearm() -> Vec<Landmark> {
        vec![
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(120.0, 400.0, "ulna_tail"),
            Landmark::new(150.0, 210.0, "radius_head"),
            Landmark::new(170.0, 410.0, "radius_tail"),
        ]
    }

    #[test]
    fn resolves_complete_pairs_regardless_of_order() {
        let mut landmarks = forearm();
        landmarks.reverse();
        let axes = resolve(&landmarks).expect("valid landmarks");
        assert_eq!(axes.len(), 2);
        let ulna = axes[&Bone::Ulna];
        assert_eq!(ulna.head, point(100.0, 200.0));
        assert_eq!(ulna.tail, point(120.0, 400.0));
        assert_eq!(axes.keys().copied().collect::<Vec<_>>(), [Bone::Radius, Bone::Ulna]);
    }

    #[test]
    fn partial_bones_are_omitted_and_reported() {
        let mut landmarks = forearm();
        landmarks.retain(|landmark| landmark.label != "radius_tail");
        let resolution = resolve_detailed(&landmarks).expect("valid landmarks");
        assert_eq!(resolution.axes.len(), 1);
        assert_eq!(
            resolution.incomplete,
            vec![GeometryError::MissingLandmark {
                bone: Bone::Radius,
                label: "radius_tail".into(),
            }]
        );
    }

    #[test]
    fn duplicate_labels_are_rejected_after_normalization() {
        let mut landmarks = forearm();
        landmarks.push(Landmark::new(1.0, 1.0, "Ulna Head"));
        let error = resolve(&landmarks).expect_err("duplicate rejected");
        assert_eq!(error, GeometryError::DuplicateLabel("ulna_head".into()));
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let error = resolve(&[Landmark::new(1.0, 1.0, "Femur Head")]).expect_err("unknown label");
        assert_eq!(error, GeometryError::UnknownLabel("femur_head".into()));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let error =
            resolve(&[Landmark::new(f64::NAN, 1.0, "ulna_head")]).expect_err("NaN rejected");
        assert!(matches!(error, GeometryError::NonFiniteCoordinate { .. }));
    }

    #[test]
    fn required_bones_must_be_complete() {
        let landmarks = vec![Landmark::new(100.0, 200.0, "ulna_head")];
        let error =
            resolve_required(&landmarks, &[Bone::Ulna]).expect_err("ulna tail missing");
        assert_eq!(
            error,
            GeometryError::MissingLandmark {
                bone: Bone::Ulna,
                label: "ulna_tail".into(),
            }
        );

        let error = resolve_required(&landmarks, &[Bone::Radius]).expect_err("radius missing");
        assert_eq!(error.label(), Some("radius_head"));

        let axes = resolve_required(&forearm(), &[Bone::Ulna, Bone::Radius])
            .expect("both bones complete");
        assert_eq!(axes.len(), 2);
    }

    #[test]
    fn axis_helpers() {
        let axis = BoneAxis::new(Bone::Ulna, point(0.0, 0.0), point(0.0, 100.0));
        assert_relative_eq!(axis.length(), 100.0);
        assert_eq!(axis.point_at(0.25), point(0.0, 25.0));
        assert_relative_eq!(axis.parameter_of(point(3.0, 75.0)).expect("valid"), 0.75);
        assert_eq!(axis.region(5.0), Rect::new(-5.0, -5.0, 5.0, 105.0));
        assert_eq!(axis.reversed().head, axis.tail);
        assert!(BoneAxis::new(Bone::Ulna, axis.head, axis.head).is_degenerate());
        assert!(!axis.is_degenerate());
    }

    #[test]
    fn overflowing_axis_is_degenerate() {
        let axis = BoneAxis::new(Bone::Ulna, point(-1e308, 0.0), point(1e308, 10.0));
        assert!(axis.is_degenerate());
        let far = BoneAxis::new(Bone::Ulna, point(0.0, 0.0), point(1e200, 1e200));
        assert!(far.is_degenerate());
    }
}
