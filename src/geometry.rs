//! Planar geometric primitives in image pixel coordinates.
//!
//! All coordinates follow the image convention: `x` grows to the right and `y`
//! grows downwards. "Clockwise" therefore means clockwise as seen on screen.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Position in the image plane measured in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate, growing to the right.
    pub x: f64,
    /// Vertical coordinate, growing downwards.
    pub y: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Return `true` when both coordinates are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation towards `other`; `t = 0` yields `self`.
    #[must_use]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::from(self.to_vector() + (other.to_vector() - self.to_vector()) * t)
    }
}

impl From<Vector2<f64>> for Point {
    fn from(value: Vector2<f64>) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<Point> for Vector2<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Axis-aligned rectangle, serialized as `[x1, y1, x2, y2]`.
///
/// Corners are normalized on construction so `min` is always the top-left
/// corner regardless of the order the detector reported them in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rect {
    /// Top-left corner.
    pub min: Point,
    /// Bottom-right corner.
    pub max: Point,
}

impl Rect {
    /// Create a [`Rect`] from two opposite corners given as raw coordinates.
    #[must_use]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::from_corners(Point::new(x1, y1), Point::new(x2, y2))
    }

    /// Smallest rectangle containing both points.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Horizontal extent in pixels.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Vertical extent in pixels.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Area in square pixels.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Geometric centre.
    #[must_use]
    pub fn center(&self) -> Point {
        self.min.lerp(self.max, 0.5)
    }

    /// Return `true` when all four coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Return `true` when `point` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        (self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
    }

    /// Grow the rectangle by `margin` pixels on every side.
    #[must_use]
    pub fn padded(&self, margin: f64) -> Rect {
        Rect {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Overlapping region of two rectangles, `None` when they do not overlap.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = Point::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Point::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        if min.x < max.x && min.y < max.y {
            Some(Rect { min, max })
        } else {
            None
        }
    }

    /// Intersection over union in `[0, 1]`.
    ///
    /// # Examples
    /// ```
    /// use fracturex::Rect;
    ///
    /// let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    /// let b = Rect::new(5.0, 0.0, 15.0, 10.0);
    /// assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn iou(&self, other: &Rect) -> f64 {
        let Some(overlap) = self.intersection(other) else {
            return 0.0;
        };
        let shared = overlap.area();
        let union = self.area() + other.area() - shared;
        if union > 0.0 {
            shared / union
        } else {
            0.0
        }
    }
}

impl From<[f64; 4]> for Rect {
    fn from(value: [f64; 4]) -> Self {
        Rect::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Rect> for [f64; 4] {
    fn from(value: Rect) -> Self {
        [value.min.x, value.min.y, value.max.x, value.max.y]
    }
}

/// Reference direction for fragment angles: straight up in image coordinates.
#[must_use]
pub fn image_up() -> Vector2<f64> {
    Vector2::new(0.0, -1.0)
}

/// Direction vector of the segment from `head` to `tail`.
#[must_use]
pub fn axis_vector(head: Point, tail: Point) -> Vector2<f64> {
    tail.to_vector() - head.to_vector()
}

/// Unit vector perpendicular to `v`, rotated a quarter turn clockwise on screen.
///
/// Returns `None` for the zero vector.
#[must_use]
pub fn unit_normal(v: Vector2<f64>) -> Option<Vector2<f64>> {
    let normal = Vector2::new(-v.y, v.x);
    let length = normal.norm();
    if length > 0.0 {
        Some(normal / length)
    } else {
        None
    }
}

/// Wrap an angle in degrees into `(-180, 180]`.
#[must_use]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle % 360.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Signed angle in degrees from `reference` to `v`, in `(-180, 180]`.
///
/// Positive values are clockwise on screen.
///
/// # Examples
/// ```
/// use fracturex::geometry::{image_up, signed_angle};
/// use nalgebra::Vector2;
///
/// let right = Vector2::new(1.0, 0.0);
/// assert!((signed_angle(image_up(), right) - 90.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn signed_angle(reference: Vector2<f64>, v: Vector2<f64>) -> f64 {
    let cross = reference.x * v.y - reference.y * v.x;
    let dot = reference.dot(&v);
    normalize_degrees(cross.atan2(dot).to_degrees())
}

/// Signed angle of the line through `v`, measured from image-up, in `(-90, 90]`.
///
/// The result does not depend on the direction `v` is traversed in, so a bone
/// fragment gets the same angle whichever end it is measured from.
#[must_use]
pub fn inclination(v: Vector2<f64>) -> f64 {
    let angle = signed_angle(image_up(), v);
    if angle > 90.0 {
        angle - 180.0
    } else if angle <= -90.0 {
        angle + 180.0
    } else {
        angle
    }
}

/// Scalar position of `point` projected on the segment `head -> tail`.
///
/// `0` is the head and `1` the tail; the value is not clamped. Returns `None`
/// when the segment has zero length.
#[must_use]
pub fn projection_parameter(head: Point, tail: Point, point: Point) -> Option<f64> {
    let axis = axis_vector(head, tail);
    let length_squared = axis.norm_squared();
    if length_squared > 0.0 {
        Some((point.to_vector() - head.to_vector()).dot(&axis) / length_squared)
    } else {
        None
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use fracturex::point;
///
/// let head = point(100.0, 200.0);
/// assert_eq!(head.y, 200.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0);
        let vector: Vector2<f64> = origin.into();
        assert_eq!(vector, Vector2::new(1.0, 2.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn rect_normalizes_corners_and_serializes_as_array() {
        let rect: Rect = serde_json::from_str("[30, 40, 10, 20]").expect("valid bbox");
        assert_eq!(rect.min, Point::new(10.0, 20.0));
        assert_eq!(rect.max, Point::new(30.0, 40.0));
        assert_eq!(
            serde_json::to_string(&rect).expect("serializes"),
            "[10.0,20.0,30.0,40.0]"
        );
    }

    #[test]
    fn iou_of_disjoint_and_identical_boxes() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let far = Rect::new(20.0, 20.0, 30.0, 30.0);
        let touching = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(a.iou(&far), 0.0);
        assert_eq!(a.iou(&touching), 0.0);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn iou_of_zero_area_box_is_zero() {
        let line = Rect::new(5.0, 0.0, 5.0, 10.0);
        assert_eq!(line.iou(&line), 0.0);
        assert!(line.padded(1.0).iou(&line.padded(1.0)) > 0.0);
    }

    #[test]
    fn signed_angle_is_clockwise_positive() {
        let up = image_up();
        assert_relative_eq!(signed_angle(up, Vector2::new(1.0, 0.0)), 90.0);
        assert_relative_eq!(signed_angle(up, Vector2::new(-1.0, 0.0)), -90.0);
        assert_relative_eq!(signed_angle(up, Vector2::new(0.0, 1.0)), 180.0);
        assert_relative_eq!(signed_angle(up, up), 0.0);
    }

    #[test]
    fn normalize_degrees_stays_in_half_open_range() {
        assert_relative_eq!(normalize_degrees(-180.0), 180.0);
        assert_relative_eq!(normalize_degrees(540.0), 180.0);
        assert_relative_eq!(normalize_degrees(-190.0), 170.0);
        assert_relative_eq!(normalize_degrees(45.0), 45.0);
    }

    #[test]
    fn inclination_ignores_direction() {
        let down_right = Vector2::new(10.0, 100.0);
        let up_left = -down_right;
        assert_relative_eq!(inclination(down_right), inclination(up_left));
        assert!(inclination(down_right) < 0.0);
        assert_relative_eq!(inclination(Vector2::new(-1.0, 0.0)), 90.0);
        assert_relative_eq!(inclination(Vector2::new(0.0, 5.0)), 0.0);
    }

    #[test]
    fn unit_normal_is_perpendicular() {
        let v = Vector2::new(3.0, 4.0);
        let normal = unit_normal(v).expect("non-zero vector");
        assert_relative_eq!(normal.norm(), 1.0);
        assert_relative_eq!(normal.dot(&v), 0.0, epsilon = 1e-12);
        assert!(unit_normal(Vector2::zeros()).is_none());
    }

    #[test]
    fn projection_parameter_along_segment() {
        let head = point(0.0, 0.0);
        let tail = point(0.0, 100.0);
        let t = projection_parameter(head, tail, point(7.0, 25.0)).expect("valid segment");
        assert_relative_eq!(t, 0.25);
        assert!(projection_parameter(head, head, tail).is_none());
    }
}
