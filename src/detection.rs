//! Bounding boxes produced by the external fracture detector.

use serde::{Deserialize, Serialize};

use crate::anatomy::Bone;
use crate::geometry::{Point, Rect};

/// One labeled box reported by the detector.
///
/// The engine only reads detections; association with a bone happens in
/// [`crate::fusion`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    /// Class label assigned by the detector.
    pub label: String,
    /// Box in image pixels, `[x1, y1, x2, y2]` on the wire.
    pub bbox: Rect,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
}

impl DetectionBox {
    /// Create a [`DetectionBox`].
    pub fn new(label: impl Into<String>, bbox: Rect, confidence: f64) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }

    /// Centre of the box, used as the break point.
    #[must_use]
    pub fn center(&self) -> Point {
        self.bbox.center()
    }

    /// Bone named by the detector label, if any.
    #[must_use]
    pub fn bone_hint(&self) -> Option<Bone> {
        Bone::from_detector_label(&self.label)
    }

    /// Return `true` when the box is finite with positive area and the
    /// confidence lies in `[0, 1]`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.bbox.is_finite() && self.bbox.area() > 0.0 && (0.0..=1.0).contains(&self.confidence)
    }
}
