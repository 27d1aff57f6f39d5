//! Reconciliation of detector boxes with landmark-derived bone axes.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::anatomy::Bone;
use crate::axis::AxisMap;
use crate::config::EngineConfig;
use crate::detection::DetectionBox;
use crate::errors::{ErrorKind, GeometryError};
use crate::fracture::{compute_with_detections, FractureDescriptor};
use crate::severity::classify;

/// Category of a non-fatal problem recorded in a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// A detection overlapped no bone and was dropped.
    UnmatchedDetection,
    /// A detection had an unusable box or confidence and was dropped.
    InvalidDetection,
    /// A detection labeled with one bone was assigned to another.
    LabelMismatch,
    /// A bone was skipped because one of its landmarks is missing.
    MissingLandmark,
    /// A bone was skipped because its axis is degenerate.
    DegenerateAxis,
    /// A bone was skipped because of any other geometry error.
    InvalidGeometry,
}

/// Non-fatal problem encountered while building a report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Category of the problem.
    pub kind: WarningKind,
    /// Bone concerned, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bone: Option<Bone>,
    /// Landmark or detection label concerned, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Warning for a bone skipped because of a geometry error.
    ///
    /// Per-bone error kinds keep their own warning kind; any other kind is
    /// reported as [`WarningKind::InvalidGeometry`].
    #[must_use]
    pub fn from_error(error: &GeometryError) -> Self {
        let kind = match error.kind() {
            ErrorKind::MissingLandmark => WarningKind::MissingLandmark,
            ErrorKind::DegenerateAxis => WarningKind::DegenerateAxis,
            ErrorKind::DuplicateLabel
            | ErrorKind::UnknownLabel
            | ErrorKind::NonFiniteCoordinate
            | ErrorKind::InvalidSeverity => WarningKind::InvalidGeometry,
        };
        Self {
            kind,
            bone: error.bone(),
            label: error.label().map(str::to_string),
            message: error.to_string(),
        }
    }

    /// Warning for the detection at `index`.
    fn detection(kind: WarningKind, index: usize, detection: &DetectionBox, detail: &str) -> Self {
        Self {
            kind,
            bone: None,
            label: Some(detection.label.clone()),
            message: format!("detection {index} ({}) {detail}", detection.label),
        }
    }
}

/// Aggregate outcome of one landmark submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// One classified descriptor per analysed bone, in bone-name order.
    pub fractures: Vec<FractureDescriptor>,
    /// Mean confidence of the detections confirming the fractures.
    pub confidence: f64,
    /// Sorted, deduplicated names of the bones with a fracture.
    pub detected_bones: Vec<Bone>,
    /// Non-fatal problems, omitted from JSON when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl AnalysisReport {
    /// Descriptor for `bone`, if it was analysed.
    #[must_use]
    pub fn fracture(&self, bone: Bone) -> Option<&FractureDescriptor> {
        self.fractures.iter().find(|fracture| fracture.bone == bone)
    }
}

/// Outcome of associating one detection with the resolved bones.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Association {
    /// Bone the detection was assigned to.
    bone: Bone,
    /// Bone named by the detection label when it differs from `bone`.
    conflicting_hint: Option<Bone>,
}

/// Assign a detection to the bone whose padded region overlaps it most.
///
/// Equal IoUs go to the bone named by the detection label, else to the first
/// bone in name order. A label naming another bone is kept as a conflict.
fn associate(axes: &AxisMap, detection: &DetectionBox, padding: f64) -> Option<Association> {
    let hint = detection.bone_hint();
    let mut best: Option<(Bone, f64)> = None;
    for (bone, axis) in axes {
        let iou = axis.region(padding).iou(&detection.bbox);
        if iou <= 0.0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_iou)) => iou > best_iou || (iou == best_iou && hint == Some(*bone)),
        };
        if better {
            best = Some((*bone, iou));
        }
    }
    best.map(|(bone, _)| Association {
        bone,
        conflicting_hint: hint.filter(|hinted| *hinted != bone),
    })
}

/// Merge detector output with the resolved bone axes into a report.
///
/// Detector noise never fails the analysis: unusable or unmatched detections
/// become warnings, and every resolved bone still yields a descriptor through
/// the fallback policy. A bone whose geometry is invalid is skipped with a
/// warning.
///
/// # Examples
/// ```
/// use fracturex::{fuse, resolve, Bone, EngineConfig, Landmark};
///
/// let axes = resolve(&[
///     Landmark::new(100.0, 200.0, "ulna_head"),
///     Landmark::new(120.0, 400.0, "ulna_tail"),
/// ])
/// .expect("valid landmarks");
/// let report = fuse(&axes, &[], &EngineConfig::default());
/// assert_eq!(report.confidence, 0.3);
/// assert_eq!(report.detected_bones, vec![Bone::Ulna]);
/// ```
#[must_use]
pub fn fuse(axes: &AxisMap, detections: &[DetectionBox], config: &EngineConfig) -> AnalysisReport {
    let mut warnings = Vec::new();
    let mut matched: BTreeMap<Bone, Vec<&DetectionBox>> = BTreeMap::new();

    for (index, detection) in detections.iter().enumerate() {
        if !detection.is_well_formed() {
            warn!("dropping malformed detection {index} ({})", detection.label);
            warnings.push(Warning::detection(
                WarningKind::InvalidDetection,
                index,
                detection,
                "has an unusable box or confidence",
            ));
            continue;
        }
        match associate(axes, detection, config.geometry.region_padding) {
            Some(association) => {
                debug!("detection {index} assigned to {}", association.bone);
                if let Some(hinted) = association.conflicting_hint {
                    warn!(
                        "detection {index} labeled {hinted} overlaps only {}",
                        association.bone
                    );
                    let mut warning = Warning::detection(
                        WarningKind::LabelMismatch,
                        index,
                        detection,
                        &format!("names {hinted} but was assigned to {}", association.bone),
                    );
                    warning.bone = Some(association.bone);
                    warnings.push(warning);
                }
                matched.entry(association.bone).or_default().push(detection);
            }
            None => {
                warn!("dropping detection {index} ({}): overlaps no bone", detection.label);
                warnings.push(Warning::detection(
                    WarningKind::UnmatchedDetection,
                    index,
                    detection,
                    "overlaps no bone",
                ));
            }
        }
    }

    let mut fractures = Vec::new();
    let mut confirmed = Vec::new();
    for (bone, axis) in axes {
        let boxes = matched.get(bone).map_or(&[][..], Vec::as_slice);
        match compute_with_detections(axis, boxes, &config.geometry) {
            Ok(descriptor) => {
                let bone_confidence = boxes
                    .iter()
                    .map(|detection| detection.confidence)
                    .reduce(f64::max);
                if let Some(confidence) = bone_confidence {
                    confirmed.push(confidence);
                }
                let severity = classify(
                    &descriptor,
                    bone_confidence.unwrap_or(config.fusion.unconfirmed_confidence),
                    &config.severity,
                );
                fractures.push(descriptor.with_severity(severity));
            }
            Err(error) => {
                warn!("skipping {bone}: {error}");
                warnings.push(Warning::from_error(&error));
            }
        }
    }

    let confidence = if confirmed.is_empty() {
        config.fusion.unconfirmed_confidence
    } else {
        confirmed.iter().sum::<f64>() / confirmed.len() as f64
    };

    fractures.sort_by_key(|fracture| fracture.bone.name());
    let mut detected_bones: Vec<Bone> = fractures.iter().map(|fracture| fracture.bone).collect();
    detected_bones.sort_by_key(|bone| bone.name());
    detected_bones.dedup();

    AnalysisReport {
        fractures,
        confidence,
        detected_bones,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::axis::{resolve, Landmark};
    use crate::fracture::DamageType;
    use crate::geometry::Rect;
    use crate::severity::Severity;

    fn forearm_axes() -> AxisMap {
        resolve(&[
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(120.0, 400.0, "ulna_tail"),
            Landmark::new(300.0, 210.0, "radius_head"),
            Landmark::new(320.0, 410.0, "radius_tail"),
        ])
        .expect("valid landmarks")
    }

    #[test]
    fn no_detections_falls_back_to_unconfirmed_confidence() {
        let report = fuse(&forearm_axes(), &[], &EngineConfig::default());
        assert_relative_eq!(report.confidence, 0.3);
        assert_eq!(report.fractures.len(), 2);
        assert_eq!(report.detected_bones, vec![Bone::Radius, Bone::Ulna]);
        assert!(report.warnings.is_empty());
        for fracture in &report.fractures {
            assert_eq!(fracture.location, 0.5);
            assert_eq!(fracture.severity, Some(Severity::Mild));
        }
    }

    #[test]
    fn detections_are_assigned_by_overlap() {
        let detections = vec![
            DetectionBox::new("fracture", Rect::new(95.0, 280.0, 125.0, 320.0), 0.9),
            DetectionBox::new("fracture", Rect::new(295.0, 290.0, 325.0, 330.0), 0.7),
        ];
        let report = fuse(&forearm_axes(), &detections, &EngineConfig::default());
        assert_relative_eq!(report.confidence, 0.8, epsilon = 1e-12);
        assert!(report.warnings.is_empty());
        let ulna = report.fracture(Bone::Ulna).expect("ulna analysed");
        assert_eq!(ulna.severity, Some(Severity::Moderate));
        assert!((ulna.location - 0.5).abs() < 0.05);
    }

    #[test]
    fn unmatched_detections_become_warnings() {
        let detections = vec![DetectionBox::new(
            "fracture",
            Rect::new(900.0, 900.0, 950.0, 950.0),
            0.95,
        )];
        let report = fuse(&forearm_axes(), &detections, &EngineConfig::default());
        assert_relative_eq!(report.confidence, 0.3);
        assert_eq!(report.fractures.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::UnmatchedDetection);
    }

    #[test]
    fn malformed_detections_are_dropped() {
        let detections = vec![DetectionBox::new(
            "fracture",
            Rect::new(95.0, 280.0, 125.0, 320.0),
            1.7,
        )];
        let report = fuse(&forearm_axes(), &detections, &EngineConfig::default());
        assert_eq!(report.warnings[0].kind, WarningKind::InvalidDetection);
        assert_relative_eq!(report.confidence, 0.3);
    }

    #[test]
    fn overlapping_detections_make_comminuted_fracture() {
        let detections = vec![
            DetectionBox::new("fracture", Rect::new(95.0, 260.0, 125.0, 290.0), 0.6),
            DetectionBox::new("fracture", Rect::new(98.0, 300.0, 128.0, 330.0), 0.8),
        ];
        let report = fuse(&forearm_axes(), &detections, &EngineConfig::default());
        let ulna = report.fracture(Bone::Ulna).expect("ulna analysed");
        assert_eq!(ulna.damage, DamageType::Comminuted);
        assert_eq!(ulna.severity, Some(Severity::Severe));
        assert_relative_eq!(report.confidence, 0.8);
    }

    #[test]
    fn larger_overlap_wins_over_detector_label() {
        let axes = resolve(&[
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(100.0, 400.0, "ulna_tail"),
            Landmark::new(140.0, 200.0, "radius_head"),
            Landmark::new(140.0, 400.0, "radius_tail"),
        ])
        .expect("valid landmarks");
        // Labeled radius, but overlaps the ulna region more.
        let detection = DetectionBox::new("radius", Rect::new(100.0, 290.0, 125.0, 310.0), 0.9);
        let report = fuse(&axes, &[detection], &EngineConfig::default());
        let ulna = report.fracture(Bone::Ulna).expect("ulna analysed");
        assert_eq!(ulna.severity, Some(Severity::Moderate));
        let radius = report.fracture(Bone::Radius).expect("radius analysed");
        assert_eq!(radius.severity, Some(Severity::Mild));
        assert_relative_eq!(report.confidence, 0.9);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::LabelMismatch);
        assert_eq!(report.warnings[0].bone, Some(Bone::Ulna));
    }

    #[test]
    fn label_breaks_equal_overlap() {
        let axes = resolve(&[
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(100.0, 400.0, "ulna_tail"),
            Landmark::new(140.0, 200.0, "radius_head"),
            Landmark::new(140.0, 400.0, "radius_tail"),
        ])
        .expect("valid landmarks");
        // Centred between the two bones, so both regions overlap it equally.
        let labeled = DetectionBox::new("ulna", Rect::new(110.0, 290.0, 130.0, 310.0), 0.9);
        let report = fuse(&axes, &[labeled], &EngineConfig::default());
        assert!(report.warnings.is_empty());
        assert_eq!(report.fracture(Bone::Ulna).and_then(|f| f.severity), Some(Severity::Moderate));
        assert_eq!(report.fracture(Bone::Radius).and_then(|f| f.severity), Some(Severity::Mild));

        let unlabeled = DetectionBox::new("fracture", Rect::new(110.0, 290.0, 130.0, 310.0), 0.9);
        let report = fuse(&axes, &[unlabeled], &EngineConfig::default());
        assert_eq!(report.fracture(Bone::Radius).and_then(|f| f.severity), Some(Severity::Moderate));
    }

    #[test]
    fn warning_kinds_follow_error_kinds() {
        let missing = GeometryError::MissingLandmark {
            bone: Bone::Radius,
            label: "radius_tail".into(),
        };
        assert_eq!(Warning::from_error(&missing).kind, WarningKind::MissingLandmark);
        let degenerate = GeometryError::DegenerateAxis(Bone::Ulna);
        assert_eq!(Warning::from_error(&degenerate).kind, WarningKind::DegenerateAxis);
        let unclassified = GeometryError::InvalidSeverity(Bone::Tibia);
        let warning = Warning::from_error(&unclassified);
        assert_eq!(warning.kind, WarningKind::InvalidGeometry);
        assert_eq!(warning.bone, Some(Bone::Tibia));
    }

    #[test]
    fn label_naming_a_distant_bone_is_flagged() {
        let detection = DetectionBox::new("radius", Rect::new(95.0, 280.0, 125.0, 320.0), 0.9);
        let report = fuse(&forearm_axes(), &[detection], &EngineConfig::default());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::LabelMismatch);
        assert_eq!(report.warnings[0].bone, Some(Bone::Ulna));
    }

    #[test]
    fn degenerate_bone_is_skipped_with_warning() {
        let axes = resolve(&[
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(100.0, 200.0, "ulna_tail"),
            Landmark::new(300.0, 210.0, "radius_head"),
            Landmark::new(320.0, 410.0, "radius_tail"),
        ])
        .expect("valid landmarks");
        let report = fuse(&axes, &[], &EngineConfig::default());
        assert_eq!(report.detected_bones, vec![Bone::Radius]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::DegenerateAxis);
        assert_eq!(report.warnings[0].bone, Some(Bone::Ulna));
    }

    #[test]
    fn report_serializes_wire_shape() {
        let report = fuse(&forearm_axes(), &[], &EngineConfig::default());
        let value = serde_json::to_value(&report).expect("serializes");
        assert_eq!(value["detected_bones"], serde_json::json!(["radius", "ulna"]));
        assert_eq!(value["fractures"][0]["damage"], "crack");
        assert_eq!(value["fractures"][0]["severity"], "mild");
        assert!(value.get("warnings").is_none());
    }
}
