//! End-to-end analysis of one landmark submission.

use log::{debug, warn};

use crate::anatomy::Bone;
use crate::axis::{resolve_detailed, resolve_required, Landmark};
use crate::config::{DeformationPolicy, EngineConfig};
use crate::deformation::{map_report, DeformationParams};
use crate::detection::DetectionBox;
use crate::errors::GeometryError;
use crate::fusion::{fuse, AnalysisReport, Warning};

/// Analyse landmarks against detector output.
///
/// Bones with an incomplete landmark pair are left out of the report and
/// listed among its warnings.
///
/// # Errors
///
/// Returns the fatal landmark errors of [`crate::resolve`]: unknown or duplicate
/// labels and non-finite coordinates.
///
/// # Examples
/// ```
/// use fracturex::{analyze, Bone, EngineConfig, Landmark};
///
/// let landmarks = vec![
///     Landmark::new(100.0, 200.0, "ulna_head"),
///     Landmark::new(120.0, 400.0, "ulna_tail"),
///     Landmark::new(150.0, 210.0, "radius_head"),
///     Landmark::new(170.0, 410.0, "radius_tail"),
/// ];
/// let report = analyze(&landmarks, &[], &EngineConfig::default()).expect("valid landmarks");
/// assert_eq!(report.detected_bones, vec![Bone::Radius, Bone::Ulna]);
/// assert_eq!(report.confidence, 0.3);
/// ```
pub fn analyze(
    landmarks: &[Landmark],
    detections: &[DetectionBox],
    config: &EngineConfig,
) -> Result<AnalysisReport, GeometryError> {
    let resolution = resolve_detailed(landmarks)?;
    debug!(
        "resolved {} bone axes from {} landmarks",
        resolution.axes.len(),
        landmarks.len()
    );
    let mut report = fuse(&resolution.axes, detections, config);

    let mut warnings: Vec<Warning> = resolution
        .incomplete
        .iter()
        .inspect(|error| warn!("skipping bone: {error}"))
        .map(Warning::from_error)
        .collect();
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    Ok(report)
}

/// Analyse landmarks, failing when any bone in `required` cannot be resolved.
///
/// # Errors
///
/// Returns [`GeometryError::MissingLandmark`] for the first required bone
/// lacking a landmark, plus every error of [`analyze`].
pub fn analyze_required(
    landmarks: &[Landmark],
    detections: &[DetectionBox],
    required: &[Bone],
    config: &EngineConfig,
) -> Result<AnalysisReport, GeometryError> {
    resolve_required(landmarks, required)?;
    analyze(landmarks, detections, config)
}

/// Renderer parameters for every fracture of a report.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidSeverity`] if the report contains an
/// unclassified fracture, which [`analyze`] never produces.
pub fn deformation_params(
    report: &AnalysisReport,
    policy: &DeformationPolicy,
) -> Result<Vec<DeformationParams>, GeometryError> {
    map_report(report, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::WarningKind;

    #[test]
    fn incomplete_bones_are_reported_before_fusion_warnings() {
        let landmarks = vec![
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(100.0, 200.0, "ulna_tail"),
            Landmark::new(150.0, 210.0, "radius_head"),
        ];
        let report = analyze(&landmarks, &[], &EngineConfig::default()).expect("valid landmarks");
        assert!(report.fractures.is_empty());
        assert_eq!(report.detected_bones, Vec::<Bone>::new());
        let kinds: Vec<WarningKind> = report.warnings.iter().map(|warning| warning.kind).collect();
        assert_eq!(kinds, [WarningKind::MissingLandmark, WarningKind::DegenerateAxis]);
        assert_eq!(report.warnings[0].label.as_deref(), Some("radius_tail"));
    }

    #[test]
    fn required_bones_are_fatal() {
        let landmarks = vec![
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(120.0, 400.0, "ulna_tail"),
        ];
        let error = analyze_required(&landmarks, &[], &[Bone::Radius], &EngineConfig::default())
            .expect_err("radius required");
        assert_eq!(
            error,
            GeometryError::MissingLandmark {
                bone: Bone::Radius,
                label: "radius_head".into(),
            }
        );
        assert!(analyze_required(&landmarks, &[], &[Bone::Ulna], &EngineConfig::default()).is_ok());
    }

    #[test]
    fn deformation_covers_every_fracture() {
        let landmarks = vec![
            Landmark::new(100.0, 200.0, "tibia_head"),
            Landmark::new(100.0, 600.0, "tibia_tail"),
        ];
        let config = EngineConfig::default();
        let report = analyze(&landmarks, &[], &config).expect("valid landmarks");
        let params = deformation_params(&report, &config.deformation).expect("classified");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].bone, Bone::Tibia);
        assert_eq!(params[0].gap, 0.0);
    }
}
