#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod anatomy;
pub mod axis;
pub mod config;
pub mod deformation;
pub mod detection;
pub mod errors;
pub mod fracture;
pub mod fusion;
pub mod geometry;
pub mod pipeline;
pub mod report;
pub mod risk;
pub mod session;
pub mod severity;

pub use anatomy::{Bone, BonePair};
pub use axis::{resolve, resolve_detailed, resolve_required, AxisMap, BoneAxis, Landmark, Resolution};
pub use config::{
    load_config, DeformationPolicy, EngineConfig, FusionPolicy, GeometryPolicy, SeverityPolicy,
};
pub use deformation::{deform_vertices, map, map_report, DeformationParams};
pub use detection::DetectionBox;
pub use errors::{ConfigError, ErrorKind, GeometryError, SessionError};
pub use fracture::{compute, compute_with_detections, DamageType, FractureDescriptor};
pub use fusion::{fuse, AnalysisReport, Warning, WarningKind};
pub use geometry::{point, Point, Rect};
pub use pipeline::{analyze, analyze_required, deformation_params};
pub use report::render_summary;
pub use risk::{assess, RiskAssessment, RiskLevel, Zone};
pub use session::{MemorySessionStore, SessionRecord, SessionStatus, SessionStore, Submission};
pub use severity::{classify, Severity};

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn it_works() {
        let landmarks = vec![
            Landmark::new(100.0, 200.0, "ulna_head"),
            Landmark::new(120.0, 400.0, "ulna_tail"),
        ];
        let config = EngineConfig::default();
        let report = analyze(&landmarks, &[], &config).expect("valid landmarks");
        let params = deformation_params(&report, &config.deformation).expect("classified");
        assert_eq!(report.detected_bones, vec![Bone::Ulna]);
        assert_eq!(params[0].hinge_position, 0.5);
    }
}
