//! Error types produced while resolving landmarks and deriving fracture geometry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anatomy::Bone;

/// Category of a [`GeometryError`].
///
/// Callers that surface errors over a transport usually only need the kind plus
/// the offending bone or label, both of which are available on the error itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A head or tail landmark is absent for a bone.
    MissingLandmark,
    /// The same landmark label was supplied twice.
    DuplicateLabel,
    /// A landmark label is outside the supported vocabulary.
    UnknownLabel,
    /// A landmark coordinate is NaN or infinite.
    NonFiniteCoordinate,
    /// Head and tail of a bone coincide.
    DegenerateAxis,
    /// A descriptor was mapped before a severity was assigned.
    InvalidSeverity,
}

/// Error returned when landmark geometry cannot be turned into a fracture estimate.
///
/// # Examples
///
/// ```
/// use fracturex::{resolve, ErrorKind, Landmark};
///
/// let landmarks = vec![
///     Landmark::new(100.0, 200.0, "ulna_head"),
///     Landmark::new(101.0, 201.0, "ulna_head"),
/// ];
/// let error = resolve(&landmarks).expect_err("duplicate label rejected");
/// assert_eq!(error.kind(), ErrorKind::DuplicateLabel);
/// assert_eq!(error.label(), Some("ulna_head"));
/// ```
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Returned when a required head or tail landmark is absent.
    #[error("bone {bone} is missing landmark {label}")]
    MissingLandmark {
        /// Bone whose landmark pair is incomplete.
        bone: Bone,
        /// Label that was expected but not supplied.
        label: String,
    },
    /// Returned when the same label appears more than once.
    #[error("landmark {0} was supplied more than once")]
    DuplicateLabel(String),
    /// Returned when a label does not name a supported bone landmark.
    #[error("landmark label {0:?} is not a supported bone landmark")]
    UnknownLabel(String),
    /// Returned when a landmark has NaN or infinite coordinates.
    #[error("landmark {label} has non-finite coordinates ({x}, {y})")]
    NonFiniteCoordinate {
        /// Label of the offending landmark.
        label: String,
        /// Rejected x coordinate.
        x: f64,
        /// Rejected y coordinate.
        y: f64,
    },
    /// Returned when the head and tail of a bone coincide or the axis length
    /// is not representable.
    #[error("axis of {0} is degenerate: head and tail coincide or lie too far apart")]
    DegenerateAxis(Bone),
    /// Returned when deformation is requested for an unclassified fracture.
    #[error("fracture of {0} has no severity; classify it before mapping")]
    InvalidSeverity(Bone),
}

impl GeometryError {
    /// Return the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingLandmark { .. } => ErrorKind::MissingLandmark,
            Self::DuplicateLabel(_) => ErrorKind::DuplicateLabel,
            Self::UnknownLabel(_) => ErrorKind::UnknownLabel,
            Self::NonFiniteCoordinate { .. } => ErrorKind::NonFiniteCoordinate,
            Self::DegenerateAxis(_) => ErrorKind::DegenerateAxis,
            Self::InvalidSeverity(_) => ErrorKind::InvalidSeverity,
        }
    }

    /// Return the bone the error refers to, when there is one.
    #[must_use]
    pub fn bone(&self) -> Option<Bone> {
        match self {
            Self::MissingLandmark { bone, .. } => Some(*bone),
            Self::DegenerateAxis(bone) | Self::InvalidSeverity(bone) => Some(*bone),
            Self::DuplicateLabel(_) | Self::UnknownLabel(_) | Self::NonFiniteCoordinate { .. } => {
                None
            }
        }
    }

    /// Return the landmark label the error refers to, when there is one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::MissingLandmark { label, .. } | Self::NonFiniteCoordinate { label, .. } => {
                Some(label)
            }
            Self::DuplicateLabel(label) | Self::UnknownLabel(label) => Some(label),
            Self::DegenerateAxis(_) | Self::InvalidSeverity(_) => None,
        }
    }
}

/// Error returned by the session operations in [`crate::session`].
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    /// Returned when no record exists for the session id.
    #[error("session {0} does not exist")]
    UnknownSession(String),
    /// Returned when deformation is requested before any landmarks were analysed.
    #[error("session {0} has no analysis report yet")]
    NoReport(String),
    /// Returned when the submitted landmarks cannot be analysed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Error returned when a policy configuration file cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when the file cannot be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Returned when the file is not valid policy JSON.
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}
