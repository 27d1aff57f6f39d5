//! Session-scoped analysis on top of a caller-owned key-value store.
//!
//! The engine keeps no state of its own between calls. Each operation here
//! reads the session record once, computes, and writes it back once; when two
//! submissions for the same session race, the last writer wins.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::anatomy::Bone;
use crate::axis::Landmark;
use crate::config::EngineConfig;
use crate::deformation::{map_report, DeformationParams};
use crate::detection::DetectionBox;
use crate::errors::SessionError;
use crate::fusion::AnalysisReport;
use crate::pipeline::{analyze, analyze_required};

/// Landmark submission as received from the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Session the landmarks belong to.
    pub session_id: String,
    /// Landmarks placed on the radiograph.
    pub landmarks: Vec<Landmark>,
}

/// Everything stored for one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Detector output for the session's radiograph.
    pub detections: Vec<DetectionBox>,
    /// Landmarks of the latest submission.
    pub landmarks: Option<Vec<Landmark>>,
    /// Report of the latest submission.
    pub report: Option<AnalysisReport>,
}

/// Which stages a session has completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Detector output has been registered.
    pub has_detections: bool,
    /// Landmarks have been submitted.
    pub has_landmarks: bool,
    /// A report is available.
    pub has_report: bool,
}

/// Storage for session records, owned and synchronized by the caller.
///
/// Implementations must make each `put` atomic per key; no atomicity is
/// assumed across a `get` followed by a `put`.
pub trait SessionStore: Send + Sync {
    /// Fetch a copy of the record for `session_id`.
    fn get(&self, session_id: &str) -> Option<SessionRecord>;
    /// Store `record` under `session_id`, replacing any previous record.
    fn put(&self, session_id: &str, record: SessionRecord);
    /// Remove and return the record for `session_id`.
    fn remove(&self, session_id: &str) -> Option<SessionRecord>;
}

/// In-process [`SessionStore`] backed by a locked hash map.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    /// Records keyed by session id.
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return `true` when no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn put(&self, session_id: &str, record: SessionRecord) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string(), record);
    }

    fn remove(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }
}

/// Register the detector output for a session, starting it afresh.
pub fn open(store: &dyn SessionStore, session_id: &str, detections: Vec<DetectionBox>) {
    debug!(
        "opening session {session_id} with {} detections",
        detections.len()
    );
    store.put(
        session_id,
        SessionRecord {
            detections,
            ..SessionRecord::default()
        },
    );
}

/// Analyse a landmark submission against the session's detections.
///
/// The landmarks and the resulting report replace those of any earlier
/// submission for the same session.
///
/// # Errors
///
/// Returns [`SessionError::UnknownSession`] when the session was never opened
/// and [`SessionError::Geometry`] when the landmarks cannot be analysed.
///
/// # Examples
/// ```
/// use fracturex::session::{self, MemorySessionStore, Submission};
/// use fracturex::{EngineConfig, Landmark};
///
/// let store = MemorySessionStore::new();
/// session::open(&store, "session_0", Vec::new());
/// let submission = Submission {
///     session_id: "session_0".into(),
///     landmarks: vec![
///         Landmark::new(100.0, 200.0, "ulna_head"),
///         Landmark::new(120.0, 400.0, "ulna_tail"),
///     ],
/// };
/// let report = session::submit(&store, &submission, &EngineConfig::default())
///     .expect("session exists");
/// assert_eq!(report.fractures.len(), 1);
/// ```
pub fn submit(
    store: &dyn SessionStore,
    submission: &Submission,
    config: &EngineConfig,
) -> Result<AnalysisReport, SessionError> {
    submit_with_required(store, submission, &[], config)
}

/// Like [`submit`], but failing when a bone in `required` cannot be resolved.
///
/// # Errors
///
/// Same as [`submit`], including missing landmarks of required bones.
pub fn submit_with_required(
    store: &dyn SessionStore,
    submission: &Submission,
    required: &[Bone],
    config: &EngineConfig,
) -> Result<AnalysisReport, SessionError> {
    let session_id = submission.session_id.as_str();
    let mut record = store
        .get(session_id)
        .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
    let report = if required.is_empty() {
        analyze(&submission.landmarks, &record.detections, config)?
    } else {
        analyze_required(&submission.landmarks, &record.detections, required, config)?
    };
    debug!(
        "session {session_id}: {} fractures, confidence {:.2}",
        report.fractures.len(),
        report.confidence
    );
    record.landmarks = Some(submission.landmarks.clone());
    record.report = Some(report.clone());
    store.put(session_id, record);
    Ok(report)
}

/// Renderer parameters for the latest report of a session, recomputed on each call.
///
/// # Errors
///
/// Returns [`SessionError::UnknownSession`] for unknown sessions and
/// [`SessionError::NoReport`] when no landmarks were submitted yet.
pub fn deformation(
    store: &dyn SessionStore,
    session_id: &str,
    config: &EngineConfig,
) -> Result<Vec<DeformationParams>, SessionError> {
    let record = store
        .get(session_id)
        .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
    let report = record
        .report
        .ok_or_else(|| SessionError::NoReport(session_id.to_string()))?;
    Ok(map_report(&report, &config.deformation)?)
}

/// Progress of a session, `None` when it does not exist.
#[must_use]
pub fn status(store: &dyn SessionStore, session_id: &str) -> Option<SessionStatus> {
    store.get(session_id).map(|record| SessionStatus {
        has_detections: !record.detections.is_empty(),
        has_landmarks: record.landmarks.is_some(),
        has_report: record.report.is_some(),
    })
}
