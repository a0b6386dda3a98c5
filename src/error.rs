//! Error types shared across the crate.

use crate::pose::KeypointIndex;

/// Startup failures. Any of these halts the session before the detection
/// loop is spawned.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("camera capture is not available: {0}")]
    CameraUnavailable(String),
    #[error("camera access was denied: {0}")]
    PermissionDenied(String),
    #[error("pose source failed to load: {0}")]
    PoseSourceLoad(String),
}

/// Per-frame sampling failures. The loop logs these and skips the frame.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("video frame unavailable: {0}")]
    Unavailable(String),
    #[error("pose estimation failed: {0}")]
    Estimation(String),
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// The presentation surface went away; the session is over.
    #[error("overlay surface closed")]
    Closed,
    #[error("overlay backend error: {0}")]
    Backend(String),
}

/// Raised when a keypoint list cannot be laid out as a full pose.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PoseError {
    #[error("pose is missing keypoint {0:?}")]
    MissingPart(KeypointIndex),
    #[error("pose has keypoint {0:?} more than once")]
    DuplicatePart(KeypointIndex),
}
