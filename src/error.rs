//! Error types for gazepilot.

use thiserror::Error;

use crate::notice::Severity;

/// Failures surfaced by the control layer and its engine boundaries.
#[derive(Debug, Error)]
pub enum Error {
    /// Camera access was refused; tracking stays off.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The gaze engine failed to start (missing assets, model fetch failure).
    #[error("gaze engine failed to start: {message}")]
    EngineInitFailure { message: String },

    /// A runtime capability (speech recognition, synthesis) is absent.
    #[error("{capability} is not supported in this runtime")]
    UnsupportedCapability { capability: &'static str },

    /// Speech engine restart raced with an already-running instance.
    #[error("speech engine already running")]
    TransientRestartFailure,

    /// Calibration requested while the gaze engine is unavailable.
    #[error("calibration unavailable: gaze engine not initialized")]
    CalibrationUnavailable,

    /// I/O error while reading or writing configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Severity used when the error is surfaced as a notice.
    pub fn severity(&self) -> Severity {
        match self {
            Self::TransientRestartFailure => Severity::Info,
            Self::UnsupportedCapability { .. } => Severity::Warning,
            Self::PermissionDenied
            | Self::EngineInitFailure { .. }
            | Self::CalibrationUnavailable
            | Self::Io(_)
            | Self::Json(_) => Severity::Error,
        }
    }

    /// Whether the error should be shown to the user at all.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::TransientRestartFailure)
    }
}

/// Result alias for gazepilot operations.
pub type Result<T> = std::result::Result<T, Error>;
