//! Error types for capture sessions.
//!
//! Every error carries a `user_message()` that a UI can show as-is. Nothing
//! here is retried automatically; `is_retryable()` only says whether offering
//! a retry button makes sense.

use thiserror::Error;

use crate::session::Phase;
use crate::sink::SubmissionError;

/// Failure to obtain or use the camera/microphone.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaAcquisitionError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    DeviceNotFound,

    #[error("camera is busy")]
    DeviceBusy,

    #[error("unsupported constraints: {0}")]
    UnsupportedConstraints(String),

    /// A platform failure after the stream was acquired. Ends the take.
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

impl MediaAcquisitionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Camera access denied. Please allow camera permissions and try again.".to_string()
            }
            Self::DeviceNotFound => {
                "No camera found. Please connect a camera and try again.".to_string()
            }
            Self::DeviceBusy => {
                "Camera is being used by another application. Please close other apps and try again."
                    .to_string()
            }
            Self::UnsupportedConstraints(_) => {
                "Camera settings not supported. Please try again.".to_string()
            }
            Self::CaptureFailed(_) => {
                "Something went wrong while capturing. Your moment was not saved.".to_string()
            }
        }
    }

    /// Acquisition errors get a retry affordance; a failed capture does not,
    /// since the take is already spent.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::CaptureFailed(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("caption is empty")]
    EmptyCaption,
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCaption => "Please add a caption to your moment".to_string(),
        }
    }
}

/// Operations a caller can invoke on a session, for rejection reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SelectMode,
    ToggleFacing,
    RequestStart,
    Capture,
    Submit,
    Discard,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SelectMode => "select_mode",
            Operation::ToggleFacing => "toggle_facing",
            Operation::RequestStart => "request_start",
            Operation::Capture => "capture",
            Operation::Submit => "submit",
            Operation::Discard => "discard",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a session operation can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Media(#[from] MediaAcquisitionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("{operation} is not allowed while {phase}")]
    InvalidTransition { operation: Operation, phase: Phase },

    /// The confirmation was issued for a different mode than the session is in.
    #[error("confirmation does not match the selected mode")]
    ConfirmationMismatch,

    /// The driver task behind a session handle has stopped.
    #[error("session is no longer running")]
    Closed,
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Media(e) => e.user_message(),
            Self::Validation(e) => e.user_message(),
            Self::Submission(e) => e.user_message(),
            Self::InvalidTransition { .. } => "That action isn't available right now.".to_string(),
            Self::ConfirmationMismatch => {
                "Capture mode changed. Please confirm again.".to_string()
            }
            Self::Closed => "This capture session has ended.".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Media(e) => e.is_retryable(),
            Self::Validation(_) | Self::Submission(_) | Self::ConfirmationMismatch => true,
            Self::InvalidTransition { .. } | Self::Closed => false,
        }
    }
}
