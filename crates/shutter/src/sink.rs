//! The [`SubmissionSink`] seam: where a reviewed moment goes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::media::MediaBlob;

/// Identifier the sink assigns to a stored moment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MomentId(pub String);

impl MomentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MomentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the controller hands over on share.
///
/// Borrowed so the session keeps its media if the sink fails.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub caption: &'a str,
    pub media: &'a MediaBlob,
    pub capture_seconds: u32,
    pub cross_post: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("storage failed: {0}")]
    Storage(String),

    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("not signed in")]
    Unauthenticated,
}

impl SubmissionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Failed to share moment. Please try again.".to_string(),
            Self::Rejected(reason) => format!("Your moment was not accepted: {reason}"),
            Self::Unauthenticated => "Please sign in to share your moment.".to_string(),
        }
    }
}

/// Stores a finished moment and optionally triggers a cross-post.
///
/// Cross-post failures must not fail the submission once the record exists.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, submission: Submission<'_>) -> Result<MomentId, SubmissionError>;
}
