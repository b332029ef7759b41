//! LocalSink: the on-device [`SubmissionSink`].
//!
//! Stores the media, records the moment, then makes a best-effort text
//! cross-post. A failed cross-post is logged and the moment stays.

use async_trait::async_trait;
use shutter::{MomentId, Submission, SubmissionError, SubmissionSink};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::ledger::{Author, Moment, MomentLedger};
use crate::store::MediaStore;

/// Reference to a post on another network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRef {
    pub uri: String,
    pub cid: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cross-post failed: {0}")]
pub struct CrossPostError(pub String);

/// Text-only publication to an external network.
#[async_trait]
pub trait CrossPoster: Send + Sync {
    async fn post_text(&self, text: &str) -> Result<ExternalRef, CrossPostError>;
}

pub struct LocalSink {
    media: Arc<MediaStore>,
    ledger: Arc<MomentLedger>,
    author: Option<Author>,
    cross_poster: Option<Arc<dyn CrossPoster>>,
}

impl LocalSink {
    pub fn new(media: Arc<MediaStore>, ledger: Arc<MomentLedger>) -> Self {
        Self {
            media,
            ledger,
            author: None,
            cross_poster: None,
        }
    }

    /// Submissions are refused until an author is set.
    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_cross_poster(mut self, poster: Arc<dyn CrossPoster>) -> Self {
        self.cross_poster = Some(poster);
        self
    }

    async fn cross_post(&self, moment_id: &str, caption: &str) {
        let Some(poster) = &self.cross_poster else {
            warn!(moment.id = %moment_id, "cross-post requested but no account is connected");
            return;
        };

        match poster.post_text(caption).await {
            Ok(external) => {
                info!(moment.id = %moment_id, uri = %external.uri, "cross-posted");
                let recorded = self
                    .ledger
                    .set_cross_post_uri(moment_id, external.uri)
                    .and_then(|()| self.ledger.save());
                if let Err(e) = recorded {
                    warn!(moment.id = %moment_id, error = %e, "failed to record cross-post uri");
                }
            }
            Err(e) => {
                warn!(moment.id = %moment_id, error = %e, "cross-post failed; moment kept");
            }
        }
    }
}

impl std::fmt::Debug for LocalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSink")
            .field("media", &self.media.root())
            .field("ledger", &self.ledger.path())
            .field("author", &self.author)
            .field("cross_post", &self.cross_poster.is_some())
            .finish()
    }
}

fn storage_error(e: StoreError) -> SubmissionError {
    SubmissionError::Storage(e.to_string())
}

#[async_trait]
impl SubmissionSink for LocalSink {
    #[tracing::instrument(skip(self, submission), fields(capture_seconds = submission.capture_seconds, cross_post = submission.cross_post))]
    async fn submit(&self, submission: Submission<'_>) -> Result<MomentId, SubmissionError> {
        let author = self.author.clone().ok_or(SubmissionError::Unauthenticated)?;

        let media = Arc::clone(&self.media);
        let data = submission.media.data.clone();
        let mime_type = submission.media.mime_type.clone();
        let hash = {
            let mime_type = mime_type.clone();
            tokio::task::spawn_blocking(move || media.put(&data, &mime_type))
                .await
                .map_err(|e| storage_error(StoreError::Task(e.to_string())))?
                .map_err(storage_error)?
        };

        let moment = Moment::new(
            author,
            submission.caption,
            hash,
            mime_type,
            submission.capture_seconds,
        );
        let moment_id = moment.id.clone();
        self.ledger.insert(moment);

        let ledger = Arc::clone(&self.ledger);
        let saved = tokio::task::spawn_blocking(move || ledger.save())
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
            .and_then(|saved| saved);
        if let Err(e) = saved {
            // Not durable, so not created: a resubmit must not duplicate it.
            self.ledger.remove(&moment_id);
            return Err(storage_error(e));
        }

        info!(moment.id = %moment_id, "moment stored");

        if submission.cross_post {
            self.cross_post(&moment_id, submission.caption).await;
        }

        Ok(MomentId::new(moment_id))
    }
}
