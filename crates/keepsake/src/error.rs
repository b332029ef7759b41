use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("stored media {hash} at {path} does not match its hash")]
    Corrupt { hash: String, path: PathBuf },

    #[error("media store is read-only")]
    ReadOnly,

    #[error("moment not found: {0}")]
    MomentNotFound(String),

    #[error("more than one moment starts with {0}")]
    AmbiguousId(String),

    #[error("comment not found: {0}")]
    CommentNotFound(String),

    #[error("comment {0} belongs to someone else")]
    NotCommentAuthor(String),

    #[error("comment is empty")]
    EmptyComment,

    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io {
            action,
            path,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
