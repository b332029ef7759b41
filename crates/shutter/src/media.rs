//! Media payloads, device handles, and the [`MediaSource`] seam.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::error::MediaAcquisitionError;
use crate::mode::MediaConstraints;

/// Broad kind of a captured blob, derived from its mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// `image/*` is an image; anything else is treated as video.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            MediaKind::Image
        } else {
            MediaKind::Video
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One finished still or clip.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub data: Bytes,
    pub mime_type: String,
}

impl MediaBlob {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Revocable view of the media under review.
///
/// Holds only a weak reference; once the session drops the media (discard,
/// submit, abandon) the preview stops resolving.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    media: Weak<MediaBlob>,
}

impl PreviewHandle {
    pub(crate) fn new(media: &Arc<MediaBlob>) -> Self {
        Self {
            media: Arc::downgrade(media),
        }
    }

    pub fn get(&self) -> Option<Arc<MediaBlob>> {
        self.media.upgrade()
    }

    pub fn is_revoked(&self) -> bool {
        self.media.strong_count() == 0
    }
}

/// Exclusive claim on an acquired camera/microphone stream.
///
/// Deliberately not `Clone`: exactly one owner can release it.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaSourceHandle {
    id: Uuid,
    constraints: MediaConstraints,
}

impl MediaSourceHandle {
    /// Mint a handle for a freshly acquired stream. Called by sources.
    pub fn new(constraints: MediaConstraints) -> Self {
        Self {
            id: Uuid::new_v4(),
            constraints,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn constraints(&self) -> &MediaConstraints {
        &self.constraints
    }
}

/// Platform camera/microphone provider.
///
/// Native shells and desktop replays both implement this; the session never
/// talks to a device any other way.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaSourceHandle, MediaAcquisitionError>;

    /// Stop all tracks behind `handle`. Must be idempotent and must not fail.
    fn release(&self, handle: &MediaSourceHandle);

    async fn take_photo(&self, handle: &MediaSourceHandle)
        -> Result<MediaBlob, MediaAcquisitionError>;

    async fn start_recording(&self, handle: &MediaSourceHandle)
        -> Result<(), MediaAcquisitionError>;

    async fn stop_recording(
        &self,
        handle: &MediaSourceHandle,
    ) -> Result<MediaBlob, MediaAcquisitionError>;
}

/// A handle paired with the source that issued it. Releases on drop.
pub(crate) struct HeldSource {
    source: Arc<dyn MediaSource>,
    handle: MediaSourceHandle,
}

impl HeldSource {
    pub(crate) fn new(source: Arc<dyn MediaSource>, handle: MediaSourceHandle) -> Self {
        Self { source, handle }
    }

    pub(crate) fn handle(&self) -> &MediaSourceHandle {
        &self.handle
    }

    pub(crate) fn source(&self) -> &Arc<dyn MediaSource> {
        &self.source
    }
}

impl Drop for HeldSource {
    fn drop(&mut self) {
        tracing::debug!(handle.id = %self.handle.id, "releasing media source");
        self.source.release(&self.handle);
    }
}

impl fmt::Debug for HeldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeldSource")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("video/webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("application/octet-stream"), MediaKind::Video);
    }

    #[test]
    fn test_preview_revoked_when_media_dropped() {
        let media = Arc::new(MediaBlob::new(vec![1u8, 2, 3], "image/jpeg"));
        let preview = PreviewHandle::new(&media);
        assert!(!preview.is_revoked());
        assert_eq!(preview.get().map(|m| m.len()), Some(3));

        drop(media);
        assert!(preview.is_revoked());
        assert!(preview.get().is_none());
    }

    #[test]
    fn test_blob_debug_hides_bytes() {
        let blob = MediaBlob::new(vec![0u8; 4096], "video/mp4");
        let rendered = format!("{:?}", blob);
        assert!(rendered.contains("4096"));
        assert!(rendered.len() < 100);
    }
}
