//! ReplaySource: a file on disk standing in for the camera.
//!
//! Stills answer photo takes and clips answer video takes. Recording just
//! flags the handle; stopping hands back the whole clip.

use async_trait::async_trait;
use shutter::{MediaAcquisitionError, MediaBlob, MediaConstraints, MediaSource, MediaSourceHandle};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

pub struct ReplaySource {
    path: PathBuf,
    live: Mutex<HashSet<Uuid>>,
    recording: Mutex<HashSet<Uuid>>,
}

/// Mime type for a media file, by extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "gif" => "image/gif",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            live: Mutex::new(HashSet::new()),
            recording: Mutex::new(HashSet::new()),
        }
    }

    fn ensure_live(&self, handle: &MediaSourceHandle) -> Result<(), MediaAcquisitionError> {
        if self
            .live
            .lock()
            .expect("live handles mutex poisoned")
            .contains(&handle.id())
        {
            Ok(())
        } else {
            Err(MediaAcquisitionError::CaptureFailed(
                "camera was released".to_string(),
            ))
        }
    }

    async fn read(&self) -> Result<MediaBlob, MediaAcquisitionError> {
        let mime_type = mime_for_path(&self.path).ok_or_else(|| {
            MediaAcquisitionError::CaptureFailed(format!(
                "unrecognized media file {}",
                self.path.display()
            ))
        })?;
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| MediaAcquisitionError::CaptureFailed(e.to_string()))?;
        Ok(MediaBlob::new(data, mime_type))
    }
}

#[async_trait]
impl MediaSource for ReplaySource {
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaSourceHandle, MediaAcquisitionError> {
        if let Err(e) = tokio::fs::File::open(&self.path).await {
            return Err(match e.kind() {
                ErrorKind::NotFound => MediaAcquisitionError::DeviceNotFound,
                ErrorKind::PermissionDenied => MediaAcquisitionError::PermissionDenied,
                _ => MediaAcquisitionError::DeviceBusy,
            });
        }

        let mime_type = mime_for_path(&self.path).ok_or_else(|| {
            MediaAcquisitionError::UnsupportedConstraints(format!(
                "{} is not a recognized image or video file",
                self.path.display()
            ))
        })?;
        let is_clip = mime_type.starts_with("video/");
        if constraints.audio && !is_clip {
            return Err(MediaAcquisitionError::UnsupportedConstraints(
                "video needs a clip, not a still image".to_string(),
            ));
        }
        if !constraints.audio && is_clip {
            return Err(MediaAcquisitionError::UnsupportedConstraints(
                "photo needs a still image, not a clip".to_string(),
            ));
        }

        let handle = MediaSourceHandle::new(constraints.clone());
        self.live
            .lock()
            .expect("live handles mutex poisoned")
            .insert(handle.id());
        debug!(path = %self.path.display(), handle = %handle.id(), "replay source acquired");
        Ok(handle)
    }

    fn release(&self, handle: &MediaSourceHandle) {
        self.recording
            .lock()
            .expect("recording mutex poisoned")
            .remove(&handle.id());
        if self
            .live
            .lock()
            .expect("live handles mutex poisoned")
            .remove(&handle.id())
        {
            debug!(handle = %handle.id(), "replay source released");
        }
    }

    async fn take_photo(
        &self,
        handle: &MediaSourceHandle,
    ) -> Result<MediaBlob, MediaAcquisitionError> {
        self.ensure_live(handle)?;
        self.read().await
    }

    async fn start_recording(
        &self,
        handle: &MediaSourceHandle,
    ) -> Result<(), MediaAcquisitionError> {
        self.ensure_live(handle)?;
        self.recording
            .lock()
            .expect("recording mutex poisoned")
            .insert(handle.id());
        Ok(())
    }

    async fn stop_recording(
        &self,
        handle: &MediaSourceHandle,
    ) -> Result<MediaBlob, MediaAcquisitionError> {
        self.ensure_live(handle)?;
        let was_recording = self
            .recording
            .lock()
            .expect("recording mutex poisoned")
            .remove(&handle.id());
        if !was_recording {
            return Err(MediaAcquisitionError::CaptureFailed(
                "not recording".to_string(),
            ));
        }
        self.read().await
    }
}
