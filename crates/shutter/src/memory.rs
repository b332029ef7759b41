//! In-memory media source and submission sink.
//!
//! Both count every call so tests can check that acquire and release stay
//! balanced and that the sink only sees valid submissions.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::MediaAcquisitionError;
use crate::media::{MediaBlob, MediaSource, MediaSourceHandle};
use crate::mode::MediaConstraints;
use crate::sink::{MomentId, Submission, SubmissionError, SubmissionSink};

/// A fake camera whose failures can be scripted ahead of time.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    acquire_failures: Mutex<VecDeque<MediaAcquisitionError>>,
    capture_failures: Mutex<VecDeque<MediaAcquisitionError>>,
    live: Mutex<HashSet<Uuid>>,
    recording: Mutex<HashSet<Uuid>>,
    last_constraints: Mutex<Option<MediaConstraints>>,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    release_calls: AtomicUsize,
    photos: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `acquire` fail with `error`.
    pub fn fail_next_acquire(&self, error: MediaAcquisitionError) {
        self.acquire_failures
            .lock()
            .expect("acquire failures mutex poisoned")
            .push_back(error);
    }

    /// Make the next photo/recording call fail with `error`.
    pub fn fail_next_capture(&self, error: MediaAcquisitionError) {
        self.capture_failures
            .lock()
            .expect("capture failures mutex poisoned")
            .push_back(error);
    }

    /// Successful acquisitions.
    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    /// Handles actually released (repeat releases of one handle count once).
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Every call to `release`, including repeats.
    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn photo_count(&self) -> usize {
        self.photos.load(Ordering::SeqCst)
    }

    /// Handles acquired and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.lock().expect("live handles mutex poisoned").len()
    }

    pub fn last_constraints(&self) -> Option<MediaConstraints> {
        self.last_constraints
            .lock()
            .expect("constraints mutex poisoned")
            .clone()
    }

    fn next_capture_failure(&self) -> Option<MediaAcquisitionError> {
        self.capture_failures
            .lock()
            .expect("capture failures mutex poisoned")
            .pop_front()
    }

    fn check_live(&self, handle: &MediaSourceHandle) -> Result<(), MediaAcquisitionError> {
        if self
            .live
            .lock()
            .expect("live handles mutex poisoned")
            .contains(&handle.id())
        {
            Ok(())
        } else {
            Err(MediaAcquisitionError::CaptureFailed(
                "stream already stopped".to_string(),
            ))
        }
    }
}

#[async_trait]
impl MediaSource for ScriptedSource {
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaSourceHandle, MediaAcquisitionError> {
        *self
            .last_constraints
            .lock()
            .expect("constraints mutex poisoned") = Some(constraints.clone());

        if let Some(error) = self
            .acquire_failures
            .lock()
            .expect("acquire failures mutex poisoned")
            .pop_front()
        {
            return Err(error);
        }

        let handle = MediaSourceHandle::new(constraints.clone());
        self.live
            .lock()
            .expect("live handles mutex poisoned")
            .insert(handle.id());
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn release(&self, handle: &MediaSourceHandle) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
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
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn take_photo(
        &self,
        handle: &MediaSourceHandle,
    ) -> Result<MediaBlob, MediaAcquisitionError> {
        self.check_live(handle)?;
        if let Some(error) = self.next_capture_failure() {
            return Err(error);
        }
        let n = self.photos.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MediaBlob::new(
            Bytes::from(format!("still-{n}")),
            "image/jpeg",
        ))
    }

    async fn start_recording(
        &self,
        handle: &MediaSourceHandle,
    ) -> Result<(), MediaAcquisitionError> {
        self.check_live(handle)?;
        if !handle.constraints().audio {
            return Err(MediaAcquisitionError::UnsupportedConstraints(
                "recording needs an audio track".to_string(),
            ));
        }
        if let Some(error) = self.next_capture_failure() {
            return Err(error);
        }
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
        self.check_live(handle)?;
        if let Some(error) = self.next_capture_failure() {
            return Err(error);
        }
        let was_recording = self
            .recording
            .lock()
            .expect("recording mutex poisoned")
            .remove(&handle.id());
        if !was_recording {
            return Err(MediaAcquisitionError::CaptureFailed(
                "recorder was not started".to_string(),
            ));
        }
        Ok(MediaBlob::new(Bytes::from_static(b"clip"), "video/webm"))
    }
}

/// What a [`MemorySink`] received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub id: MomentId,
    pub caption: String,
    pub media: MediaBlob,
    pub capture_seconds: u32,
    pub cross_post: bool,
}

/// Sink that keeps submissions in a vector.
#[derive(Debug, Default)]
pub struct MemorySink {
    submitted: Mutex<Vec<RecordedSubmission>>,
    failures: Mutex<VecDeque<SubmissionError>>,
    attempts: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: SubmissionError) {
        self.failures
            .lock()
            .expect("failures mutex poisoned")
            .push_back(error);
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submitted
            .lock()
            .expect("submissions mutex poisoned")
            .clone()
    }

    /// Every call to `submit`, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionSink for MemorySink {
    async fn submit(&self, submission: Submission<'_>) -> Result<MomentId, SubmissionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .failures
            .lock()
            .expect("failures mutex poisoned")
            .pop_front()
        {
            return Err(error);
        }

        let id = MomentId::new(Uuid::new_v4().to_string());
        self.submitted
            .lock()
            .expect("submissions mutex poisoned")
            .push(RecordedSubmission {
                id: id.clone(),
                caption: submission.caption.to_string(),
                media: submission.media.clone(),
                capture_seconds: submission.capture_seconds,
                cross_post: submission.cross_post,
            });
        Ok(id)
    }
}
