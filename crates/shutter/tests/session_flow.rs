//! End-to-end session flows against the in-memory source and sink.

use std::sync::Arc;

use shutter::memory::{MemorySink, ScriptedSource};
use shutter::{
    CaptureMode, CaptureOutcome, CaptureSession, MediaAcquisitionError, Phase, SessionConfig,
    SessionError, SubmissionError, TerminalOutcome, TickOutcome, ValidationError,
};

struct Harness {
    session: CaptureSession,
    source: Arc<ScriptedSource>,
    sink: Arc<MemorySink>,
}

impl Harness {
    fn new(mode: CaptureMode) -> Self {
        let source = Arc::new(ScriptedSource::new());
        let sink = Arc::new(MemorySink::new());
        let config = SessionConfig {
            mode,
            ..SessionConfig::default()
        };
        let session = CaptureSession::new(config, source.clone(), sink.clone());
        Self {
            session,
            source,
            sink,
        }
    }

    async fn start(&mut self) {
        let confirmation = self.session.confirmation_prompt().unwrap().confirm();
        self.session.request_start(confirmation).await.unwrap();
        let started = self.session.tick().await.unwrap();
        assert!(matches!(started, TickOutcome::Started { .. }));
    }

    /// Advance the countdown by `secs` one-second ticks.
    async fn advance(&mut self, secs: u32) {
        for _ in 0..secs {
            self.session.tick().await.unwrap();
        }
    }

    fn assert_balanced(&self) {
        assert_eq!(self.source.acquire_count(), self.source.release_count());
        assert_eq!(self.source.live_handles(), 0);
    }
}

#[tokio::test]
async fn test_photo_captured_at_five_seconds() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.start().await;
    h.advance(5).await;

    let outcome = h.session.capture().await.unwrap();
    assert_eq!(outcome, CaptureOutcome::Captured { capture_seconds: 5 });
    assert_eq!(h.session.phase(), Phase::Reviewing);
    assert!(h.session.media().is_some());
    assert_eq!(h.session.elapsed_secs(), 5);

    // A late tick after the capture changes nothing.
    assert_eq!(h.session.tick().await.unwrap(), TickOutcome::Ignored);
    assert_eq!(h.session.elapsed_secs(), 5);
    h.assert_balanced();
}

#[tokio::test]
async fn test_video_recorded_from_zero_to_twelve() {
    let mut h = Harness::new(CaptureMode::Video);
    h.start().await;

    let constraints = h.source.last_constraints().unwrap();
    assert!(constraints.audio && constraints.video);

    assert_eq!(
        h.session.capture().await.unwrap(),
        CaptureOutcome::RecordingStarted
    );
    assert!(h.session.is_recording());
    h.advance(12).await;

    let outcome = h.session.capture().await.unwrap();
    assert_eq!(outcome, CaptureOutcome::Captured { capture_seconds: 12 });
    assert_eq!(h.session.phase(), Phase::Reviewing);
    assert_eq!(h.session.capture_seconds(), Some(12));
    assert_eq!(h.session.media().unwrap().mime_type, "video/webm");
    h.assert_balanced();
}

#[tokio::test]
async fn test_video_finalized_when_window_runs_out() {
    let mut h = Harness::new(CaptureMode::Video);
    h.start().await;
    h.session.capture().await.unwrap();

    h.advance(59).await;
    assert_eq!(h.session.phase(), Phase::Capturing);
    assert_eq!(h.session.remaining_secs(), 1);

    let outcome = h.session.tick().await.unwrap();
    assert_eq!(outcome, TickOutcome::Finalized { capture_seconds: 60 });
    assert_eq!(h.session.phase(), Phase::Reviewing);
    assert_eq!(h.session.capture_seconds(), Some(60));
    assert!(h.session.media().is_some());
    h.assert_balanced();

    // Manual stop arriving after the timeout is not a second capture.
    assert!(h.session.capture().await.is_err());
    assert_eq!(h.session.phase(), Phase::Reviewing);
}

#[tokio::test]
async fn test_photo_window_expires_with_nothing_captured() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.start().await;
    h.advance(59).await;

    assert_eq!(h.session.tick().await.unwrap(), TickOutcome::Expired);
    assert_eq!(h.session.outcome(), Some(&TerminalOutcome::Expired));
    assert!(h.session.media().is_none());
    h.assert_balanced();
}

#[tokio::test]
async fn test_elapsed_is_monotonic_and_bounded() {
    let mut h = Harness::new(CaptureMode::Video);
    h.start().await;
    h.session.capture().await.unwrap();

    let mut last = h.session.elapsed_secs();
    for _ in 0..75 {
        h.session.tick().await.unwrap();
        let elapsed = h.session.elapsed_secs();
        assert!(elapsed >= last);
        assert!(elapsed <= 60);
        last = elapsed;
    }
    assert_eq!(last, 60);
}

#[tokio::test]
async fn test_second_photo_capture_is_a_no_op() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.start().await;
    h.advance(3).await;

    h.session.capture().await.unwrap();
    let media = h.session.media().cloned();

    assert_eq!(h.session.capture().await.unwrap(), CaptureOutcome::Ignored);
    assert_eq!(h.source.photo_count(), 1);
    assert_eq!(h.session.media().cloned(), media);
    assert_eq!(h.session.phase(), Phase::Reviewing);
}

#[tokio::test]
async fn test_empty_caption_stays_in_review() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.start().await;
    h.session.capture().await.unwrap();
    let before = h.session.media().cloned();

    for caption in ["", "   ", "\n\t"] {
        let err = h.session.submit(caption, false).await.unwrap_err();
        assert_eq!(err, SessionError::Validation(ValidationError::EmptyCaption));
        assert_eq!(h.session.phase(), Phase::Reviewing);
        assert_eq!(h.session.media().cloned(), before);
    }
    assert_eq!(h.sink.attempts(), 0);
}

#[tokio::test]
async fn test_permission_denied_leaves_session_idle() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.source
        .fail_next_acquire(MediaAcquisitionError::PermissionDenied);

    let confirmation = h.session.confirmation_prompt().unwrap().confirm();
    let err = h.session.request_start(confirmation).await.unwrap_err();

    assert_eq!(
        err,
        SessionError::Media(MediaAcquisitionError::PermissionDenied)
    );
    assert!(err.is_retryable());
    assert!(err.user_message().contains("Camera access denied"));
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(!h.session.holds_source());
    assert_eq!(h.source.live_handles(), 0);

    // The user retries once permission is granted.
    h.start().await;
    assert_eq!(h.session.phase(), Phase::Capturing);
}

#[tokio::test]
async fn test_discard_clears_media_and_revokes_preview() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.start().await;
    h.session.capture().await.unwrap();
    let preview = h.session.preview().unwrap();
    assert!(preview.get().is_some());

    h.session.discard().unwrap();
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.session.media().is_none());
    assert!(preview.is_revoked());
    h.assert_balanced();

    // A fresh take starts from zero.
    h.start().await;
    assert_eq!(h.session.elapsed_secs(), 0);
    h.advance(2).await;
    assert_eq!(
        h.session.capture().await.unwrap(),
        CaptureOutcome::Captured { capture_seconds: 2 }
    );
}

#[tokio::test]
async fn test_submit_hands_trimmed_caption_to_sink() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.start().await;
    h.advance(7).await;
    h.session.capture().await.unwrap();

    let id = h.session.submit("  golden hour  ", true).await.unwrap();
    assert_eq!(
        h.session.outcome(),
        Some(&TerminalOutcome::Submitted(id.clone()))
    );
    assert!(h.session.media().is_none());

    let submissions = h.sink.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].id, id);
    assert_eq!(submissions[0].caption, "golden hour");
    assert_eq!(submissions[0].capture_seconds, 7);
    assert!(submissions[0].cross_post);
    h.assert_balanced();
}

#[tokio::test]
async fn test_sink_failure_allows_resubmission() {
    let mut h = Harness::new(CaptureMode::Photo);
    h.start().await;
    h.session.capture().await.unwrap();
    h.sink
        .fail_next(SubmissionError::Storage("upload timed out".to_string()));

    let err = h.session.submit("first try", false).await.unwrap_err();
    assert!(matches!(err, SessionError::Submission(_)));
    assert_eq!(h.session.phase(), Phase::Reviewing);
    assert!(h.session.media().is_some());

    h.session.submit("first try", false).await.unwrap();
    assert_eq!(h.session.phase(), Phase::Terminal);
    assert_eq!(h.sink.attempts(), 2);
    assert_eq!(h.sink.submissions().len(), 1);
}

#[tokio::test]
async fn test_capture_failure_resets_to_idle() {
    let mut h = Harness::new(CaptureMode::Video);
    h.start().await;
    h.session.capture().await.unwrap();
    h.advance(4).await;
    h.source
        .fail_next_capture(MediaAcquisitionError::CaptureFailed("encoder flush".into()));

    let err = h.session.capture().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Media(MediaAcquisitionError::CaptureFailed(_))
    ));
    assert!(!err.is_retryable());
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.session.media().is_none());
    h.assert_balanced();
}

#[tokio::test]
async fn test_acquire_and_release_balance_on_every_exit() {
    let mut h = Harness::new(CaptureMode::Photo);

    // discard
    h.start().await;
    h.session.capture().await.unwrap();
    h.session.discard().unwrap();
    h.assert_balanced();

    // fatal error
    h.start().await;
    h.source
        .fail_next_capture(MediaAcquisitionError::DeviceBusy);
    assert!(h.session.capture().await.is_err());
    h.assert_balanced();

    // abandon while capturing
    h.start().await;
    h.session.abandon();
    h.assert_balanced();

    assert_eq!(h.source.acquire_count(), 3);
    assert_eq!(h.source.release_calls(), 3);
}
