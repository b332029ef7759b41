//! The capture session state machine.
//!
//! ```text
//! idle --request_start(confirmed)--> armed --tick(first)--> capturing
//! capturing --capture() [photo]--> reviewing
//! capturing --capture() [video, 2nd] / timeout [recording]--> reviewing
//! capturing --timeout [photo, or video not recording]--> terminal(expired)
//! armed|capturing --capture failure--> idle
//! reviewing --submit ok--> terminal(submitted)
//! reviewing --discard--> idle
//! any non-terminal --abandon--> terminal(abandoned)
//! ```
//!
//! The session is the only writer of its state. Every operation takes
//! `&mut self`, so device calls for one session never overlap. The media
//! source handle lives inside the armed/capturing states and is released
//! when those states are left, whichever way that happens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::confirm::{Confirmation, ConfirmationPrompt};
use crate::countdown::{Countdown, Urgency, DEFAULT_WINDOW_SECS};
use crate::error::{MediaAcquisitionError, Operation, SessionError, ValidationError};
use crate::media::{HeldSource, MediaBlob, MediaSource, PreviewHandle};
use crate::mode::{CaptureMode, Facing, MediaConstraints};
use crate::sink::{MomentId, Submission, SubmissionSink};

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Armed,
    Capturing,
    Reviewing,
    Terminal,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Armed => "armed",
            Phase::Capturing => "capturing",
            Phase::Reviewing => "reviewing",
            Phase::Terminal => "terminal",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "moment_id", rename_all = "lowercase")]
pub enum TerminalOutcome {
    Submitted(MomentId),
    /// The window ran out with nothing captured.
    Expired,
    Abandoned,
}

/// Result of feeding one timer tick to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not armed or capturing; the tick was dropped.
    Ignored,
    /// First tick after arming: the countdown is now visible.
    Started { remaining_secs: u32 },
    Counting { elapsed_secs: u32, remaining_secs: u32 },
    /// Window ran out while recording; the clip is under review.
    Finalized { capture_seconds: u32 },
    Expired,
}

/// Result of a shutter press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Photo already taken this take.
    Ignored,
    RecordingStarted,
    Captured { capture_seconds: u32 },
}

/// Settings a session starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub window_secs: u32,
    pub mode: CaptureMode,
    pub facing: Facing,
    /// Begin recording on the first tick when in video mode.
    pub auto_record_video: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            mode: CaptureMode::Photo,
            facing: Facing::Front,
            auto_record_video: false,
        }
    }
}

/// Point-in-time view of a session, for UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub mode: CaptureMode,
    pub facing: Facing,
    pub elapsed_secs: u32,
    pub remaining_secs: u32,
    pub urgency: Urgency,
    pub recording: bool,
    pub has_media: bool,
    pub capture_seconds: Option<u32>,
    pub outcome: Option<TerminalOutcome>,
}

enum State {
    Idle,
    Armed {
        held: HeldSource,
    },
    Capturing {
        held: HeldSource,
        recording: bool,
    },
    Reviewing {
        media: Arc<MediaBlob>,
        capture_seconds: u32,
    },
    Terminal(TerminalOutcome),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::Armed { .. } => Phase::Armed,
            State::Capturing { .. } => Phase::Capturing,
            State::Reviewing { .. } => Phase::Reviewing,
            State::Terminal(_) => Phase::Terminal,
        }
    }
}

/// One arm → capture → review → share/discard cycle.
pub struct CaptureSession {
    id: Uuid,
    mode: CaptureMode,
    facing: Facing,
    auto_record_video: bool,
    countdown: Countdown,
    photo_taken: bool,
    source: Arc<dyn MediaSource>,
    sink: Arc<dyn SubmissionSink>,
    state: State,
}

impl CaptureSession {
    pub fn new(
        config: SessionConfig,
        source: Arc<dyn MediaSource>,
        sink: Arc<dyn SubmissionSink>,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(session.id = %id, capture.mode = %config.mode, "capture session created");
        Self {
            id,
            mode: config.mode,
            facing: config.facing,
            auto_record_video: config.auto_record_video,
            countdown: Countdown::new(config.window_secs),
            photo_taken: false,
            source,
            sink,
            state: State::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.countdown.elapsed_secs()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Capturing { recording: true, .. })
    }

    /// True while a media source handle is held (armed or capturing).
    pub fn holds_source(&self) -> bool {
        matches!(self.state, State::Armed { .. } | State::Capturing { .. })
    }

    pub fn media(&self) -> Option<&MediaBlob> {
        match &self.state {
            State::Reviewing { media, .. } => Some(media.as_ref()),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<PreviewHandle> {
        match &self.state {
            State::Reviewing { media, .. } => Some(PreviewHandle::new(media)),
            _ => None,
        }
    }

    pub fn capture_seconds(&self) -> Option<u32> {
        match &self.state {
            State::Reviewing {
                capture_seconds, ..
            } => Some(*capture_seconds),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&TerminalOutcome> {
        match &self.state {
            State::Terminal(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            phase: self.phase(),
            mode: self.mode,
            facing: self.facing,
            elapsed_secs: self.countdown.elapsed_secs(),
            remaining_secs: self.countdown.remaining_secs(),
            urgency: self.countdown.urgency(),
            recording: self.is_recording(),
            has_media: self.media().is_some(),
            capture_seconds: self.capture_seconds(),
            outcome: self.outcome().cloned(),
        }
    }

    pub fn select_mode(&mut self, mode: CaptureMode) -> Result<(), SessionError> {
        self.require(Phase::Idle, Operation::SelectMode)?;
        if self.mode != mode {
            debug!(session.id = %self.id, capture.mode = %mode, "capture mode selected");
            self.mode = mode;
        }
        Ok(())
    }

    pub fn toggle_facing(&mut self) -> Result<Facing, SessionError> {
        self.require(Phase::Idle, Operation::ToggleFacing)?;
        self.facing = self.facing.toggled();
        debug!(session.id = %self.id, camera.facing = %self.facing, "camera facing toggled");
        Ok(self.facing)
    }

    /// The prompt to show before arming, for the current mode.
    pub fn confirmation_prompt(&self) -> Result<ConfirmationPrompt, SessionError> {
        self.require(Phase::Idle, Operation::RequestStart)?;
        Ok(ConfirmationPrompt::new(
            self.mode,
            self.countdown.window_secs(),
        ))
    }

    /// Acquire the camera and arm the countdown.
    ///
    /// On acquisition failure the session stays idle with nothing held.
    #[tracing::instrument(skip(self, confirmation), fields(session.id = %self.id, capture.mode = %self.mode))]
    pub async fn request_start(&mut self, confirmation: Confirmation) -> Result<(), SessionError> {
        self.require(Phase::Idle, Operation::RequestStart)?;
        if confirmation.mode() != self.mode {
            return Err(SessionError::ConfirmationMismatch);
        }

        let constraints = MediaConstraints::for_mode(self.mode, self.facing);
        let handle = match self.source.acquire(&constraints).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "media acquisition failed");
                return Err(e.into());
            }
        };

        self.countdown.reset();
        self.photo_taken = false;
        let held = HeldSource::new(Arc::clone(&self.source), handle);
        self.transition(State::Armed { held });
        Ok(())
    }

    /// Feed one timer tick. A no-op outside armed/capturing.
    pub async fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        match self.phase() {
            Phase::Armed => {
                self.begin_capturing();
                if self.mode == CaptureMode::Video && self.auto_record_video {
                    self.start_recording().await?;
                }
                Ok(TickOutcome::Started {
                    remaining_secs: self.countdown.remaining_secs(),
                })
            }
            Phase::Capturing => {
                if self.countdown.advance() {
                    self.on_timeout().await
                } else {
                    Ok(TickOutcome::Counting {
                        elapsed_secs: self.countdown.elapsed_secs(),
                        remaining_secs: self.countdown.remaining_secs(),
                    })
                }
            }
            _ => Ok(TickOutcome::Ignored),
        }
    }

    /// Shutter press. Photo: one still per take. Video: start, then stop.
    #[tracing::instrument(skip(self), fields(session.id = %self.id, capture.mode = %self.mode))]
    pub async fn capture(&mut self) -> Result<CaptureOutcome, SessionError> {
        if self.mode == CaptureMode::Photo && self.photo_taken {
            debug!("photo already taken this take");
            return Ok(CaptureOutcome::Ignored);
        }
        self.require(Phase::Capturing, Operation::Capture)?;

        match self.mode {
            CaptureMode::Photo => {
                let result = match &self.state {
                    State::Capturing { held, .. } => held.source().take_photo(held.handle()).await,
                    _ => return Err(self.rejected(Operation::Capture)),
                };
                let media = result.map_err(|e| self.fail_take(e))?;
                self.photo_taken = true;
                let elapsed = self.countdown.elapsed_secs();
                Ok(self.finish_capture(media, elapsed))
            }
            CaptureMode::Video => {
                if self.is_recording() {
                    let media = self.stop_recording().await?;
                    let elapsed = self.countdown.elapsed_secs();
                    Ok(self.finish_capture(media, elapsed))
                } else {
                    self.start_recording().await?;
                    Ok(CaptureOutcome::RecordingStarted)
                }
            }
        }
    }

    /// Share the reviewed media with a caption.
    ///
    /// Validation and sink failures leave the session reviewing with its
    /// media intact so the user can fix and resubmit.
    #[tracing::instrument(skip(self, caption), fields(session.id = %self.id, capture.mode = %self.mode))]
    pub async fn submit(&mut self, caption: &str, cross_post: bool) -> Result<MomentId, SessionError> {
        self.require(Phase::Reviewing, Operation::Submit)?;

        let caption = caption.trim();
        if caption.is_empty() {
            return Err(ValidationError::EmptyCaption.into());
        }

        let result = match &self.state {
            State::Reviewing {
                media,
                capture_seconds,
            } => {
                let submission = Submission {
                    caption,
                    media: media.as_ref(),
                    capture_seconds: *capture_seconds,
                    cross_post,
                };
                self.sink.submit(submission).await
            }
            _ => return Err(self.rejected(Operation::Submit)),
        };

        match result {
            Ok(moment_id) => {
                info!(moment.id = %moment_id, cross_post, "moment submitted");
                self.transition(State::Terminal(TerminalOutcome::Submitted(moment_id.clone())));
                Ok(moment_id)
            }
            Err(e) => {
                warn!(error = %e, "submission failed; staying in review");
                Err(e.into())
            }
        }
    }

    /// Throw away the reviewed media and return to idle.
    pub fn discard(&mut self) -> Result<(), SessionError> {
        self.require(Phase::Reviewing, Operation::Discard)?;
        self.photo_taken = false;
        self.transition(State::Idle);
        Ok(())
    }

    /// Tear down: release everything and end the session. Idempotent.
    pub fn abandon(&mut self) {
        if self.phase() != Phase::Terminal {
            self.transition(State::Terminal(TerminalOutcome::Abandoned));
        }
    }

    fn begin_capturing(&mut self) {
        // The handle moves straight across; this is not a pass through idle.
        if let State::Armed { held } = std::mem::replace(&mut self.state, State::Idle) {
            self.state = State::Capturing {
                held,
                recording: false,
            };
            self.log_transition(Phase::Armed, Phase::Capturing);
        }
    }

    async fn start_recording(&mut self) -> Result<(), SessionError> {
        let result = match &self.state {
            State::Capturing { held, .. } => held.source().start_recording(held.handle()).await,
            _ => return Err(self.rejected(Operation::Capture)),
        };
        result.map_err(|e| self.fail_take(e))?;
        if let State::Capturing { recording, .. } = &mut self.state {
            *recording = true;
        }
        info!(session.id = %self.id, "recording started");
        Ok(())
    }

    async fn stop_recording(&mut self) -> Result<MediaBlob, SessionError> {
        let result = match &self.state {
            State::Capturing { held, .. } => held.source().stop_recording(held.handle()).await,
            _ => return Err(self.rejected(Operation::Capture)),
        };
        result.map_err(|e| self.fail_take(e))
    }

    async fn on_timeout(&mut self) -> Result<TickOutcome, SessionError> {
        let window = self.countdown.window_secs();
        if self.is_recording() {
            info!(session.id = %self.id, "window elapsed; finalizing recording");
            let media = self.stop_recording().await?;
            self.finish_capture(media, window);
            Ok(TickOutcome::Finalized {
                capture_seconds: window,
            })
        } else {
            info!(session.id = %self.id, capture.mode = %self.mode, "window elapsed with nothing captured");
            self.transition(State::Terminal(TerminalOutcome::Expired));
            Ok(TickOutcome::Expired)
        }
    }

    fn finish_capture(&mut self, media: MediaBlob, capture_seconds: u32) -> CaptureOutcome {
        debug!(session.id = %self.id, media = ?media, capture_seconds, "media captured");
        self.transition(State::Reviewing {
            media: Arc::new(media),
            capture_seconds,
        });
        CaptureOutcome::Captured { capture_seconds }
    }

    /// A device failure mid-take: release everything and go back to idle.
    fn fail_take(&mut self, error: MediaAcquisitionError) -> SessionError {
        let error = match error {
            MediaAcquisitionError::CaptureFailed(_) => error,
            other => MediaAcquisitionError::CaptureFailed(other.to_string()),
        };
        warn!(session.id = %self.id, error = %error, "capture failed; take ended");
        self.photo_taken = false;
        self.transition(State::Idle);
        error.into()
    }

    fn transition(&mut self, next: State) {
        let from = self.state.phase();
        let to = next.phase();
        // Dropping the old state releases any held source and media.
        self.state = next;
        self.log_transition(from, to);
    }

    fn log_transition(&self, from: Phase, to: Phase) {
        info!(
            session.id = %self.id,
            capture.mode = %self.mode,
            phase.from = %from,
            phase.to = %to,
            "session transition"
        );
    }

    fn require(&self, phase: Phase, operation: Operation) -> Result<(), SessionError> {
        if self.phase() == phase {
            Ok(())
        } else {
            Err(self.rejected(operation))
        }
    }

    fn rejected(&self, operation: Operation) -> SessionError {
        let phase = self.phase();
        debug!(session.id = %self.id, %operation, %phase, "operation rejected");
        SessionError::InvalidTransition { operation, phase }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.holds_source() {
            debug!(session.id = %self.id, "session dropped while holding the camera");
        }
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("facing", &self.facing)
            .field("phase", &self.phase())
            .field("elapsed_secs", &self.countdown.elapsed_secs())
            .finish()
    }
}
