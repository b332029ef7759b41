//! Run a [`CaptureSession`] on its own task.
//!
//! The session stays the single writer: commands arrive over an mpsc channel
//! and are applied one at a time, interleaved with countdown ticks from a
//! `tokio::time::interval`. Observers follow along on a broadcast channel.
//! Cancelling the token or dropping the [`SessionHandle`] abandons the
//! session, which releases the camera.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::confirm::{Confirmation, ConfirmationPrompt};
use crate::countdown::{format_mmss, Urgency};
use crate::error::SessionError;
use crate::media::PreviewHandle;
use crate::mode::{CaptureMode, Facing};
use crate::session::{
    CaptureOutcome, CaptureSession, Phase, SessionSnapshot, TerminalOutcome, TickOutcome,
};
use crate::sink::MomentId;

/// Driver tuning.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Countdown tick period. One tick is one second of countdown.
    pub tick_period: Duration,
    /// Broadcast buffer; slow observers past this lag and miss events.
    pub event_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            event_capacity: 64,
        }
    }
}

/// What observers of a running session see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged {
        session_id: Uuid,
        from: Phase,
        to: Phase,
    },
    Countdown {
        elapsed_secs: u32,
        remaining_secs: u32,
        display: String,
        urgency: Urgency,
    },
    RecordingStarted,
    Error {
        message: String,
        retryable: bool,
    },
    Submitted {
        moment_id: MomentId,
    },
    Ended {
        outcome: TerminalOutcome,
    },
}

enum Command {
    SelectMode(CaptureMode, oneshot::Sender<Result<(), SessionError>>),
    ToggleFacing(oneshot::Sender<Result<Facing, SessionError>>),
    Prompt(oneshot::Sender<Result<ConfirmationPrompt, SessionError>>),
    Start(Confirmation, oneshot::Sender<Result<(), SessionError>>),
    Capture(oneshot::Sender<Result<CaptureOutcome, SessionError>>),
    Submit {
        caption: String,
        cross_post: bool,
        reply: oneshot::Sender<Result<MomentId, SessionError>>,
    },
    Discard(oneshot::Sender<Result<(), SessionError>>),
    Preview(oneshot::Sender<Option<PreviewHandle>>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Abandon(oneshot::Sender<()>),
}

/// Client side of a spawned session.
pub struct SessionHandle {
    session_id: Uuid,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
    task: JoinHandle<SessionSnapshot>,
}

/// Spawn `session` onto the current tokio runtime.
pub fn spawn_session(
    session: CaptureSession,
    config: DriverConfig,
    cancel: CancellationToken,
) -> SessionHandle {
    let session_id = session.id();
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

    let task = tokio::spawn(run_session(
        session,
        config.tick_period,
        command_rx,
        event_tx.clone(),
        cancel.clone(),
    ));

    SessionHandle {
        session_id,
        commands: command_tx,
        events: event_tx,
        cancel,
        task,
    }
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn select_mode(&self, mode: CaptureMode) -> Result<(), SessionError> {
        self.request(|reply| Command::SelectMode(mode, reply)).await?
    }

    pub async fn toggle_facing(&self) -> Result<Facing, SessionError> {
        self.request(Command::ToggleFacing).await?
    }

    pub async fn confirmation_prompt(&self) -> Result<ConfirmationPrompt, SessionError> {
        self.request(Command::Prompt).await?
    }

    pub async fn request_start(&self, confirmation: Confirmation) -> Result<(), SessionError> {
        self.request(|reply| Command::Start(confirmation, reply)).await?
    }

    pub async fn capture(&self) -> Result<CaptureOutcome, SessionError> {
        self.request(Command::Capture).await?
    }

    pub async fn submit(
        &self,
        caption: impl Into<String>,
        cross_post: bool,
    ) -> Result<MomentId, SessionError> {
        let caption = caption.into();
        self.request(|reply| Command::Submit {
            caption,
            cross_post,
            reply,
        })
        .await?
    }

    pub async fn discard(&self) -> Result<(), SessionError> {
        self.request(Command::Discard).await?
    }

    pub async fn preview(&self) -> Result<Option<PreviewHandle>, SessionError> {
        self.request(Command::Preview).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Snapshot).await
    }

    pub async fn abandon(&self) -> Result<(), SessionError> {
        self.request(Command::Abandon).await
    }

    /// Cancel the session and wait for the driver to finish.
    pub async fn shutdown(self) -> Option<SessionSnapshot> {
        self.cancel.cancel();
        match self.task.await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(session.id = %self.session_id, error = %e, "session driver task failed");
                None
            }
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}

async fn run_session(
    mut session: CaptureSession,
    tick_period: Duration,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
) -> SessionSnapshot {
    let mut ticker: Option<Interval> = None;
    debug!(session.id = %session.id(), "session driver started");

    loop {
        let before = session.phase();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(session.id = %session.id(), "session driver cancelled");
                session.abandon();
                emit_phase_change(&session, before, &events);
                break;
            }

            command = commands.recv() => {
                match command {
                    Some(command) => apply_command(&mut session, command, &events).await,
                    None => {
                        debug!(session.id = %session.id(), "session handle dropped");
                        session.abandon();
                        emit_phase_change(&session, before, &events);
                        break;
                    }
                }
            }

            _ = next_tick(&mut ticker) => {
                apply_tick(&mut session, &events).await;
            }
        }

        emit_phase_change(&session, before, &events);

        match session.phase() {
            Phase::Armed | Phase::Capturing => {
                if ticker.is_none() {
                    // A fresh interval fires immediately, which arms → capturing.
                    let mut interval = tokio::time::interval(tick_period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker = Some(interval);
                }
            }
            _ => ticker = None,
        }
    }

    session.snapshot()
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn apply_tick(session: &mut CaptureSession, events: &broadcast::Sender<SessionEvent>) {
    let was_recording = session.is_recording();
    match session.tick().await {
        Ok(TickOutcome::Ignored) => {}
        Ok(TickOutcome::Started { .. } | TickOutcome::Counting { .. }) => {
            emit_countdown(session, events);
            if session.is_recording() && !was_recording {
                let _ = events.send(SessionEvent::RecordingStarted);
            }
        }
        Ok(TickOutcome::Finalized { .. } | TickOutcome::Expired) => {
            emit_countdown(session, events);
        }
        Err(e) => emit_error(&e, events),
    }
}

async fn apply_command(
    session: &mut CaptureSession,
    command: Command,
    events: &broadcast::Sender<SessionEvent>,
) {
    match command {
        Command::SelectMode(mode, reply) => {
            let _ = reply.send(session.select_mode(mode));
        }
        Command::ToggleFacing(reply) => {
            let _ = reply.send(session.toggle_facing());
        }
        Command::Prompt(reply) => {
            let _ = reply.send(session.confirmation_prompt());
        }
        Command::Start(confirmation, reply) => {
            let result = session.request_start(confirmation).await;
            if let Err(e) = &result {
                emit_error(e, events);
            }
            let _ = reply.send(result);
        }
        Command::Capture(reply) => {
            let result = session.capture().await;
            match &result {
                Ok(CaptureOutcome::RecordingStarted) => {
                    let _ = events.send(SessionEvent::RecordingStarted);
                }
                Err(e) => emit_error(e, events),
                Ok(_) => {}
            }
            let _ = reply.send(result);
        }
        Command::Submit {
            caption,
            cross_post,
            reply,
        } => {
            let result = session.submit(&caption, cross_post).await;
            match &result {
                Ok(moment_id) => {
                    let _ = events.send(SessionEvent::Submitted {
                        moment_id: moment_id.clone(),
                    });
                }
                Err(e) => emit_error(e, events),
            }
            let _ = reply.send(result);
        }
        Command::Discard(reply) => {
            let _ = reply.send(session.discard());
        }
        Command::Preview(reply) => {
            let _ = reply.send(session.preview());
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(session.snapshot());
        }
        Command::Abandon(reply) => {
            session.abandon();
            let _ = reply.send(());
        }
    }
}

fn emit_countdown(session: &CaptureSession, events: &broadcast::Sender<SessionEvent>) {
    let countdown = session.countdown();
    let _ = events.send(SessionEvent::Countdown {
        elapsed_secs: countdown.elapsed_secs(),
        remaining_secs: countdown.remaining_secs(),
        display: format_mmss(countdown.remaining_secs()),
        urgency: countdown.urgency(),
    });
}

fn emit_error(error: &SessionError, events: &broadcast::Sender<SessionEvent>) {
    let _ = events.send(SessionEvent::Error {
        message: error.user_message(),
        retryable: error.is_retryable(),
    });
}

fn emit_phase_change(
    session: &CaptureSession,
    before: Phase,
    events: &broadcast::Sender<SessionEvent>,
) {
    let after = session.phase();
    if after == before {
        return;
    }
    let _ = events.send(SessionEvent::PhaseChanged {
        session_id: session.id(),
        from: before,
        to: after,
    });
    if let Some(outcome) = session.outcome() {
        let _ = events.send(SessionEvent::Ended {
            outcome: outcome.clone(),
        });
    }
}
