//! `moments capture`: one take against a replayed camera.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use owo_colors::OwoColorize;
use shutter::{
    format_mmss, spawn_session, CaptureMode, CaptureOutcome, CaptureSession, ConfirmationPrompt,
    Facing, MomentId, Phase, SessionError, SessionEvent, SessionHandle, TerminalOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::{local_author, AppContext};
use crate::replay::ReplaySource;
use crate::trigger::Trigger;
use crate::ui::{self, CountdownBar};

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Image or clip that stands in for the camera
    #[arg(long, value_name = "FILE")]
    pub media: PathBuf,

    /// photo or video (default from config)
    #[arg(long)]
    pub mode: Option<CaptureMode>,

    /// front or back (default from config)
    #[arg(long)]
    pub facing: Option<Facing>,

    /// Name the moment is shared under
    #[arg(long, env = "MOMENTS_AUTHOR")]
    pub author: Option<String>,

    /// Accept the one-take confirmation and run without prompts
    #[arg(long, requires = "caption")]
    pub yes: bool,

    /// Countdown second at which to press the shutter (with --yes)
    #[arg(long, value_name = "SECS", requires = "yes")]
    pub shoot_at: Option<u32>,

    /// Countdown second at which to stop recording (with --yes, video)
    #[arg(long, value_name = "SECS", requires = "shoot_at")]
    pub stop_at: Option<u32>,

    /// Caption to share with (with --yes)
    #[arg(long)]
    pub caption: Option<String>,

    /// Also post the caption to Bluesky (with --yes)
    #[arg(long)]
    pub cross_post: bool,
}

/// Answers for a run without prompts.
struct Script {
    caption: String,
    cross_post: bool,
}

enum TakeEnd {
    /// `window_closed` is false when a shutter press ended the take.
    Review { window_closed: bool },
    Expired,
    Failed(String),
    Abandoned,
}

enum ReviewEnd {
    Shared(MomentId),
    Discarded,
}

pub async fn run(ctx: &AppContext, args: CaptureArgs) -> Result<()> {
    debug!(media = %args.media.display(), "replaying media file as camera");

    let session_config = ctx.session_config(args.mode, args.facing)?;
    let window_secs = session_config.window_secs;
    let author = local_author(args.author.as_deref());
    let sink = ctx.local_sink(author)?;
    let source = ReplaySource::new(&args.media);

    let session = CaptureSession::new(session_config, Arc::new(source), Arc::new(sink));
    let cancel = CancellationToken::new();
    let driver = ctx.driver_config();
    let tick_period = driver.tick_period;
    let handle = spawn_session(session, driver, cancel.clone());
    info!(session.id = %handle.session_id(), "capture session started");

    // Ctrl-C abandons the session; the driver releases the camera.
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let (script, trigger) = if args.yes {
        let caption = args.caption.clone().context("--yes needs --caption")?;
        // Half a tick past the requested second so the press lands between ticks.
        let offsets = args
            .shoot_at
            .into_iter()
            .chain(args.stop_at)
            .map(|secs| tick_period * secs + tick_period / 2);
        (
            Some(Script {
                caption,
                cross_post: args.cross_post,
            }),
            Trigger::scheduled(offsets),
        )
    } else {
        (None, Trigger::keyboard())
    };

    let mut flow = CaptureFlow {
        ctx,
        handle: &handle,
        trigger,
        script,
        window_secs,
    };
    let result = flow.run().await;

    if let Some(snapshot) = handle.shutdown().await {
        debug!(phase = %snapshot.phase, "capture session closed");
    }
    result
}

struct CaptureFlow<'a> {
    ctx: &'a AppContext,
    handle: &'a SessionHandle,
    trigger: Trigger,
    script: Option<Script>,
    window_secs: u32,
}

impl CaptureFlow<'_> {
    fn interactive(&self) -> bool {
        self.script.is_none()
    }

    async fn run(&mut self) -> Result<()> {
        loop {
            let prompt = self.handle.confirmation_prompt().await?;
            let mode = prompt.mode();
            if !self.confirm(&prompt)? {
                println!("Take your time. Your moment will wait.");
                return Ok(());
            }

            let mut events = self.handle.subscribe();
            if let Err(e) = self.handle.request_start(prompt.confirm()).await {
                ui::failure(e.user_message());
                if e.is_retryable() && self.ask("Try again?", true)? {
                    continue;
                }
                return Err(anyhow!(e).context("Could not start the camera"));
            }

            let review_hint = match self.take(&mut events, mode).await? {
                TakeEnd::Review { window_closed } => review_hint(window_closed),
                TakeEnd::Expired => {
                    println!("{}", "Time's up. This moment has passed.".yellow());
                    self.release_keyboard("Press Enter to finish.").await;
                    return Ok(());
                }
                TakeEnd::Failed(message) => {
                    ui::failure(message);
                    self.release_keyboard("Press Enter to continue.").await;
                    if self.ask("Start a new take?", true)? {
                        continue;
                    }
                    bail!("Capture failed");
                }
                TakeEnd::Abandoned => {
                    println!("Capture abandoned.");
                    return Ok(());
                }
            };

            self.release_keyboard(review_hint).await;

            match self.review().await? {
                ReviewEnd::Shared(id) => {
                    ui::success(format!("Moment shared ({})", id));
                    return Ok(());
                }
                ReviewEnd::Discarded => {
                    println!("Moment discarded.");
                    if self.ask("Start a new take?", false)? {
                        continue;
                    }
                    return Ok(());
                }
            }
        }
    }

    fn confirm(&self, prompt: &ConfirmationPrompt) -> Result<bool> {
        println!("{}", prompt.title().bright_white().bold());
        println!("{}", prompt.message());
        if !self.interactive() {
            return Ok(true);
        }
        Ok(Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("I'm ready")
            .default(false)
            .interact()?)
    }

    /// Yes/no question; scripted runs always answer no.
    fn ask(&self, question: &str, default: bool) -> Result<bool> {
        if !self.interactive() {
            return Ok(false);
        }
        Ok(Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .default(default)
            .interact()?)
    }

    /// Finish a stdin read left over from the take so prompts get the keyboard back.
    async fn release_keyboard(&mut self, message: &str) {
        if self.trigger.is_waiting() {
            println!("{}", message);
            self.trigger.pressed().await;
        }
    }

    async fn take(
        &mut self,
        events: &mut broadcast::Receiver<SessionEvent>,
        mode: CaptureMode,
    ) -> Result<TakeEnd> {
        let bar = CountdownBar::new(self.window_secs)?;
        let mut capturing = false;
        let mut pressed_to_review = false;
        let mut last_error: Option<String> = None;

        let end = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(SessionEvent::PhaseChanged { from, to, .. }) => match to {
                        Phase::Capturing => {
                            capturing = true;
                            self.trigger.arm();
                            if self.interactive() {
                                let hint = match mode {
                                    CaptureMode::Photo => "Press Enter to take your photo.",
                                    CaptureMode::Video => "Press Enter to start recording.",
                                };
                                bar.println(hint);
                            }
                        }
                        Phase::Reviewing => break TakeEnd::Review {
                            window_closed: !pressed_to_review,
                        },
                        Phase::Idle if matches!(from, Phase::Armed | Phase::Capturing) => {
                            break TakeEnd::Failed(last_error.take().unwrap_or_else(|| {
                                "Something went wrong while capturing.".to_string()
                            }));
                        }
                        _ => {}
                    },
                    Ok(SessionEvent::Countdown { elapsed_secs, remaining_secs, urgency, .. }) => {
                        bar.update(elapsed_secs, remaining_secs, urgency);
                    }
                    Ok(SessionEvent::RecordingStarted) => {
                        let line = if self.interactive() {
                            "● Recording. Press Enter to stop."
                        } else {
                            "● Recording."
                        };
                        bar.println(line.bright_red().to_string());
                    }
                    Ok(SessionEvent::Error { message, .. }) => last_error = Some(message),
                    Ok(SessionEvent::Ended { outcome }) => {
                        break match outcome {
                            TerminalOutcome::Expired => TakeEnd::Expired,
                            _ => TakeEnd::Abandoned,
                        };
                    }
                    Ok(SessionEvent::Submitted { .. }) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "countdown display fell behind");
                    }
                    Err(RecvError::Closed) => break TakeEnd::Abandoned,
                },

                _ = self.trigger.pressed(), if capturing => {
                    match self.handle.capture().await {
                        Ok(CaptureOutcome::Captured { capture_seconds }) => {
                            debug!(capture_seconds, "shutter pressed");
                            pressed_to_review = true;
                        }
                        Ok(_) => {}
                        // The window closed between the press and the command.
                        Err(SessionError::InvalidTransition { .. }) => {}
                        Err(e) => last_error = Some(e.user_message()),
                    }
                }
            }
        };

        bar.finish();
        Ok(end)
    }

    async fn review(&mut self) -> Result<ReviewEnd> {
        let snapshot = self.handle.snapshot().await?;
        if let Some(blob) = self.handle.preview().await?.and_then(|p| p.get()) {
            println!(
                "Captured a {} ({} bytes) at {}",
                blob.kind().as_str(),
                blob.len(),
                format_mmss(snapshot.capture_seconds.unwrap_or_default()),
            );
        }

        if let Some(script) = &self.script {
            let id = self
                .handle
                .submit(script.caption.clone(), script.cross_post)
                .await
                .map_err(|e| anyhow!(e.user_message()))
                .context("Could not share moment")?;
            return Ok(ReviewEnd::Shared(id));
        }

        let crosspost = &self.ctx.config.bootstrap.crosspost;
        let can_cross_post = crosspost.has_credentials();
        let theme = ColorfulTheme::default();

        loop {
            let caption: String = Input::with_theme(&theme)
                .with_prompt("Caption")
                .allow_empty(true)
                .interact_text()?;

            let choice = Select::with_theme(&theme)
                .with_prompt("Share this moment?")
                .items(&["Share", "Discard"])
                .default(0)
                .interact()?;
            if choice == 1 {
                let sure = Confirm::with_theme(&theme)
                    .with_prompt("Discard it? There are no retakes.")
                    .default(false)
                    .interact()?;
                if sure {
                    self.handle.discard().await?;
                    return Ok(ReviewEnd::Discarded);
                }
                continue;
            }

            let cross_post = can_cross_post
                && Confirm::with_theme(&theme)
                    .with_prompt(format!("Also post the caption to Bluesky as @{}?", crosspost.handle))
                    .default(crosspost.enabled)
                    .interact()?;

            match self.handle.submit(caption, cross_post).await {
                Ok(id) => return Ok(ReviewEnd::Shared(id)),
                Err(e) if e.is_retryable() => ui::failure(e.user_message()),
                Err(e) => return Err(anyhow!(e).context("Could not share moment")),
            }
        }
    }
}

/// What to say while waiting for a stdin read left over from the take.
fn review_hint(window_closed: bool) -> &'static str {
    if window_closed {
        "Time's up. Press Enter to review your moment."
    } else {
        "Press Enter to review your moment."
    }
}
