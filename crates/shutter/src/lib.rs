//! One-take capture sessions for Authentic Moments.
//!
//! A [`CaptureSession`] walks a single moment through
//! idle → armed → capturing → reviewing → submitted, with a hard 60 second
//! window and no retakes. The camera is reached only through the
//! [`MediaSource`] trait and finished moments leave only through the
//! [`SubmissionSink`] trait, so the same controller backs any shell.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shutter::memory::{MemorySink, ScriptedSource};
//! use shutter::{CaptureSession, SessionConfig};
//!
//! # async fn demo() -> Result<(), shutter::SessionError> {
//! let mut session = CaptureSession::new(
//!     SessionConfig::default(),
//!     Arc::new(ScriptedSource::new()),
//!     Arc::new(MemorySink::new()),
//! );
//!
//! let prompt = session.confirmation_prompt()?;
//! println!("{}", prompt.message());
//! session.request_start(prompt.confirm()).await?;
//! session.tick().await?;
//! session.capture().await?;
//! session.submit("sunset from the roof", false).await?;
//! # Ok(())
//! # }
//! ```
//!
//! For a live countdown, hand the session to [`driver::spawn_session`].

pub mod confirm;
pub mod countdown;
pub mod driver;
pub mod error;
pub mod media;
pub mod memory;
pub mod mode;
pub mod session;
pub mod sink;

pub use confirm::{Confirmation, ConfirmationPrompt};
pub use countdown::{format_mmss, Countdown, Urgency, DEFAULT_WINDOW_SECS};
pub use driver::{spawn_session, DriverConfig, SessionEvent, SessionHandle};
pub use error::{MediaAcquisitionError, Operation, SessionError, ValidationError};
pub use media::{MediaBlob, MediaKind, MediaSource, MediaSourceHandle, PreviewHandle};
pub use mode::{CaptureMode, Facing, MediaConstraints, ParseNameError};
pub use session::{
    CaptureOutcome, CaptureSession, Phase, SessionConfig, SessionSnapshot, TerminalOutcome,
    TickOutcome,
};
pub use sink::{MomentId, Submission, SubmissionError, SubmissionSink};
