//! Countdown arithmetic and display helpers.

use serde::{Deserialize, Serialize};

/// Default capture window.
pub const DEFAULT_WINDOW_SECS: u32 = 60;

const WARNING_AT_SECS: u32 = 30;
const CRITICAL_AT_SECS: u32 = 10;

/// How close the countdown is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Calm,
    Warning,
    Critical,
}

impl Urgency {
    pub fn for_remaining(remaining_secs: u32) -> Self {
        if remaining_secs <= CRITICAL_AT_SECS {
            Urgency::Critical
        } else if remaining_secs <= WARNING_AT_SECS {
            Urgency::Warning
        } else {
            Urgency::Calm
        }
    }
}

/// Elapsed time within one take. Saturates at the window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    window_secs: u32,
    elapsed_secs: u32,
}

impl Countdown {
    pub fn new(window_secs: u32) -> Self {
        Self {
            window_secs: window_secs.max(1),
            elapsed_secs: 0,
        }
    }

    pub fn window_secs(&self) -> u32 {
        self.window_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.window_secs - self.elapsed_secs
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed_secs >= self.window_secs
    }

    pub fn urgency(&self) -> Urgency {
        Urgency::for_remaining(self.remaining_secs())
    }

    /// Advance one second. Returns true once the window is used up.
    pub(crate) fn advance(&mut self) -> bool {
        if self.elapsed_secs < self.window_secs {
            self.elapsed_secs += 1;
        }
        self.is_expired()
    }

    pub(crate) fn reset(&mut self) {
        self.elapsed_secs = 0;
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS)
    }
}

/// Render seconds as `m:ss`, e.g. `1:00`, `0:09`.
pub fn format_mmss(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
