//! Explicit one-take confirmation.
//!
//! A session only arms with a [`Confirmation`], and the only way to get one
//! is to show the user a [`ConfirmationPrompt`] and call `confirm()` on it.

use crate::countdown::format_mmss;
use crate::mode::CaptureMode;

/// What the user must acknowledge before a take starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    mode: CaptureMode,
    window_secs: u32,
}

impl ConfirmationPrompt {
    pub(crate) fn new(mode: CaptureMode, window_secs: u32) -> Self {
        Self { mode, window_secs }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn window_secs(&self) -> u32 {
        self.window_secs
    }

    pub fn title(&self) -> &'static str {
        "This is your one chance"
    }

    pub fn message(&self) -> String {
        format!(
            "No retakes, no do-overs, no second chances. You'll have exactly {} seconds ({}) to capture your {}. When the timer ends, this moment is gone.",
            self.window_secs,
            format_mmss(self.window_secs),
            self.mode
        )
    }

    /// The user accepted the one-take rule.
    pub fn confirm(self) -> Confirmation {
        Confirmation { mode: self.mode }
    }
}

/// Proof that the user confirmed a take in a given mode.
#[derive(Debug, PartialEq, Eq)]
pub struct Confirmation {
    mode: CaptureMode,
}

impl Confirmation {
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_states_no_retakes() {
        let prompt = ConfirmationPrompt::new(CaptureMode::Video, 60);
        let message = prompt.message();
        assert!(message.contains("No retakes"));
        assert!(message.contains("60 seconds"));
        assert!(message.contains("video"));
        assert_eq!(prompt.confirm().mode(), CaptureMode::Video);
    }
}
