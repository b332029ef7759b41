//! Capture mode, camera facing, and the media constraints derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a take produces: one still or one continuous clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Photo,
    Video,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Photo => "photo",
            CaptureMode::Video => "video",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which physical camera is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Selfie camera ("user" facing).
    #[default]
    Front,
    /// Rear camera ("environment" facing).
    Back,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Front => "front",
            Facing::Back => "back",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for unrecognized mode or facing names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

impl FromStr for CaptureMode {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" | "image" | "still" => Ok(CaptureMode::Photo),
            "video" | "clip" => Ok(CaptureMode::Video),
            _ => Err(ParseNameError {
                kind: "capture mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Facing {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(Facing::Front),
            "back" | "rear" | "environment" => Ok(Facing::Back),
            _ => Err(ParseNameError {
                kind: "camera facing",
                value: s.to_string(),
            }),
        }
    }
}

/// Constraints passed to [`crate::MediaSource::acquire`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl MediaConstraints {
    /// Video takes need a microphone track; stills only need the camera.
    pub fn for_mode(mode: CaptureMode, facing: Facing) -> Self {
        Self {
            video: true,
            audio: mode == CaptureMode::Video,
            facing,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}
