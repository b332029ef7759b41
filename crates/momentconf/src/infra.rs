//! Infrastructure configuration - where things live and how we report.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem locations for local moment storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for the moment ledger.
    /// Default: ~/.local/share/moments
    #[serde(default = "PathsConfig::default_state_dir")]
    pub state_dir: PathBuf,

    /// Content-addressed media directory.
    /// Default: ~/.local/share/moments/media
    #[serde(default = "PathsConfig::default_media_dir")]
    pub media_dir: PathBuf,
}

impl PathsConfig {
    fn default_state_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".local/share/moments"))
            .unwrap_or_else(|| PathBuf::from(".local/share/moments"))
    }

    fn default_media_dir() -> PathBuf {
        Self::default_state_dir().join("media")
    }

    /// Path of the JSON moment ledger inside the state directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir.join("moments.json")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: Self::default_state_dir(),
            media_dir: Self::default_media_dir(),
        }
    }
}

/// Logging and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,

    /// Explicit consent to export diagnostics off-box. Nothing leaves the
    /// process unless this is true.
    /// Default: false
    #[serde(default)]
    pub share_diagnostics: bool,

    /// OTLP gRPC endpoint used when diagnostics sharing is enabled.
    /// Default: 127.0.0.1:4317
    #[serde(default = "TelemetryConfig::default_otlp_endpoint")]
    pub otlp_endpoint: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_otlp_endpoint() -> String {
        "127.0.0.1:4317".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            share_diagnostics: false,
            otlp_endpoint: Self::default_otlp_endpoint(),
        }
    }
}

/// Infrastructure settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
