//! Layered configuration loading for Authentic Moments.
//!
//! Every crate in the workspace that needs settings reads them through this
//! one, so it keeps its dependencies small.
//!
//! # Configuration Philosophy
//!
//! - **Infrastructure** (`InfraConfig`): where data lives and how the process
//!   reports - paths, log level, diagnostics consent.
//!
//! - **Bootstrap** (`BootstrapConfig`): values that seed a capture session or
//!   the share step - window length, default mode and camera, cross-post
//!   account. A running session owns its copy.
//!
//! # Usage
//!
//! ```rust,no_run
//! use momentconf::MomentsConfig;
//!
//! let config = MomentsConfig::load().expect("Failed to load config");
//! println!("Media dir: {}", config.infra.paths.media_dir.display());
//! println!("Window: {}s", config.bootstrap.capture.window_secs);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/moments/config.toml` (system)
//! 2. `~/.config/moments/config.toml` (user)
//! 3. `./moments.toml` or `--config PATH` (local override)
//! 4. Environment variables (`MOMENTS_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! state_dir = "~/.local/share/moments"
//! media_dir = "~/.local/share/moments/media"
//!
//! [telemetry]
//! log_level = "info"
//! share_diagnostics = false
//!
//! [capture]
//! window_secs = 60
//! default_mode = "photo"
//! default_facing = "front"
//!
//! [crosspost]
//! service_url = "https://bsky.social"
//! handle = "me.bsky.social"
//! ```

pub mod bootstrap;
pub mod infra;
pub mod loader;

pub use bootstrap::{BootstrapConfig, CaptureConfig, CrossPostConfig};
pub use infra::{InfraConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentsConfig {
    #[serde(flatten)]
    pub infra: InfraConfig,

    #[serde(flatten)]
    pub bootstrap: BootstrapConfig,
}

impl MomentsConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit local override file.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let files = loader::discover_config_files_with_override(config_path);
        let mut config = Self::load_layers(files, &mut sources)?;

        loader::apply_env_overrides(&mut config, &mut sources)?;

        Ok((config, sources))
    }

    /// Merge config files in order, later keys winning, then fill in defaults.
    pub(crate) fn load_layers(
        files: Vec<PathBuf>,
        sources: &mut ConfigSources,
    ) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        for path in files {
            let layer = loader::load_from_file(&path)?;
            loader::merge_tables(&mut merged, layer);
            sources.files.push(path);
        }

        let origin = sources
            .files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        loader::config_from_table(merged, &origin)
    }

    /// Render the effective config as TOML. The app password is never written.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Authentic Moments Configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!("state_dir = \"{}\"\n", self.infra.paths.state_dir.display()));
        output.push_str(&format!("media_dir = \"{}\"\n", self.infra.paths.media_dir.display()));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.infra.telemetry.log_level));
        output.push_str(&format!(
            "share_diagnostics = {}\n",
            self.infra.telemetry.share_diagnostics
        ));
        output.push_str(&format!(
            "otlp_endpoint = \"{}\"\n",
            self.infra.telemetry.otlp_endpoint
        ));

        let capture = &self.bootstrap.capture;
        output.push_str("\n[capture]\n");
        output.push_str(&format!("window_secs = {}\n", capture.window_secs));
        output.push_str(&format!("tick_ms = {}\n", capture.tick_ms));
        output.push_str(&format!("default_mode = \"{}\"\n", capture.default_mode));
        output.push_str(&format!("default_facing = \"{}\"\n", capture.default_facing));
        output.push_str(&format!("auto_record_video = {}\n", capture.auto_record_video));

        let crosspost = &self.bootstrap.crosspost;
        output.push_str("\n[crosspost]\n");
        output.push_str(&format!("service_url = \"{}\"\n", crosspost.service_url));
        output.push_str(&format!("handle = \"{}\"\n", crosspost.handle));
        output.push_str(&format!("enabled = {}\n", crosspost.enabled));
        output.push_str(&format!("max_chars = {}\n", crosspost.max_chars));
        output.push_str(&format!("timeout_secs = {}\n", crosspost.timeout_secs));

        output
    }
}
