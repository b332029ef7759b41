//! Everything a command needs, built once from configuration.

use anyhow::{Context, Result};
use keepsake::{Author, LocalSink, MediaStore, MomentLedger};
use momentconf::{ConfigSources, MomentsConfig};
use shutter::{CaptureMode, DriverConfig, Facing, SessionConfig};
use skypost::{BlueskyClient, Credentials};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct AppContext {
    pub config: MomentsConfig,
    pub sources: ConfigSources,
}

impl AppContext {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let (config, sources) = MomentsConfig::load_with_sources_from(config_path)
            .context("Failed to load configuration")?;
        Ok(Self { config, sources })
    }

    /// Session settings from config, with optional per-run overrides.
    pub fn session_config(
        &self,
        mode: Option<CaptureMode>,
        facing: Option<Facing>,
    ) -> Result<SessionConfig> {
        let capture = &self.config.bootstrap.capture;
        let mode = match mode {
            Some(mode) => mode,
            None => capture
                .default_mode
                .parse::<CaptureMode>()
                .context("Invalid capture.default_mode in config")?,
        };
        let facing = match facing {
            Some(facing) => facing,
            None => capture
                .default_facing
                .parse::<Facing>()
                .context("Invalid capture.default_facing in config")?,
        };

        Ok(SessionConfig {
            window_secs: capture.window_secs,
            mode,
            facing,
            auto_record_video: capture.auto_record_video,
        })
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            tick_period: Duration::from_millis(self.config.bootstrap.capture.tick_ms.max(1)),
            ..DriverConfig::default()
        }
    }

    pub fn open_ledger(&self) -> Result<MomentLedger> {
        let path = self.config.infra.paths.ledger_path();
        MomentLedger::open(&path)
            .with_context(|| format!("Failed to open moment ledger at {}", path.display()))
    }

    /// A sink that stores under the configured paths as `author`, cross-posting
    /// when an account is configured.
    pub fn local_sink(&self, author: Author) -> Result<LocalSink> {
        let media_dir = &self.config.infra.paths.media_dir;
        let media = MediaStore::open(media_dir)
            .with_context(|| format!("Failed to open media store at {}", media_dir.display()))?;
        let ledger = self.open_ledger()?;

        let mut sink = LocalSink::new(Arc::new(media), Arc::new(ledger)).with_author(author);
        if let Some(client) = self.bluesky_client() {
            sink = sink.with_cross_poster(Arc::new(client));
        }
        Ok(sink)
    }

    pub fn bluesky_credentials(&self) -> Option<Credentials> {
        let crosspost = &self.config.bootstrap.crosspost;
        if !crosspost.has_credentials() {
            return None;
        }
        let password = crosspost.app_password.clone()?;
        Some(Credentials::new(crosspost.handle.clone(), password))
    }

    pub fn bluesky_client(&self) -> Option<BlueskyClient> {
        let crosspost = &self.config.bootstrap.crosspost;
        let credentials = self.bluesky_credentials()?;
        Some(
            BlueskyClient::new(&crosspost.service_url)
                .with_credentials(credentials)
                .with_max_chars(crosspost.max_chars)
                .with_timeout(Duration::from_secs(crosspost.timeout_secs)),
        )
    }
}

/// The local user, from `--author`/`MOMENTS_AUTHOR` or the login name.
pub fn local_author(name: Option<&str>) -> Author {
    let name = name
        .map(str::to_string)
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "me".to_string());
    Author::new(name.trim().to_lowercase(), name.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AppContext {
        AppContext {
            config: MomentsConfig::default(),
            sources: ConfigSources::default(),
        }
    }

    #[test]
    fn test_session_config_from_defaults() {
        let config = context().session_config(None, None).unwrap();
        assert_eq!(config.window_secs, 60);
        assert_eq!(config.mode, CaptureMode::Photo);
        assert_eq!(config.facing, Facing::Front);
    }

    #[test]
    fn test_session_config_overrides() {
        let config = context()
            .session_config(Some(CaptureMode::Video), Some(Facing::Back))
            .unwrap();
        assert_eq!(config.mode, CaptureMode::Video);
        assert_eq!(config.facing, Facing::Back);
    }

    #[test]
    fn test_bad_default_mode_is_an_error() {
        let mut ctx = context();
        ctx.config.bootstrap.capture.default_mode = "panorama".to_string();
        assert!(ctx.session_config(None, None).is_err());
    }

    #[test]
    fn test_no_client_without_password() {
        let mut ctx = context();
        ctx.config.bootstrap.crosspost.handle = "river.bsky.social".to_string();
        assert!(ctx.bluesky_client().is_none());

        ctx.config.bootstrap.crosspost.app_password = Some("abcd-efgh".to_string());
        assert!(ctx.bluesky_credentials().is_some());
    }

    #[test]
    fn test_explicit_author_name() {
        let author = local_author(Some(" River "));
        assert_eq!(author.id, "river");
        assert_eq!(author.display_name, "River");
    }

    #[test]
    fn test_driver_tick_from_config() {
        let mut ctx = context();
        ctx.config.bootstrap.capture.tick_ms = 250;
        assert_eq!(ctx.driver_config().tick_period, Duration::from_millis(250));
    }
}
