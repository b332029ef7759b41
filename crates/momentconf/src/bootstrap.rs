//! Bootstrap configuration - seeds each capture session, then the session owns it.

use serde::{Deserialize, Serialize};

/// Capture window and session defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Length of the capture window in seconds.
    /// Default: 60
    #[serde(default = "CaptureConfig::default_window_secs")]
    pub window_secs: u32,

    /// Countdown tick period in milliseconds.
    /// Default: 1000
    #[serde(default = "CaptureConfig::default_tick_ms")]
    pub tick_ms: u64,

    /// Mode a fresh session starts in: "photo" or "video".
    #[serde(default = "CaptureConfig::default_mode")]
    pub default_mode: String,

    /// Camera a fresh session requests: "front" or "back".
    #[serde(default = "CaptureConfig::default_facing")]
    pub default_facing: String,

    /// Start video recording as soon as the countdown starts instead of
    /// waiting for the first shutter press.
    #[serde(default)]
    pub auto_record_video: bool,
}

impl CaptureConfig {
    fn default_window_secs() -> u32 {
        60
    }

    fn default_tick_ms() -> u64 {
        1000
    }

    fn default_mode() -> String {
        "photo".to_string()
    }

    fn default_facing() -> String {
        "front".to_string()
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_secs: Self::default_window_secs(),
            tick_ms: Self::default_tick_ms(),
            default_mode: Self::default_mode(),
            default_facing: Self::default_facing(),
            auto_record_video: false,
        }
    }
}

/// Cross-posting to an AT Protocol (Bluesky) account.
///
/// The app password is never read from files; it comes from
/// `MOMENTS_BLUESKY_APP_PASSWORD` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossPostConfig {
    /// XRPC service base URL.
    #[serde(default = "CrossPostConfig::default_service_url")]
    pub service_url: String,

    /// Account handle or DID used as the login identifier.
    #[serde(default)]
    pub handle: String,

    /// Whether the share prompt defaults to cross-posting.
    #[serde(default)]
    pub enabled: bool,

    /// Maximum characters of caption text sent in a post.
    #[serde(default = "CrossPostConfig::default_max_chars")]
    pub max_chars: usize,

    /// Request timeout in seconds.
    #[serde(default = "CrossPostConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(skip)]
    pub app_password: Option<String>,
}

impl CrossPostConfig {
    fn default_service_url() -> String {
        "https://bsky.social".to_string()
    }

    fn default_max_chars() -> usize {
        300
    }

    fn default_timeout_secs() -> u64 {
        15
    }

    /// True when both a handle and an app password are available.
    pub fn has_credentials(&self) -> bool {
        !self.handle.is_empty() && self.app_password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl Default for CrossPostConfig {
    fn default() -> Self {
        Self {
            service_url: Self::default_service_url(),
            handle: String::new(),
            enabled: false,
            max_chars: Self::default_max_chars(),
            timeout_secs: Self::default_timeout_secs(),
            app_password: None,
        }
    }
}

/// Bootstrap settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub crosspost: CrossPostConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_defaults() {
        let capture = CaptureConfig::default();
        assert_eq!(capture.window_secs, 60);
        assert_eq!(capture.tick_ms, 1000);
        assert_eq!(capture.default_mode, "photo");
        assert!(!capture.auto_record_video);
    }

    #[test]
    fn test_credentials_need_handle_and_password() {
        let mut crosspost = CrossPostConfig::default();
        assert!(!crosspost.has_credentials());

        crosspost.handle = "someone.bsky.social".to_string();
        assert!(!crosspost.has_credentials());

        crosspost.app_password = Some(String::new());
        assert!(!crosspost.has_credentials());

        crosspost.app_password = Some("abcd-efgh-ijkl-mnop".to_string());
        assert!(crosspost.has_credentials());
    }
}
