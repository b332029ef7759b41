//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, MomentsConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/moments/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("moments/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("moments.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load one config file as a raw TOML table.
///
/// The file is also checked against the config schema on its own, so a bad
/// value is reported against the file that holds it.
pub fn load_from_file(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let table = parse_table(&contents, path)?;
    config_from_table(table.clone(), path)?;
    Ok(table)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse config from a TOML string. Missing keys take their defaults.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<MomentsConfig, ConfigError> {
    config_from_table(parse_table(contents, path)?, path)
}

/// Build a config from a (possibly merged) table. Absent keys take their defaults.
pub fn config_from_table(table: toml::Table, path: &Path) -> Result<MomentsConfig, ConfigError> {
    let mut config: MomentsConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let paths = &mut config.infra.paths;
    paths.state_dir = expand_path(&paths.state_dir.to_string_lossy());
    paths.media_dir = expand_path(&paths.media_dir.to_string_lossy());

    Ok(config)
}

/// Overlay one table onto another, key by key.
///
/// Any key present in `overlay` wins, even when it holds the default value.
/// Nested tables merge recursively; everything else is replaced whole.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut MomentsConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |key| env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup (environment in production, a map in tests).
///
/// Only keys that were actually applied are recorded in `sources`.
pub(crate) fn apply_overrides_from<F>(
    config: &mut MomentsConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = |key: &str| sources.env_overrides.push(key.to_string());

    if let Some(v) = lookup("MOMENTS_STATE_DIR") {
        config.infra.paths.state_dir = expand_path(&v);
        applied("MOMENTS_STATE_DIR");
    }
    if let Some(v) = lookup("MOMENTS_MEDIA_DIR") {
        config.infra.paths.media_dir = expand_path(&v);
        applied("MOMENTS_MEDIA_DIR");
    }

    if let Some(v) = lookup("MOMENTS_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        applied("MOMENTS_LOG_LEVEL");
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.infra.telemetry.log_level = v;
        applied("RUST_LOG");
    }
    if let Some(v) = lookup("MOMENTS_SHARE_DIAGNOSTICS") {
        config.infra.telemetry.share_diagnostics = parse_bool("MOMENTS_SHARE_DIAGNOSTICS", &v)?;
        applied("MOMENTS_SHARE_DIAGNOSTICS");
    }
    if let Some(v) = lookup("MOMENTS_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = v;
        applied("MOMENTS_OTLP_ENDPOINT");
    }

    if let Some(v) = lookup("MOMENTS_WINDOW_SECS") {
        config.bootstrap.capture.window_secs =
            v.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "MOMENTS_WINDOW_SECS".to_string(),
                value: v.clone(),
            })?;
        applied("MOMENTS_WINDOW_SECS");
    }
    if let Some(v) = lookup("MOMENTS_DEFAULT_MODE") {
        config.bootstrap.capture.default_mode = v;
        applied("MOMENTS_DEFAULT_MODE");
    }
    if let Some(v) = lookup("MOMENTS_DEFAULT_FACING") {
        config.bootstrap.capture.default_facing = v;
        applied("MOMENTS_DEFAULT_FACING");
    }

    if let Some(v) = lookup("MOMENTS_BLUESKY_SERVICE") {
        config.bootstrap.crosspost.service_url = v;
        applied("MOMENTS_BLUESKY_SERVICE");
    }
    if let Some(v) = lookup("MOMENTS_BLUESKY_HANDLE") {
        config.bootstrap.crosspost.handle = v;
        applied("MOMENTS_BLUESKY_HANDLE");
    }
    if let Some(v) = lookup("MOMENTS_BLUESKY_APP_PASSWORD") {
        config.bootstrap.crosspost.app_password = Some(v);
        applied("MOMENTS_BLUESKY_APP_PASSWORD");
    }

    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
