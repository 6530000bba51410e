//! TOML configuration for the AV settings daemon.
//!
//! The file lives at `$AVSETD_CONFIG` when that variable is set, otherwise
//! at `/etc/avsetd/config.toml`.  A missing file is not an error: every
//! field has a default.
//!
//! ```toml
//! [daemon]
//! log_level = "info"
//!
//! [transport]
//! endpoint = "127.0.0.1:7700"
//! timeout_ms = 5000
//!
//! [video]
//! av_multi_out = "ntsc"   # ntsc | pal_ycbcr | secam | pal_rgb
//! mode = 0                # raw mode id applied at start; 0 = automatic
//! ```
//!
//! # Serde default values (for beginners)
//!
//! `#[serde(default = "some_fn")]` fills a field from `some_fn()` when the
//! key is absent, and `#[serde(default)]` on a section uses its `Default`
//! impl.  A file that sets only `[video] mode = 5` therefore still loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use avset_core::domain::monitor::AvMultiOut;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "AVSETD_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "/etc/avsetd/config.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AvsetdConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the AV controller is reached and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// `host:port` of the controller's byte stream.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bound on every transport read, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoConfig {
    /// Analog output standard; decides the region.
    #[serde(default)]
    pub av_multi_out: AvMultiOut,
    /// Raw mode id (index plus flag bits) applied at start.
    #[serde(default)]
    pub mode: u32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_endpoint() -> String {
    "127.0.0.1:7700".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the config file path from the environment.
pub fn config_file_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads the config from [`config_file_path`].
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AvsetdConfig, ConfigError> {
    load_config_from(&config_file_path())
}

/// Loads the config from `path`, returning defaults when the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AvsetdConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AvsetdConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        // Arrange / Act
        let cfg = AvsetdConfig::default();

        // Assert
        assert_eq!(cfg.daemon.log_level, "info");
        assert_eq!(cfg.transport.endpoint, "127.0.0.1:7700");
        assert_eq!(cfg.transport.timeout(), Duration::from_millis(5000));
        assert_eq!(cfg.video.av_multi_out, AvMultiOut::Ntsc);
        assert_eq!(cfg.video.mode, 0);
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let cfg: AvsetdConfig = toml::from_str(
            r#"
            [video]
            av_multi_out = "pal_rgb"
            mode = 5
            "#,
        )
        .expect("parse");

        assert_eq!(cfg.video.av_multi_out, AvMultiOut::PalRgb);
        assert_eq!(cfg.video.mode, 5);
        assert_eq!(cfg.transport, TransportConfig::default());
    }

    #[test]
    fn test_timeout_override() {
        let cfg: AvsetdConfig = toml::from_str("[transport]\ntimeout_ms = 250\n").expect("parse");
        assert_eq!(cfg.transport.timeout(), Duration::from_millis(250));
        assert_eq!(cfg.transport.endpoint, "127.0.0.1:7700");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("avsetd-test-does-not-exist.toml");
        let cfg = load_config_from(&path).expect("defaults");
        assert_eq!(cfg, AvsetdConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let path = std::env::temp_dir().join(format!("avsetd-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[transport\nendpoint = ").expect("write");

        let result = load_config_from(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_av_multi_out_is_rejected() {
        let result: Result<AvsetdConfig, _> = toml::from_str("[video]\nav_multi_out = \"vga\"\n");
        assert!(result.is_err());
    }
}
