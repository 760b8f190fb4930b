//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:7300"
//! max_body_size = 1048576
//! channel_protection = "none"
//! request_logging = true
//!
//! [sessions]
//! database = "/var/lib/warden/sessions.db"
//! default_ttl_secs = 3600
//! sweep_interval_secs = 60
//! max_staleness_secs = 5
//!
//! [logging]
//! level = "info"
//! json_dir = "/var/log/warden"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_dispatch::ProtectionLevel;

use crate::{ConfigError, Result};

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:7300";

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default session lifetime in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Default expiry sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default age, in seconds, after which a cached session is re-read.
pub const DEFAULT_MAX_STALENESS_SECS: u64 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure. Missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// HTTP transport settings.
    pub server: ServerSection,
    /// Session storage and expiry settings.
    pub sessions: SessionSection,
    /// Log output settings.
    pub logging: LoggingSection,
}

impl WardenConfig {
    /// Create a config with every section at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.bind",
                reason: "must not be empty".to_string(),
            });
        }
        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                field: "server.max_body_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sessions.default_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sessions.default_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Socket address to listen on.
    pub bind: String,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Protection level the listener's channel provides, e.g. `"encrypt_and_sign"`
    /// behind a TLS-terminating proxy.
    pub channel_protection: ProtectionLevel,
    /// Enable per-request trace logging.
    pub request_logging: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            channel_protection: ProtectionLevel::None,
            request_logging: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// `[sessions]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// SQLite database path. Sessions are kept in memory when unset.
    pub database: Option<PathBuf>,
    /// Lifetime of sessions created without an explicit TTL.
    pub default_ttl_secs: u64,
    /// Seconds between background expiry sweeps; `0` disables the sweeper.
    pub sweep_interval_secs: u64,
    /// Seconds a cached session is trusted before the database is checked
    /// again. Bounds how long `warden session revoke` takes to reach a
    /// running server; `0` checks on every call.
    pub max_staleness_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            database: None,
            default_ttl_secs: DEFAULT_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            max_staleness_secs: DEFAULT_MAX_STALENESS_SECS,
        }
    }
}

impl SessionSection {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn max_staleness(&self) -> Duration {
        Duration::from_secs(self.max_staleness_secs)
    }

    /// The sweep interval, or `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily-rotated JSON log files; console only when unset.
    pub json_dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = WardenConfig::from_toml("").unwrap();
        assert_eq!(config, WardenConfig::default());
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.sessions.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.sessions.sweep_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.sessions.max_staleness(), Duration::from_secs(5));
        assert!(config.sessions.database.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = WardenConfig::from_toml(
            r#"
            [server]
            channel_protection = "encrypt_and_sign"

            [sessions]
            database = "/tmp/sessions.db"
            sweep_interval_secs = 0
            max_staleness_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.server.channel_protection, ProtectionLevel::EncryptAndSign);
        assert_eq!(config.server.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(
            config.sessions.database.as_deref(),
            Some(std::path::Path::new("/tmp/sessions.db"))
        );
        assert_eq!(config.sessions.sweep_interval(), None);
        assert_eq!(config.sessions.max_staleness(), Duration::ZERO);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = WardenConfig::from_toml("[sessions]\ndefault_ttl_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "sessions.default_ttl_secs",
                ..
            }
        ));

        let err = WardenConfig::from_toml("[server]\nmax_body_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("server.max_body_size"));

        let err = WardenConfig::from_toml("[server]\nchannel_protection = \"tls\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = WardenConfig::new();
        config.logging.json_dir = Some(PathBuf::from("/var/log/warden"));
        config.server.channel_protection = ProtectionLevel::Sign;

        let text = config.to_toml().unwrap();
        assert!(text.contains("[sessions]"));
        assert_eq!(WardenConfig::from_toml(&text).unwrap(), config);
    }
}
