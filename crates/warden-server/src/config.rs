//! Server configuration.

use std::net::SocketAddr;

use warden_config::ServerSection;
use warden_dispatch::ProtectionLevel;

use crate::error::{Result, ServerError};

/// Default max body size for RPC requests (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = warden_config::DEFAULT_MAX_BODY_SIZE;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Maximum request body size in bytes. Larger requests are rejected
    /// before the envelope is decoded.
    pub max_body_size: usize,

    /// Protection the listener's channel provides to every call it carries.
    pub channel_protection: ProtectionLevel,

    /// Enable per-request HTTP tracing.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 7300)),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            channel_protection: ProtectionLevel::None,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a server config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[server]` section of the config file.
    pub fn from_section(section: &ServerSection) -> Result<Self> {
        let bind_address = section.bind.parse().map_err(|e| {
            ServerError::Config(format!("invalid bind address '{}': {}", section.bind, e))
        })?;
        Ok(Self {
            bind_address,
            max_body_size: section.max_body_size,
            channel_protection: section.channel_protection,
            request_logging: section.request_logging,
        })
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the maximum request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the channel protection level.
    pub fn with_channel_protection(mut self, level: ProtectionLevel) -> Self {
        self.channel_protection = level;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}
