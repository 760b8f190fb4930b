//! CLI command handlers.

pub mod functions;
pub mod serve;
pub mod session;

use std::path::PathBuf;

use warden_config::WardenConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration.
    pub config: WardenConfig,
    /// File the configuration was loaded from.
    pub config_source: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}
