//! Config file discovery.
//!
//! The first file found wins:
//! 1. an explicit path (`--config`); missing is an error
//! 2. `./warden.toml` (project-local)
//! 3. `~/.config/warden/config.toml` (XDG user config, or `$WARDEN_CONFIG_DIR`)
//!
//! With no file at all, every section takes its defaults.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, WardenConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "warden.toml";

/// Default config filename within the XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "warden";

/// Environment variable overriding the user config directory.
const CONFIG_DIR_ENV: &str = "WARDEN_CONFIG_DIR";

/// Result of config discovery.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The effective configuration.
    pub config: WardenConfig,
    /// File the configuration came from; `None` when defaults were used.
    pub source: Option<PathBuf>,
    /// Paths that were checked, in search order.
    pub searched: Vec<PathBuf>,
}

/// Discover and load configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(explicit, None, None)
}

/// Discover configuration with explicit control over the search directories.
///
/// `project_dir` replaces the current directory and `config_dir` replaces
/// the user config directory.
pub fn load_config_with_options(
    explicit: Option<&Path>,
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_config_file(path)?;
        return Ok(LoadedConfig {
            config,
            source: Some(path.to_path_buf()),
            searched: vec![path.to_path_buf()],
        });
    }

    let mut candidates = vec![
        project_dir
            .map(|d| d.join(PROJECT_CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE)),
    ];
    let user_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    candidates.extend(user_path);

    for path in &candidates {
        if path.is_file() {
            let config = load_config_file(path)?;
            return Ok(LoadedConfig {
                config,
                source: Some(path.clone()),
                searched: candidates.clone(),
            });
        }
    }

    Ok(LoadedConfig {
        config: WardenConfig::default(),
        source: None,
        searched: candidates,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<WardenConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    WardenConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// User config directory: `$WARDEN_CONFIG_DIR`, else the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
