//! Configuration for Warden.
//!
//! A single TOML file with `[server]`, `[sessions]` and `[logging]`
//! sections. Every field has a default, so an empty or missing file yields a
//! runnable in-memory deployment.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
