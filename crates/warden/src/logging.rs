//! Tracing initialization.
//!
//! Human-readable console output on stderr, plus a daily-rotated JSON file
//! when `[logging] json_dir` is set. `RUST_LOG` overrides the configured
//! console level.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use warden_config::LoggingSection;

const CRATES: [&str; 5] = [
    "warden",
    "warden_config",
    "warden_dispatch",
    "warden_server",
    "warden_session",
];

/// Filter directives setting every Warden crate to `level`, everything else to `warn`.
fn directives(level: &str) -> String {
    let mut parts: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    parts.push("tower_http=info".to_string());
    parts.push("warn".to_string());
    parts.join(",")
}

/// Install the global subscriber.
///
/// The returned guard flushes the JSON file writer and must be held for the
/// life of the process.
pub fn init(config: &LoggingSection, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let console_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives(level)))?;

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let Some(dir) = &config.json_dir else {
        tracing_subscriber::registry().with(console).try_init()?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let file_appender = tracing_appender::rolling::daily(dir, "warden.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::try_new(directives("trace"))?),
        )
        .try_init()?;

    Ok(Some(guard))
}
