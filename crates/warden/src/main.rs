//! Warden - authenticated business-function dispatch.
//!
//! Main entry point for the Warden CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod app;
mod commands;
mod greeter;
mod logging;

use commands::{functions, serve, session};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Warden - authenticated business-function dispatch
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ./warden.toml, then the user config directory)
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the RPC server
    Serve(serve::ServeArgs),

    /// Session administration
    Session(session::SessionArgs),

    /// List declared business functions
    Functions(functions::FunctionsArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded =
        warden_config::load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let _guard = logging::init(&loaded.config.logging, cli.verbose)?;

    let ctx = commands::Context {
        config: loaded.config,
        config_source: loaded.source,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Session(args) => session::run(args, &ctx).await,
        Commands::Functions(args) => functions::run(args, &ctx).await,
    }
}
