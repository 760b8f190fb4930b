//! Serve command - run the HTTP transport.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;
use warden_dispatch::{Dispatcher, ProtectionLevel};
use warden_server::{Server, ServerConfig};
use warden_session::{AccessTokenValidator, spawn_sweeper};

use super::Context;
use crate::app;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server] bind)
    #[arg(short, long, env = "WARDEN_BIND")]
    pub bind: Option<SocketAddr>,

    /// Protection level of the listening channel (overrides [server] channel_protection)
    #[arg(long)]
    pub channel_protection: Option<ProtectionLevel>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut server_config = ServerConfig::from_section(&ctx.config.server)?;
    if let Some(bind) = args.bind {
        server_config = server_config.with_bind_address(bind);
    }
    if let Some(level) = args.channel_protection {
        server_config = server_config.with_channel_protection(level);
    }

    let cache = app::build_cache(&ctx.config.sessions)?;
    let registry = Arc::new(app::build_registry()?);
    let objects = app::build_objects(&cache);
    let dispatcher = Dispatcher::new(registry, AccessTokenValidator::new(cache.clone()));

    let sweeper = spawn_sweeper(&cache);

    if let Some(source) = &ctx.config_source {
        info!(config = %source.display(), "Configuration loaded");
    }

    let server = Server::new(dispatcher, objects, server_config);
    let result = server
        .run_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("server failed");

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    result
}
