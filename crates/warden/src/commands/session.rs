//! Session command - issue and administer sessions in the durable store.

use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde::Serialize;
use warden_session::{AccessToken, SessionRecord, SessionStore};

use super::Context;
use crate::app;

/// Arguments for the session command.
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Issue a new session for a user
    Create {
        /// User identifier the session belongs to
        #[arg(short, long)]
        user: String,

        /// Lifetime in seconds (default: [sessions] default_ttl_secs)
        #[arg(long)]
        ttl: Option<u64>,

        /// Session is valid for a single call
        #[arg(long)]
        one_time: bool,
    },

    /// Revoke a session (running servers drop it within [sessions] max_staleness_secs)
    Revoke {
        /// Access token
        token: String,
    },

    /// Show a session
    Show {
        /// Access token
        token: String,
    },

    /// List live sessions of a user
    List {
        /// User identifier
        #[arg(short, long)]
        user: String,
    },

    /// Delete every expired session
    Purge,
}

#[derive(Debug, Serialize)]
struct RevokeOutput {
    revoked: bool,
}

#[derive(Debug, Serialize)]
struct PurgeOutput {
    purged: usize,
}

fn parse_token(raw: &str) -> Result<AccessToken> {
    raw.parse()
        .with_context(|| format!("'{raw}' is not an access token"))
}

/// Run the session command.
pub async fn run(args: SessionArgs, ctx: &Context) -> Result<()> {
    let store = app::open_sqlite(&ctx.config.sessions)?;
    let dim = Style::new().dim();
    let green = Style::new().green();

    match args.command {
        SessionCommand::Create {
            user,
            ttl,
            one_time,
        } => {
            let ttl = ttl
                .map(Duration::from_secs)
                .unwrap_or_else(|| ctx.config.sessions.default_ttl());
            let record = store
                .create(&user, ttl, one_time)
                .await
                .context("failed to create session")?;

            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{} Session created for {}", green.apply_to("✓"), style(&user).bold());
                println!("{}", record.token);
                if ctx.verbose {
                    print_record(&record, &dim);
                }
            }
        }

        SessionCommand::Revoke { token } => {
            let token = parse_token(&token)?;
            let revoked = store.remove(&token).await.context("failed to revoke session")?;

            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&RevokeOutput { revoked })?);
            } else if revoked {
                println!("{} Session revoked", green.apply_to("✓"));
            } else {
                println!("{}", dim.apply_to("No such session"));
            }
        }

        SessionCommand::Show { token } => {
            let token = parse_token(&token)?;
            let record = store.get(&token).await.context("failed to read session")?;

            match record {
                Some(record) if ctx.json_output => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                Some(record) => {
                    println!("{}", style("Session").bold());
                    println!("{}", dim.apply_to("─".repeat(50)));
                    print_record(&record, &dim);
                }
                None => anyhow::bail!("no session for {}", token.log_prefix()),
            }
        }

        SessionCommand::List { user } => {
            let records = store
                .sessions_for_user(&user)
                .await
                .context("failed to list sessions")?;

            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("{}", dim.apply_to(format!("No live sessions for {user}")));
            } else {
                for record in &records {
                    println!(
                        "{}  expires {}{}",
                        record.token,
                        record.expires_at.to_rfc3339(),
                        if record.one_time { "  (one-time)" } else { "" }
                    );
                }
            }
        }

        SessionCommand::Purge => {
            let purged = store
                .purge_expired(Utc::now())
                .await
                .context("failed to purge sessions")?;

            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&PurgeOutput { purged })?);
            } else {
                println!("{} Purged {} expired session(s)", green.apply_to("✓"), purged);
            }
        }
    }

    Ok(())
}

fn print_record(record: &SessionRecord, dim: &Style) {
    println!("{} {}", dim.apply_to("user:     "), record.user_id);
    println!("{} {}", dim.apply_to("created:  "), record.created_at.to_rfc3339());
    println!("{} {}", dim.apply_to("expires:  "), record.expires_at.to_rfc3339());
    println!("{} {}", dim.apply_to("one-time: "), record.one_time);
    if record.is_expired() {
        println!("{}", Style::new().yellow().apply_to("expired"));
    }
}
