//! Functions command - list declared business functions.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use warden_dispatch::AccessRequirement;

use super::Context;
use crate::app;

/// Arguments for the functions command.
#[derive(Args, Debug)]
pub struct FunctionsArgs {
    /// Only list functions of this owner type
    #[arg(short, long)]
    pub object: Option<String>,
}

/// Run the functions command.
pub async fn run(args: FunctionsArgs, ctx: &Context) -> Result<()> {
    let registry = app::build_registry()?;
    let descriptors: Vec<_> = registry
        .descriptors()
        .filter(|d| args.object.as_deref().is_none_or(|o| o == d.owner_type))
        .collect();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Functions").bold());
    println!("{}", dim.apply_to("─".repeat(50)));

    if descriptors.is_empty() {
        println!("{}", dim.apply_to("No functions declared"));
        return Ok(());
    }

    for d in descriptors {
        let access = match d.access {
            AccessRequirement::Anonymous => Style::new().green().apply_to("anonymous"),
            AccessRequirement::Authenticated => Style::new().yellow().apply_to("authenticated"),
        };
        println!(
            "{}.{:<16} {:<14} {}",
            d.owner_type,
            d.func_id,
            access,
            dim.apply_to(format!("protection={}", d.protection))
        );
    }
    Ok(())
}
