//! Autostart commands

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use winws_core::AutostartMethod;

use super::build::effective_selections;
use crate::context::AppContext;

/// Autostart command arguments
#[derive(Args, Debug)]
pub struct AutostartArgs {
    #[command(subcommand)]
    pub command: AutostartCommands,
}

/// Autostart subcommands
#[derive(Subcommand, Debug)]
pub enum AutostartCommands {
    /// Register winws with the current selections
    Enable {
        /// task, boot-task, nssm or service (default from config)
        #[arg(short, long)]
        method: Option<AutostartMethod>,
    },

    /// Remove every autostart mechanism
    Disable,

    /// Compare the stored flag with what is installed
    Status,

    /// Overwrite the stored flag from what is installed
    Reconcile,
}

/// Execute autostart command
pub fn execute(args: AutostartArgs, ctx: &AppContext) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let orchestrator = ctx.orchestrator();

    match args.command {
        AutostartCommands::Enable { method } => {
            let method = method.unwrap_or(ctx.config.autostart.method);
            let built = ctx.build(&effective_selections(ctx, &[], false)?, None)?;
            if built.is_empty() {
                bail!("No active categories; select strategies with 'winws-manager select'");
            }
            let plan = runtime
                .block_on(orchestrator.enable_async(method, built))
                .with_context(|| format!("Failed to enable autostart ({method})"))?;
            println!("{} {}", "Autostart enabled:".green().bold(), method);
            if plan.is_batch() {
                println!("  via batch wrapper {}", orchestrator.bat_path().display());
            }
        }
        AutostartCommands::Disable => {
            let removed = runtime
                .block_on(orchestrator.disable_async())
                .context("Failed to disable autostart")?;
            if removed.is_empty() {
                println!("Nothing to remove");
            } else {
                let names: Vec<&str> = removed.iter().map(AutostartMethod::as_str).collect();
                println!("{} {}", "Removed:".yellow(), names.join(", "));
            }
        }
        AutostartCommands::Status => {
            let report = orchestrator.status().context("Failed to query autostart state")?;
            let stored = match (report.stored.enabled, report.stored.method) {
                (true, Some(method)) => method.to_string(),
                (true, None) => "enabled (unknown method)".to_string(),
                (false, _) => "disabled".to_string(),
            };
            let observed = report
                .observed
                .map_or_else(|| "none".to_string(), |m| m.to_string());
            println!("Stored:    {stored}");
            println!("Installed: {observed}");
            if report.in_sync() {
                println!("{}", "In sync".green());
            } else {
                println!("{}", "Out of sync; run 'winws-manager autostart reconcile'".yellow());
            }
        }
        AutostartCommands::Reconcile => {
            let changed = runtime
                .block_on(orchestrator.reconcile_async())
                .context("Failed to reconcile autostart state")?;
            if changed {
                println!("{}", "Stored flag updated from installed state".yellow());
            } else {
                println!("{}", "Already in sync".green());
            }
        }
    }
    Ok(())
}
