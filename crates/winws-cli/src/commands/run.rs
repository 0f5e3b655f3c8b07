//! Run command - launch winws in the foreground or detached

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use winws_core::{InvocationContext, LaunchPlan};
use winws_platform::{PlatformError, ProcessLauncher, WinwsLauncher, WINWS_IMAGE};

use super::build::effective_selections;
use crate::args::parse_selection;
use crate::context::AppContext;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override a selection for this run only (repeatable)
    #[arg(short, long = "select", value_name = "CATEGORY=STRATEGY", value_parser = parse_selection)]
    pub selections: Vec<(String, String)>,

    /// Start winws and return immediately
    #[arg(short, long)]
    pub detach: bool,

    /// Kill running winws processes first
    #[arg(short, long)]
    pub kill_existing: bool,

    /// Print what would be launched without starting it
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the run command
pub fn execute(args: RunArgs, ctx: &AppContext) -> Result<()> {
    let selections = effective_selections(ctx, &args.selections, false)?;
    let built = ctx.build(&selections, None)?;
    if built.is_empty() {
        bail!("No active categories; select strategies with 'winws-manager select'");
    }

    let bat_path = ctx.config.resolve_path(&ctx.config.autostart.batch_file);
    let plan = LaunchPlan::plan(&built, InvocationContext::Direct, &bat_path);
    let (program, program_args) = match &plan {
        LaunchPlan::Inline { .. } => (built.exe_path.clone(), built.tokens.clone()),
        LaunchPlan::Batch { path, .. } => (
            PathBuf::from("cmd.exe"),
            vec!["/c".to_string(), path.display().to_string()],
        ),
    };

    if args.dry_run {
        println!("{}", plan.command_line());
        return Ok(());
    }

    let launcher = WinwsLauncher::new(ctx.runner());
    if args.kill_existing {
        match launcher.stop_all(WINWS_IMAGE) {
            Ok(()) => {}
            Err(PlatformError::Unsupported(what)) => warn!(what = %what, "Cannot stop existing processes here"),
            Err(e) => return Err(e).context("Failed to stop running winws"),
        }
    }
    plan.materialize().context("Failed to write batch wrapper")?;

    println!(
        "{} {} ({})",
        "Starting winws:".green().bold(),
        built.active_categories.join(", ").cyan(),
        if plan.is_batch() { "batch wrapper" } else { "inline" }
    );

    if args.detach {
        let pid = launcher
            .launch(&program, &program_args, &built.work_dir)
            .context("Failed to launch winws")?;
        println!("winws running with PID {pid}");
        return Ok(());
    }

    let mut child = launcher
        .spawn(&program, &program_args, &built.work_dir)
        .context("Failed to launch winws")?;

    // Set up signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    while running.load(Ordering::SeqCst) {
        if let Some(status) = child.try_wait().context("Failed to poll winws")? {
            if status.success() {
                info!("winws exited");
                return Ok(());
            }
            bail!("winws exited with {status}");
        }
        thread::sleep(POLL_INTERVAL);
    }

    info!(pid = child.id(), "Stopping winws");
    if let Err(e) = child.kill() {
        warn!(error = %e, "Failed to kill winws");
    }
    let _ = child.wait();
    println!("{}", "winws stopped".yellow());
    Ok(())
}
