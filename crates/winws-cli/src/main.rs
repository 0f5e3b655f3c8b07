//! winws-manager CLI
//!
//! Command-line front end for strategy composition, winws launch and
//! autostart management.

mod args;
mod commands;
mod context;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;
use context::AppContext;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Config is loaded before logging so `[logging]` can apply; a broken
    // config only fails the commands that need it.
    let context = AppContext::load(args.config.as_deref(), args.work_dir.as_deref());
    let logging_config = context
        .as_ref()
        .map(|ctx| ctx.config.logging.clone())
        .unwrap_or_default();
    let _guard = logging::init(&args, &logging_config)?;

    let result = commands::execute(args.command, context);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}
