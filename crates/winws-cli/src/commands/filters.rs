//! Capture filter commands

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use winws_core::category::FILTERS;
use winws_core::{CategoryFilterResolver, FilterKey};

use crate::context::AppContext;

/// Filter command arguments
#[derive(Args, Debug)]
pub struct FiltersArgs {
    #[command(subcommand)]
    pub command: FilterCommands,
}

/// Filter subcommands
#[derive(Subcommand, Debug)]
pub enum FilterCommands {
    /// List capture filters and the categories depending on them
    List,

    /// Turn a filter off by disabling every category that needs it
    Disable {
        /// Filter key (tcp_80, tcp_443, udp_443, raw_discord, ...)
        filter: FilterKey,
    },
}

/// Execute filter command
pub fn execute(args: FiltersArgs, ctx: &AppContext) -> Result<()> {
    match args.command {
        FilterCommands::List => list_filters(ctx),
        FilterCommands::Disable { filter } => disable_filter(ctx, filter),
    }
}

fn list_filters(ctx: &AppContext) -> Result<()> {
    let catalog = ctx.catalog()?;
    let selections = ctx.selections()?;
    let resolver = CategoryFilterResolver::new(&catalog);
    let active = CategoryFilterResolver::active_filters(&catalog, &selections);

    println!("{}", "═".repeat(72).bright_blue());
    println!("{}", " Capture filters".bright_white().bold());
    println!("{}", "═".repeat(72).bright_blue());

    for filter in FILTERS {
        let marker = if active.contains(&filter.key) {
            "●".green()
        } else {
            "○".dimmed()
        };
        let dependents = resolver.categories_requiring(filter.key);
        println!(
            "  {marker} {:<15} {:<32} {}",
            filter.key.as_str(),
            filter.name,
            dependents.join(", ").dimmed()
        );
        if let Some(warning) = filter.warning {
            println!("      {} {}", "⚠".yellow(), warning.yellow());
        }
    }

    println!("{}", "═".repeat(72).bright_blue());
    Ok(())
}

fn disable_filter(ctx: &AppContext, filter: FilterKey) -> Result<()> {
    let catalog = ctx.catalog()?;
    let resolver = CategoryFilterResolver::new(&catalog);
    let mut selections = ctx.selections()?;

    let disabled = selections.disable_filter(filter, &resolver);
    if disabled.is_empty() {
        println!("No active category uses {}", filter.as_str().cyan());
        return Ok(());
    }

    ctx.save_selections(&selections)?;
    println!("{} {}", "Disabled:".yellow(), disabled.join(", "));
    Ok(())
}
