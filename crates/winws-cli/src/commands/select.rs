//! Select command - persist the strategy chosen per category

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use winws_core::strategy::NONE_STRATEGY;

use crate::context::AppContext;

/// Select command arguments
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Category key; omit to show every selection
    pub category: Option<String>,

    /// Strategy id, or "none" to disable the category
    pub strategy: Option<String>,

    /// Reset every category to "none"
    #[arg(long, conflicts_with_all = ["category", "strategy"])]
    pub clear: bool,
}

/// Execute select command
pub fn execute(args: SelectArgs, ctx: &AppContext) -> Result<()> {
    if args.clear {
        ctx.save_selections(&Default::default())?;
        println!("{}", "All selections cleared".yellow());
        return Ok(());
    }

    let catalog = ctx.catalog()?;
    let mut selections = ctx.selections()?;

    let Some(key) = args.category else {
        for category in catalog.iter() {
            println!("{:<16} {}", category.key, selections.get(&category.key));
        }
        return Ok(());
    };
    let Some(category) = catalog.get(&key) else {
        bail!("Unknown category '{key}'");
    };
    let Some(strategy_id) = args.strategy else {
        println!("{}", selections.get(&key));
        return Ok(());
    };

    if strategy_id != NONE_STRATEGY {
        let table = ctx
            .registry()
            .load(&category.strategy_type, ctx.config.pipeline.strategy_set.as_deref())?;
        match table.get(&strategy_id) {
            None => bail!(
                "Unknown strategy '{strategy_id}' for '{key}' (document '{}')",
                category.strategy_type
            ),
            Some(strategy) if !strategy.enabled => bail!("Strategy '{strategy_id}' is disabled"),
            Some(_) => {}
        }
    }

    selections.set(key.clone(), strategy_id.clone());
    ctx.save_selections(&selections)?;
    println!("{} {} = {}", "Selected".green(), key, strategy_id.cyan());
    Ok(())
}
