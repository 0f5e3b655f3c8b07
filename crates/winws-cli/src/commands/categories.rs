//! Category inspection commands

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use winws_core::category::CommandGroup;
use winws_core::{Category, CategoryFilterResolver};

use crate::context::AppContext;

/// Category command arguments
#[derive(Args, Debug)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoryCommands,
}

/// Category subcommands
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// List categories with their current selection
    List,

    /// Show the capture filters a category needs
    Filters {
        /// Category key (all categories when omitted)
        category: Option<String>,
    },
}

/// Execute category command
pub fn execute(args: CategoriesArgs, ctx: &AppContext) -> Result<()> {
    match args.command {
        CategoryCommands::List => list_categories(ctx),
        CategoryCommands::Filters { category } => show_filters(ctx, category),
    }
}

fn list_categories(ctx: &AppContext) -> Result<()> {
    let catalog = ctx.catalog()?;
    let selections = ctx.selections()?;

    println!("{}", "═".repeat(72).bright_blue());
    println!("{}", " Categories".bright_white().bold());
    println!("{}", "═".repeat(72).bright_blue());

    for category in catalog.iter() {
        let selected = selections.get(&category.key);
        let marker = if selections.is_active(&category.key) {
            "●".green()
        } else {
            "○".dimmed()
        };
        let group = match category.command_group {
            CommandGroup::User => " (user)".yellow().to_string(),
            CommandGroup::Builtin => String::new(),
        };
        println!(
            "  {marker} {:<16} {:<10} {:<14} {:<14} {}{group}",
            category.key,
            category.protocol,
            category.ports,
            category.strategy_type,
            if selections.is_active(&category.key) {
                selected.cyan()
            } else {
                selected.dimmed()
            },
        );
    }

    println!("{}", "═".repeat(72).bright_blue());
    Ok(())
}

fn filter_line(category: &Category) -> String {
    CategoryFilterResolver::required_filters(category)
        .iter()
        .map(|key| key.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn show_filters(ctx: &AppContext, category: Option<String>) -> Result<()> {
    let catalog = ctx.catalog()?;
    match category {
        Some(key) => {
            let Some(category) = catalog.get(&key) else {
                bail!("Unknown category '{key}'");
            };
            for filter in CategoryFilterResolver::required_filters(category) {
                let net = filter.filter();
                println!("{:<16} {}", filter.as_str().cyan(), net.name);
            }
        }
        None => {
            for category in catalog.iter() {
                println!("{:<16} {}", category.key.cyan(), filter_line(category));
            }
        }
    }
    Ok(())
}
