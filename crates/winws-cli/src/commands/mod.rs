//! CLI commands

pub mod autostart;
pub mod build;
pub mod categories;
pub mod completions;
pub mod config;
pub mod filters;
pub mod run;
pub mod select;
pub mod strategies;

use anyhow::Result;
use clap::Subcommand;

use crate::context::AppContext;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the winws command line for the current selections
    Build(build::BuildArgs),

    /// Launch winws with the current selections
    Run(run::RunArgs),

    /// Strategy management
    Strategies(strategies::StrategiesArgs),

    /// Category inspection
    Categories(categories::CategoriesArgs),

    /// Capture filter inspection and toggles
    Filters(filters::FiltersArgs),

    /// Show or change the strategy selected for a category
    Select(select::SelectArgs),

    /// Autostart (scheduled task / service) management
    Autostart(autostart::AutostartArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Dispatch a command. `context` is the result of loading the
/// configuration; commands that do not need it run even when it failed.
pub fn execute(command: Command, context: Result<AppContext>) -> Result<()> {
    match command {
        Command::Build(args) => build::execute(args, &context?),
        Command::Run(args) => run::execute(args, &context?),
        Command::Strategies(args) => strategies::execute(args, &context?),
        Command::Categories(args) => categories::execute(args, &context?),
        Command::Filters(args) => filters::execute(args, &context?),
        Command::Select(args) => select::execute(args, &context?),
        Command::Autostart(args) => autostart::execute(args, &context?),
        Command::Config(args) => config::execute(args, context),
        Command::Completions(args) => completions::execute(args),
    }
}
