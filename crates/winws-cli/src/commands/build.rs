//! Build command - compose the winws command line

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use winws_core::{BuiltCommand, InvocationContext, Selections};

use crate::args::parse_selection;
use crate::context::AppContext;

/// Build command arguments
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Override a selection for this build only (repeatable)
    #[arg(short, long = "select", value_name = "CATEGORY=STRATEGY", value_parser = parse_selection)]
    pub selections: Vec<(String, String)>,

    /// Ignore stored selections; use only --select
    #[arg(long)]
    pub fresh: bool,

    /// Skip the global --wf-* capture flags
    #[arg(long)]
    pub no_capture: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "line")]
    pub format: OutputFormat,
}

/// How the result is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Escaped command line
    Line,
    /// One token per line
    Tokens,
    /// Full build result as JSON
    Json,
    /// Command line plus length against each launch context
    Report,
}

/// Stored selections with command-line overrides applied
pub fn effective_selections(ctx: &AppContext, overrides: &[(String, String)], fresh: bool) -> Result<Selections> {
    let mut selections = if fresh { Selections::new() } else { ctx.selections()? };
    for (category, strategy) in overrides {
        selections.set(category.clone(), strategy.clone());
    }
    Ok(selections)
}

/// Execute the build command
pub fn execute(args: BuildArgs, ctx: &AppContext) -> Result<()> {
    let selections = effective_selections(ctx, &args.selections, args.fresh)?;
    let capture = args.no_capture.then_some(false);
    let built = ctx.build(&selections, capture)?;

    if built.is_empty() {
        eprintln!("{}", "No active categories; select strategies with 'winws-manager select'".yellow());
    }

    match args.format {
        OutputFormat::Line => println!("{}", built.command_line),
        OutputFormat::Tokens => {
            for token in &built.tokens {
                println!("{token}");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&built).context("Failed to serialize build result")?;
            println!("{json}");
        }
        OutputFormat::Report => print_report(&built),
    }
    Ok(())
}

fn print_report(built: &BuiltCommand) {
    let len = built.command_line.chars().count();

    println!("{}", "═".repeat(60).bright_blue());
    println!("{}", " winws command".bright_white().bold());
    println!("{}", "═".repeat(60).bright_blue());
    println!("Categories: {}", built.active_categories.join(", ").cyan());
    println!("Tokens:     {}", built.tokens.len().to_string().green());
    println!("Length:     {}", len.to_string().green());
    println!("{}", "─".repeat(60).bright_black());

    for (name, context) in [
        ("direct launch", InvocationContext::Direct),
        ("scheduled task", InvocationContext::ScheduledTask),
        ("service", InvocationContext::Service),
    ] {
        let limit = context.max_len();
        let verdict = if len <= limit {
            "inline".green()
        } else {
            "batch wrapper".yellow()
        };
        println!("  {name:<15} limit {limit:>5}  {verdict}");
    }

    println!("{}", "─".repeat(60).bright_black());
    println!("{}", built.command_line);
    println!("{}", "═".repeat(60).bright_blue());
}
