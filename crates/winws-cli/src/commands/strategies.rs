//! Strategy management commands

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::PathBuf;

use winws_core::strategy::{validate_record, Label, Strategy, StrategySource, StrategyTable};

use crate::context::AppContext;

/// Strategy command arguments
#[derive(Args, Debug)]
pub struct StrategiesArgs {
    #[command(subcommand)]
    pub command: StrategyCommands,
}

/// Strategy subcommands
#[derive(Subcommand, Debug)]
pub enum StrategyCommands {
    /// List strategies of one or every strategy document
    List {
        /// Strategy document (tcp, udp, http80, discord_voice, ...)
        category: Option<String>,

        /// Include disabled strategies
        #[arg(short, long)]
        all: bool,
    },

    /// Show one strategy
    Show {
        /// Strategy document
        category: String,

        /// Strategy id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or replace a user strategy
    Save {
        /// Strategy document
        category: String,

        /// Read the strategy record from a JSON file
        #[arg(long, value_name = "FILE", conflicts_with_all = ["id", "name", "args"])]
        from_file: Option<PathBuf>,

        /// Strategy id ([A-Za-z0-9_]+)
        #[arg(long, required_unless_present = "from_file")]
        id: Option<String>,

        /// Display name
        #[arg(long, required_unless_present = "from_file")]
        name: Option<String>,

        /// winws arguments
        #[arg(long, required_unless_present = "from_file", allow_hyphen_values = true)]
        args: Option<String>,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Label (recommended, game, caution, experimental, stable)
        #[arg(long)]
        label: Option<String>,

        /// Blob file the arguments need (repeatable)
        #[arg(long = "blob")]
        blobs: Vec<String>,
    },

    /// Delete a user strategy
    Delete {
        /// Strategy document
        category: String,

        /// Strategy id
        id: String,
    },
}

/// Execute strategy command
pub fn execute(args: StrategiesArgs, ctx: &AppContext) -> Result<()> {
    match args.command {
        StrategyCommands::List { category, all } => list_strategies(ctx, category, all),
        StrategyCommands::Show { category, id, json } => show_strategy(ctx, &category, &id, json),
        StrategyCommands::Save {
            category,
            from_file,
            id,
            name,
            args,
            description,
            label,
            blobs,
        } => {
            let value = match from_file {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&content)
                        .with_context(|| format!("Invalid JSON in {}", path.display()))?
                }
                None => record_from_flags(id, name, args, description, label, blobs),
            };
            save_strategy(ctx, &category, &value)
        }
        StrategyCommands::Delete { category, id } => {
            ctx.registry()
                .delete(&category, &id)
                .with_context(|| format!("Failed to delete strategy '{id}'"))?;
            println!("{} {}/{}", "Deleted".green(), category, id);
            Ok(())
        }
    }
}

fn load_table(ctx: &AppContext, category: &str) -> Result<StrategyTable> {
    ctx.registry()
        .load(category, ctx.config.pipeline.strategy_set.as_deref())
        .with_context(|| format!("Failed to load strategies for '{category}'"))
}

fn strategy_types(ctx: &AppContext) -> Result<Vec<String>> {
    let mut types: Vec<String> = ctx
        .catalog()?
        .strategy_types()
        .into_iter()
        .map(str::to_string)
        .collect();
    for builtin in ctx.registry().builtin_categories()? {
        if !types.contains(&builtin) {
            types.push(builtin);
        }
    }
    Ok(types)
}

fn list_strategies(ctx: &AppContext, category: Option<String>, all: bool) -> Result<()> {
    let categories = match category {
        Some(category) => vec![category],
        None => strategy_types(ctx)?,
    };

    for category in categories {
        let table = load_table(ctx, &category)?;
        println!("{}", "═".repeat(60).bright_blue());
        println!(
            "{} {}",
            format!(" {category}").bright_white().bold(),
            format!("({} strategies)", table.len()).dimmed()
        );
        println!("{}", "─".repeat(60).bright_black());

        if table.is_empty() {
            println!("{}", "  (empty)".dimmed());
        }
        for strategy in table.iter().filter(|s| all || s.enabled) {
            println!("  {}", strategy_line(strategy));
        }
    }
    println!("{}", "═".repeat(60).bright_blue());
    Ok(())
}

fn strategy_line(strategy: &Strategy) -> String {
    let marker = match strategy.source {
        StrategySource::User => "◉".yellow(),
        StrategySource::Builtin => "●".green(),
    };
    let label = match strategy.label {
        Label::None => String::new(),
        label => format!(" [{}]", label.as_str()),
    };
    let line = format!("{marker} {:<24} {}{}", strategy.id, strategy.name, label);
    if strategy.enabled {
        line
    } else {
        format!("{} {}", line.dimmed(), "(disabled)".dimmed())
    }
}

fn show_strategy(ctx: &AppContext, category: &str, id: &str, json: bool) -> Result<()> {
    let table = load_table(ctx, category)?;
    let Some(strategy) = table.get(id) else {
        bail!("Strategy '{id}' not found in '{category}'");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(strategy)?);
        return Ok(());
    }

    println!("{}", strategy.name.bright_white().bold());
    println!("  id:       {}", strategy.id.cyan());
    println!("  source:   {:?}", strategy.source);
    println!("  label:    {}", strategy.label.as_str());
    println!("  enabled:  {}", strategy.enabled);
    if !strategy.author.is_empty() {
        println!("  author:   {}", strategy.author);
    }
    if !strategy.description.is_empty() {
        println!("  about:    {}", strategy.description);
    }
    if !strategy.blobs.is_empty() {
        println!("  blobs:    {}", strategy.blobs.join(", "));
    }
    println!("  args:");
    for token in strategy.tokens() {
        println!("    {token}");
    }
    Ok(())
}

fn record_from_flags(
    id: Option<String>,
    name: Option<String>,
    args: Option<String>,
    description: Option<String>,
    label: Option<String>,
    blobs: Vec<String>,
) -> Value {
    let mut value = json!({
        "id": id,
        "name": name,
        "args": args,
        "blobs": blobs,
    });
    if let Some(description) = description {
        value["description"] = json!(description);
    }
    if let Some(label) = label {
        value["label"] = json!(label);
    }
    value
}

fn save_strategy(ctx: &AppContext, category: &str, value: &Value) -> Result<()> {
    let record = validate_record(value).context("Invalid strategy")?;
    ctx.registry()
        .save(category, &record)
        .with_context(|| format!("Failed to save strategy '{}'", record.id))?;
    println!("{} {}/{}", "Saved".green(), category, record.id);
    Ok(())
}
