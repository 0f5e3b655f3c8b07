//! Config command - configuration management

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use winws_core::AppConfig;

use crate::context::{user_config_file, AppContext, CONFIG_FILE_NAME};

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Generate a configuration file with defaults
    Generate {
        /// Output file path
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate (default: the active one)
        file: Option<PathBuf>,
    },

    /// Show config file locations
    Paths,
}

/// Execute config command
pub fn execute(args: ConfigArgs, context: Result<AppContext>) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(&context?),
        ConfigAction::Generate { output, force } => generate_config(output, force),
        ConfigAction::Validate { file } => match file {
            Some(file) => validate_config(file),
            None => {
                let ctx = context?;
                match ctx.config_path {
                    Some(path) => validate_config(path),
                    None => bail!("No configuration file found; pass one or use --config"),
                }
            }
        },
        ConfigAction::Paths => show_paths(context.ok()),
    }
}

fn show_config(ctx: &AppContext) -> Result<()> {
    match &ctx.config_path {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Built-in defaults"),
    }
    let toml_str = ctx.config.to_toml().context("Failed to serialize config")?;
    println!("{toml_str}");
    Ok(())
}

fn generate_config(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists; use --force to overwrite", output.display());
    }

    let toml_str = AppConfig::default()
        .to_toml()
        .context("Failed to serialize config")?;

    // Add header comment
    let content = format!(
        "# winws-manager configuration\n\
         # Relative paths resolve against paths.work_dir\n\n\
         {toml_str}"
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("Configuration file generated: {}", output.display());
    Ok(())
}

fn validate_config(file: PathBuf) -> Result<()> {
    let config = AppConfig::load(&file)
        .with_context(|| format!("Failed to load config from {}", file.display()))?;

    config.validate().context("Configuration validation failed")?;

    println!("{} {}", "✓ Configuration is valid:".green(), file.display());
    println!("  Work dir:      {}", config.paths.work_dir.display());
    println!("  winws:         {}", config.winws_exe().display());
    println!(
        "  Strategy set:  {}",
        config.pipeline.strategy_set.as_deref().unwrap_or("default")
    );
    println!("  Autostart:     {}", config.autostart.method);
    println!("  State backend: {:?}", config.state.backend);
    Ok(())
}

fn show_paths(context: Option<AppContext>) -> Result<()> {
    println!("Configuration file search paths:");
    println!();
    println!("  1. --config / WINWS_MANAGER_CONFIG");
    println!("  2. ./{CONFIG_FILE_NAME}");
    if let Some(path) = user_config_file() {
        println!("  3. {}", path.display());
    }

    if let Some(ctx) = context {
        println!();
        match &ctx.config_path {
            Some(path) => println!("Active: {}", path.display().to_string().cyan()),
            None => println!("Active: {}", "built-in defaults".dimmed()),
        }
        println!();
        println!("Data locations:");
        println!("  categories:          {}", ctx.config.categories_file().display());
        println!("  user categories:     {}", ctx.config.user_categories_file().display());
        println!("  builtin strategies:  {}", ctx.config.builtin_strategies_dir().display());
        println!("  user strategies:     {}", ctx.config.user_strategies_dir().display());
        println!("  state file:          {}", ctx.config.state_file().display());
    }
    Ok(())
}
