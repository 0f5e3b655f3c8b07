//! Command-line argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::commands::Command;

/// winws-manager - strategy composition and autostart for winws
///
/// Builds winws command lines from per-category strategy selections,
/// launches winws and registers it as a scheduled task or service.
#[derive(Parser, Debug)]
#[command(name = "winws-manager")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(short = 'c', long, global = true, value_name = "FILE", env = "WINWS_MANAGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// winws installation directory (overrides paths.work_dir)
    #[arg(short = 'w', long, global = true, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for logs (default from config)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

/// Parse `category=strategy`
pub fn parse_selection(s: &str) -> Result<(String, String), String> {
    let (category, strategy) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=STRATEGY, got '{s}'"))?;
    let (category, strategy) = (category.trim(), strategy.trim());
    if category.is_empty() || strategy.is_empty() {
        return Err(format!("expected CATEGORY=STRATEGY, got '{s}'"));
    }
    Ok((category.to_string(), strategy.to_string()))
}
