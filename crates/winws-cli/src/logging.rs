//! Logging initialization

use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use winws_core::config::LoggingConfig;

use crate::args::{Args, LogFormat};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging from CLI arguments, falling back to the config file.
///
/// The returned guard flushes the log file on drop; keep it alive for the
/// whole run.
pub fn init(args: &Args, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => config.level.parse().unwrap_or(Level::INFO),
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = args.log_format.unwrap_or(if config.json_format {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    // Console logs go to stderr; stdout carries command output.
    let console: BoxedLayer = match format {
        LogFormat::Text => fmt::layer()
            .with_writer(io::stderr)
            .with_target(args.verbose >= 2)
            .with_thread_ids(args.verbose >= 3)
            .with_file(args.verbose >= 3)
            .with_line_number(args.verbose >= 3)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(io::stderr).boxed(),
    };
    let mut layers = vec![console];

    let log_file = args
        .log_file
        .as_deref()
        .or_else(|| config.file.as_deref().map(Path::new));
    let guard = match log_file {
        Some(path) => {
            let (layer, guard) = file_layer(path, format)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

fn file_layer(path: &Path, format: LogFormat) -> Result<(BoxedLayer, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    let layer = match format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Text | LogFormat::Compact => fmt::layer().with_ansi(false).with_writer(writer).boxed(),
    };
    Ok((layer, guard))
}
