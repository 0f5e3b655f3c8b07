//! Length ceilings and the `.bat` fallback

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::escape::escape_batch;
use super::BuiltCommand;
use crate::error::Result;

/// Where a command line will be registered or run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationContext {
    /// `CreateProcess` from this process
    Direct,
    /// Task scheduler action
    ScheduledTask,
    /// Service binary path / NSSM parameters
    Service,
}

impl InvocationContext {
    /// Longest command line accepted in this context
    pub fn max_len(&self) -> usize {
        match self {
            InvocationContext::Direct => 32767,
            InvocationContext::ScheduledTask => 260,
            InvocationContext::Service => 8191,
        }
    }
}

/// How a built command gets launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    /// Command line fits
    Inline {
        /// Full command line
        command_line: String,
    },
    /// Command line written to a batch file, wrapper runs the file
    Batch {
        /// Batch file location
        path: PathBuf,
        /// `"<path>"`
        wrapper: String,
        /// Batch file content
        script: String,
    },
}

impl LaunchPlan {
    /// Pick inline or batch for a context
    pub fn plan(built: &BuiltCommand, context: InvocationContext, bat_path: &Path) -> Self {
        let len = built.command_line.chars().count();
        if len <= context.max_len() {
            debug!(len, ?context, "Command line fits inline");
            return LaunchPlan::Inline {
                command_line: built.command_line.clone(),
            };
        }

        info!(
            len,
            limit = context.max_len(),
            path = %bat_path.display(),
            "Command line too long, using batch wrapper"
        );
        LaunchPlan::Batch {
            path: bat_path.to_path_buf(),
            wrapper: format!("\"{}\"", bat_path.display()),
            script: batch_script(&built.work_dir, &built.command_line),
        }
    }

    /// The command line to register
    pub fn command_line(&self) -> &str {
        match self {
            LaunchPlan::Inline { command_line } => command_line,
            LaunchPlan::Batch { wrapper, .. } => wrapper,
        }
    }

    /// Whether the batch fallback is in use
    pub fn is_batch(&self) -> bool {
        matches!(self, LaunchPlan::Batch { .. })
    }

    /// Write the batch file, if any
    pub fn materialize(&self) -> Result<()> {
        if let LaunchPlan::Batch { path, script, .. } = self {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, script)?;
            info!(path = %path.display(), "Wrote batch wrapper");
        }
        Ok(())
    }
}

fn batch_script(work_dir: &Path, command_line: &str) -> String {
    [
        "@echo off".to_string(),
        "chcp 65001 > nul".to_string(),
        escape_batch(&format!("cd /d \"{}\"", work_dir.display())),
        escape_batch(command_line),
        String::new(),
    ]
    .join("\r\n")
}
