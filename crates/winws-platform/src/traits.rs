//! Narrow interfaces to the OS facilities autostart relies on
//!
//! Each trait has real Windows backends in this crate and a mockall mock
//! for tests.

use std::path::{Path, PathBuf};

use winws_core::command::{render_arguments, render_command_line};

use crate::Result;

/// A program plus its argument tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    /// Executable (or batch file)
    pub program: PathBuf,
    /// Unquoted argument tokens
    pub args: Vec<String>,
}

impl LaunchTarget {
    /// Target from parts
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments quoted and joined
    pub fn arguments(&self) -> String {
        render_arguments(&self.args)
    }

    /// `"<program>" args...`
    pub fn command_line(&self) -> String {
        render_command_line(&self.program.display().to_string(), &self.args)
    }
}

/// Starts and stops winws processes
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLauncher: Send + Sync {
    /// Start `exe` detached in `work_dir`; returns the process id
    fn launch(&self, exe: &Path, args: &[String], work_dir: &Path) -> Result<u32>;

    /// Kill every process with the given image name
    fn stop_all(&self, image_name: &str) -> Result<()>;
}

/// When a scheduled task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTrigger {
    /// At user logon, as that user
    Logon,
    /// At system start, as SYSTEM
    Boot,
}

/// Scheduled task definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Task name
    pub name: String,
    /// What to run
    pub target: LaunchTarget,
    /// Working directory
    pub work_dir: PathBuf,
    /// Trigger
    pub trigger: TaskTrigger,
}

/// Scheduled task backend
#[cfg_attr(test, mockall::automock)]
pub trait TaskScheduler: Send + Sync {
    /// Create or replace a task
    fn create_task(&self, spec: &TaskSpec) -> Result<()>;

    /// Delete a task
    fn delete_task(&self, name: &str) -> Result<()>;

    /// Whether a task with this name exists
    fn task_exists(&self, name: &str) -> Result<bool>;
}

/// Service definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Service name
    pub name: String,
    /// Display name
    pub display_name: String,
    /// Description
    pub description: String,
    /// What to run
    pub target: LaunchTarget,
    /// Working directory
    pub work_dir: PathBuf,
}

/// Service backend (NSSM or the Win32 service manager)
#[cfg_attr(test, mockall::automock)]
pub trait ServiceControl: Send + Sync {
    /// Register an auto-start service
    fn create_service(&self, spec: &ServiceSpec) -> Result<()>;

    /// Start a service
    fn start_service(&self, name: &str) -> Result<()>;

    /// Stop a service
    fn stop_service(&self, name: &str) -> Result<()>;

    /// Remove a service
    fn delete_service(&self, name: &str) -> Result<()>;

    /// Whether a service with this name exists
    fn service_exists(&self, name: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_target_rendering() {
        let target = LaunchTarget::new(
            "C:/zapret/bin/winws.exe",
            vec!["--wf-tcp=443".into(), "--hostlist=C:/My Lists/a.txt".into()],
        );
        assert_eq!(target.arguments(), "--wf-tcp=443 \"--hostlist=C:/My Lists/a.txt\"");
        assert_eq!(
            target.command_line(),
            "\"C:/zapret/bin/winws.exe\" --wf-tcp=443 \"--hostlist=C:/My Lists/a.txt\""
        );
        assert_eq!(LaunchTarget::new("a.bat", Vec::new()).command_line(), "\"a.bat\"");
    }
}
