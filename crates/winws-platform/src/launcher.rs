//! Direct winws process launch

use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{info, warn};

use crate::error::{PlatformError, Result};
use crate::exec::CommandRunner;
use crate::traits::ProcessLauncher;

/// Image name of the wrapped tool
pub const WINWS_IMAGE: &str = "winws.exe";

/// Starts winws detached from the console
#[derive(Debug, Clone)]
pub struct WinwsLauncher {
    runner: CommandRunner,
}

impl WinwsLauncher {
    /// Launcher; the runner is used for `taskkill`
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    /// Spawn and hand back the child for callers that wait on it.
    /// Bare program names (`cmd.exe`) are looked up on `PATH`.
    pub fn spawn(&self, exe: &Path, args: &[String], work_dir: &Path) -> Result<Child> {
        let has_dir = exe.parent().is_some_and(|p| !p.as_os_str().is_empty());
        if has_dir && !exe.is_file() {
            return Err(PlatformError::NotFound(exe.display().to_string()));
        }
        let mut command = Command::new(exe);
        command.current_dir(work_dir).stdin(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            // winws parses the raw command line; pass it exactly as rendered
            command
                .raw_arg(winws_core::command::render_arguments(args))
                .creation_flags(CREATE_NO_WINDOW);
        }
        #[cfg(not(windows))]
        command.args(args);

        let child = command.spawn()?;
        info!(pid = child.id(), exe = %exe.display(), args = args.len(), "Launched process");
        Ok(child)
    }
}

impl ProcessLauncher for WinwsLauncher {
    fn launch(&self, exe: &Path, args: &[String], work_dir: &Path) -> Result<u32> {
        Ok(self.spawn(exe, args, work_dir)?.id())
    }

    fn stop_all(&self, image_name: &str) -> Result<()> {
        if !cfg!(windows) {
            return Err(PlatformError::Unsupported("taskkill".into()));
        }
        let output = self.runner.run("taskkill", ["/F", "/IM", image_name, "/T"])?;
        if output.success() {
            info!(image = image_name, "Killed running processes");
        } else {
            // 128: no such process
            warn!(image = image_name, code = ?output.code, "Nothing to kill");
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_launch_missing_exe() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = WinwsLauncher::new(CommandRunner::new(Duration::from_secs(1)));
        let err = launcher.launch(&dir.path().join("winws.exe"), &[], dir.path()).unwrap_err();
        assert!(matches!(err, PlatformError::NotFound(_)));
    }

    #[test]
    fn test_spawn_runs_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = WinwsLauncher::new(CommandRunner::new(Duration::from_secs(1)));
        let mut child = launcher
            .spawn(Path::new("/bin/sh"), &["-c".into(), "test -d .".into()], dir.path())
            .unwrap();
        assert!(child.wait().unwrap().success());
    }

    #[test]
    fn test_stop_all_unsupported() {
        let launcher = WinwsLauncher::new(CommandRunner::new(Duration::from_secs(1)));
        assert!(matches!(launcher.stop_all(WINWS_IMAGE), Err(PlatformError::Unsupported(_))));
    }
}
