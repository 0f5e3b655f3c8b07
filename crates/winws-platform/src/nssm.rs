//! Services wrapped by NSSM

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PlatformError, Result};
use crate::exec::CommandRunner;
use crate::traits::{ServiceControl, ServiceSpec};

/// `nssm.exe` backend
#[derive(Debug, Clone)]
pub struct NssmService {
    nssm: PathBuf,
    runner: CommandRunner,
}

impl NssmService {
    /// Backend using the given `nssm.exe`
    pub fn new(nssm: impl Into<PathBuf>, runner: CommandRunner) -> Self {
        Self {
            nssm: nssm.into(),
            runner,
        }
    }

    /// Path to `nssm.exe`
    pub fn nssm_path(&self) -> &Path {
        &self.nssm
    }

    fn ensure_present(&self) -> Result<()> {
        if self.nssm.is_file() {
            Ok(())
        } else {
            Err(PlatformError::NotFound(self.nssm.display().to_string()))
        }
    }

    fn nssm(&self, args: &[&str]) -> Result<()> {
        self.ensure_present()?;
        self.runner.run_checked(&self.nssm, args)?;
        Ok(())
    }
}

/// Argument vectors for registering a service, in invocation order
pub fn install_commands(spec: &ServiceSpec) -> Vec<Vec<String>> {
    let name = spec.name.clone();
    let mut install = vec!["install".to_string(), name.clone(), spec.target.program.display().to_string()];
    install.extend(spec.target.args.iter().cloned());

    let set = |key: &str, value: String| vec!["set".to_string(), name.clone(), key.to_string(), value];
    vec![
        install,
        set("AppDirectory", spec.work_dir.display().to_string()),
        set("DisplayName", spec.display_name.clone()),
        set("Description", spec.description.clone()),
        set("Start", "SERVICE_AUTO_START".to_string()),
    ]
}

impl ServiceControl for NssmService {
    fn create_service(&self, spec: &ServiceSpec) -> Result<()> {
        self.ensure_present()?;
        for args in install_commands(spec) {
            debug!(service = %spec.name, step = %args[0], "nssm");
            self.runner.run_checked(&self.nssm, &args)?;
        }
        info!(service = %spec.name, "Installed NSSM service");
        Ok(())
    }

    fn start_service(&self, name: &str) -> Result<()> {
        self.nssm(&["start", name])?;
        info!(service = name, "Started service");
        Ok(())
    }

    fn stop_service(&self, name: &str) -> Result<()> {
        self.nssm(&["stop", name])?;
        info!(service = name, "Stopped service");
        Ok(())
    }

    fn delete_service(&self, name: &str) -> Result<()> {
        self.nssm(&["remove", name, "confirm"])?;
        info!(service = name, "Removed NSSM service");
        Ok(())
    }

    fn service_exists(&self, name: &str) -> Result<bool> {
        self.ensure_present()?;
        Ok(self.runner.run(&self.nssm, ["status", name])?.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LaunchTarget;
    use std::time::Duration;

    #[test]
    fn test_install_commands() {
        let spec = ServiceSpec {
            name: "WinwsManager".into(),
            display_name: "winws DPI bypass".into(),
            description: "DPI bypass".into(),
            target: LaunchTarget::new("C:/zapret/bin/winws.exe", vec!["--wf-tcp=443".into(), "--new".into()]),
            work_dir: PathBuf::from("C:/zapret"),
        };
        let commands = install_commands(&spec);
        assert_eq!(commands.len(), 5);
        assert_eq!(
            commands[0],
            ["install", "WinwsManager", "C:/zapret/bin/winws.exe", "--wf-tcp=443", "--new"]
        );
        assert_eq!(commands[1], ["set", "WinwsManager", "AppDirectory", "C:/zapret"]);
        assert_eq!(commands[4], ["set", "WinwsManager", "Start", "SERVICE_AUTO_START"]);
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let service = NssmService::new(dir.path().join("nssm.exe"), CommandRunner::new(Duration::from_secs(1)));
        assert!(matches!(service.service_exists("x"), Err(PlatformError::NotFound(_))));
        assert!(matches!(service.start_service("x"), Err(PlatformError::NotFound(_))));
    }
}
