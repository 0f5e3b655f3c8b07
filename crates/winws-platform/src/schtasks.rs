//! Scheduled tasks through `schtasks.exe`

use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use winws_core::command::escape_xml;

use crate::exec::CommandRunner;
use crate::traits::{TaskScheduler, TaskSpec, TaskTrigger};
use crate::Result;

const SCHTASKS: &str = "schtasks";

/// `schtasks.exe` backend.
///
/// Logon tasks are created with `/TR`; boot tasks need a SYSTEM principal
/// and are imported from a generated XML definition.
#[derive(Debug, Clone)]
pub struct SchtasksScheduler {
    runner: CommandRunner,
}

impl SchtasksScheduler {
    /// Scheduler using the given runner
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    fn xml_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{name}.task.xml"))
    }
}

/// Task scheduler XML for a boot task
pub fn task_xml(spec: &TaskSpec) -> String {
    let arguments = spec.target.arguments();
    let arguments_element = if arguments.is_empty() {
        String::new()
    } else {
        format!("\n      <Arguments>{}</Arguments>", escape_xml(&arguments))
    };
    let (trigger, principal) = match spec.trigger {
        TaskTrigger::Boot => (
            "<BootTrigger>\n      <Enabled>true</Enabled>\n    </BootTrigger>",
            "<UserId>S-1-5-18</UserId>",
        ),
        TaskTrigger::Logon => (
            "<LogonTrigger>\n      <Enabled>true</Enabled>\n    </LogonTrigger>",
            "<LogonType>InteractiveToken</LogonType>",
        ),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo>
    <Description>{description}</Description>
  </RegistrationInfo>
  <Triggers>
    {trigger}
  </Triggers>
  <Principals>
    <Principal id="Author">
      {principal}
      <RunLevel>HighestAvailable</RunLevel>
    </Principal>
  </Principals>
  <Settings>
    <MultipleInstancesPolicy>IgnoreNew</MultipleInstancesPolicy>
    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>
    <StopIfGoingOnBatteries>false</StopIfGoingOnBatteries>
    <ExecutionTimeLimit>PT0S</ExecutionTimeLimit>
    <Enabled>true</Enabled>
  </Settings>
  <Actions Context="Author">
    <Exec>
      <Command>{command}</Command>{arguments_element}
      <WorkingDirectory>{work_dir}</WorkingDirectory>
    </Exec>
  </Actions>
</Task>
"#,
        description = escape_xml(&format!("{} (winws-manager)", spec.name)),
        command = escape_xml(&spec.target.program.display().to_string()),
        work_dir = escape_xml(&spec.work_dir.display().to_string()),
    )
}

impl TaskScheduler for SchtasksScheduler {
    fn create_task(&self, spec: &TaskSpec) -> Result<()> {
        match spec.trigger {
            TaskTrigger::Logon => {
                let command_line = spec.target.command_line();
                self.runner.run_checked(
                    SCHTASKS,
                    [
                        "/Create", "/F", "/TN", spec.name.as_str(), "/TR", command_line.as_str(), "/SC", "ONLOGON", "/RL",
                        "HIGHEST",
                    ],
                )?;
            }
            TaskTrigger::Boot => {
                let path = Self::xml_path(&spec.name);
                fs::write(&path, task_xml(spec))?;
                debug!(path = %path.display(), "Wrote task definition");
                let path_arg = path.display().to_string();
                let result = self
                    .runner
                    .run_checked(SCHTASKS, ["/Create", "/F", "/TN", spec.name.as_str(), "/XML", path_arg.as_str()]);
                let _ = fs::remove_file(&path);
                result?;
            }
        }
        info!(name = %spec.name, trigger = ?spec.trigger, "Created scheduled task");
        Ok(())
    }

    fn delete_task(&self, name: &str) -> Result<()> {
        self.runner.run_checked(SCHTASKS, ["/Delete", "/F", "/TN", name])?;
        info!(name, "Deleted scheduled task");
        Ok(())
    }

    fn task_exists(&self, name: &str) -> Result<bool> {
        Ok(self.runner.run(SCHTASKS, ["/Query", "/TN", name])?.success())
    }
}
