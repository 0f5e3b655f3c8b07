//! Subprocess execution with a hard timeout

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{PlatformError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None when terminated by a signal)
    pub code: Option<i32>,
    /// Decoded stdout
    pub stdout: String,
    /// Decoded stderr
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external tools, killing them when they exceed the timeout
#[derive(Debug, Clone, Copy)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    /// Runner with a per-command timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run and capture output; a non-zero exit is not an error here
    pub fn run<I, S>(&self, program: impl AsRef<OsStr>, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let name = program.to_string_lossy().into_owned();
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        debug!(program = %name, "Running command");
        let child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PlatformError::NotFound(name.clone()),
            _ => PlatformError::Io(e),
        })?;
        self.wait(child, name)
    }

    /// Run and fail on a non-zero exit code
    pub fn run_checked<I, S>(&self, program: impl AsRef<OsStr>, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let output = self.run(program, args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(PlatformError::command_failed(
                program.to_string_lossy(),
                output.code,
                &output.stdout,
                &output.stderr,
            ))
        }
    }

    fn wait(&self, mut child: Child, name: String) -> Result<CommandOutput> {
        // Drain pipes on threads so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                warn!(program = %name, timeout = ?self.timeout, "Command timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                return Err(PlatformError::Timeout {
                    program: name,
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = CommandOutput {
            code: status.code(),
            stdout: stdout.map(join_reader).unwrap_or_default(),
            stderr: stderr.map(join_reader).unwrap_or_default(),
        };
        debug!(program = %name, code = ?output.code, "Command finished");
        Ok(output)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: thread::JoinHandle<Vec<u8>>) -> String {
    handle
        .join()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
