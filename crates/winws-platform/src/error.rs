//! Platform-specific errors

use std::time::Duration;
use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// External command exited with a failure code
    #[error("'{program}' failed (exit code {code:?}): {message}")]
    CommandFailed {
        /// Program that was run
        program: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Trimmed stderr (or stdout when stderr is empty)
        message: String,
    },

    /// External command did not finish in time and was killed
    #[error("'{program}' timed out after {timeout:?}")]
    Timeout {
        /// Program that was run
        program: String,
        /// Configured limit
        timeout: Duration,
    },

    /// Required tool or file is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation is not available on this platform
    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    /// Nothing to register or launch
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Win32 service API error
    #[error("Service error: {0}")]
    Service(String),

    /// Background worker failed
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// Core library error
    #[error(transparent)]
    Core(#[from] winws_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

impl PlatformError {
    /// Build a command failure from captured output
    pub fn command_failed(program: impl Into<String>, code: Option<i32>, stdout: &str, stderr: &str) -> Self {
        let message = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
        Self::CommandFailed {
            program: program.into(),
            code,
            message: message.to_string(),
        }
    }
}

impl From<PlatformError> for winws_core::Error {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Core(inner) => inner,
            other => winws_core::Error::Store(other.to_string()),
        }
    }
}
