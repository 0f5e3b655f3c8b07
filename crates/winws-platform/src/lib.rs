//! # winws-manager Platform
//!
//! Operating system collaborators for winws-manager.
//!
//! Every external facility sits behind a narrow trait so the orchestration
//! can be tested with mocks:
//!
//! - [`TaskScheduler`] - `schtasks.exe`
//! - [`ServiceControl`] - NSSM and the Win32 service control manager
//! - [`ProcessLauncher`] - direct winws launch and `taskkill`
//! - [`RegistryStore`] - registry-backed [`winws_core::PersistentConfigStore`]
//!
//! External commands run through [`CommandRunner`], which enforces a hard
//! timeout and kills the child when it expires.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod autostart;
pub mod error;
pub mod exec;
pub mod launcher;
pub mod nssm;
pub mod registry;
pub mod schtasks;
pub mod scm;
pub mod traits;

pub use autostart::{run_blocking, AutostartOrchestrator, AutostartReport};
pub use error::{PlatformError, Result};
pub use exec::{CommandOutput, CommandRunner};
pub use launcher::{WinwsLauncher, WINWS_IMAGE};
pub use nssm::NssmService;
pub use registry::RegistryStore;
pub use schtasks::SchtasksScheduler;
pub use scm::ScmService;
pub use traits::{LaunchTarget, ProcessLauncher, ServiceControl, ServiceSpec, TaskScheduler, TaskSpec, TaskTrigger};
