//! Autostart orchestration
//!
//! Exactly one persistence mechanism is configured at a time. Enabling a
//! method first tears down whatever is installed, then registers the new
//! one and records it in the persisted [`AutostartStatus`]. The recorded
//! flag is always subordinate to what is observed on the system; see
//! [`AutostartOrchestrator::reconcile`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use winws_core::command::{BuiltCommand, InvocationContext, LaunchPlan};
use winws_core::config::{AppConfig, AutostartConfig, AutostartMethod};
use winws_core::store::{AutostartStatus, PersistentConfigStore};

use crate::error::{PlatformError, Result};
use crate::exec::CommandRunner;
use crate::nssm::NssmService;
use crate::schtasks::SchtasksScheduler;
use crate::scm::ScmService;
use crate::traits::{LaunchTarget, ServiceControl, ServiceSpec, TaskScheduler, TaskSpec, TaskTrigger};

const SERVICE_DESCRIPTION: &str = "DPI circumvention (winws) managed by winws-manager";

/// Stored flag next to what is actually installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutostartReport {
    /// Persisted flag
    pub stored: AutostartStatus,
    /// Mechanism found on the system
    pub observed: Option<AutostartMethod>,
}

impl AutostartReport {
    /// Whether the flag matches reality
    pub fn in_sync(&self) -> bool {
        match self.observed {
            Some(method) => self.stored == AutostartStatus::enabled(method),
            None => !self.stored.enabled,
        }
    }
}

/// Configures, removes and observes autostart mechanisms
#[derive(Clone)]
pub struct AutostartOrchestrator {
    tasks: Arc<dyn TaskScheduler>,
    nssm: Arc<dyn ServiceControl>,
    scm: Arc<dyn ServiceControl>,
    store: Arc<dyn PersistentConfigStore>,
    settings: AutostartConfig,
    bat_path: PathBuf,
}

impl AutostartOrchestrator {
    /// Orchestrator over explicit backends
    pub fn new(
        tasks: Arc<dyn TaskScheduler>,
        nssm: Arc<dyn ServiceControl>,
        scm: Arc<dyn ServiceControl>,
        store: Arc<dyn PersistentConfigStore>,
        settings: AutostartConfig,
        bat_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tasks,
            nssm,
            scm,
            store,
            settings,
            bat_path: bat_path.into(),
        }
    }

    /// Orchestrator over the real Windows backends
    pub fn from_config(config: &AppConfig, store: Arc<dyn PersistentConfigStore>) -> Self {
        let runner = CommandRunner::new(Duration::from_secs(config.autostart.timeout_secs));
        Self::new(
            Arc::new(SchtasksScheduler::new(runner)),
            Arc::new(NssmService::new(config.resolve_path(&config.autostart.nssm_path), runner)),
            Arc::new(ScmService::new()),
            store,
            config.autostart.clone(),
            config.resolve_path(&config.autostart.batch_file),
        )
    }

    /// Batch wrapper location
    pub fn bat_path(&self) -> &Path {
        &self.bat_path
    }

    fn service_backend(&self, method: AutostartMethod) -> &dyn ServiceControl {
        match method {
            AutostartMethod::Nssm => self.nssm.as_ref(),
            _ => self.scm.as_ref(),
        }
    }

    /// Register `built` with `method`, replacing any existing mechanism
    #[instrument(skip_all, fields(method = %method))]
    pub fn enable(&self, method: AutostartMethod, built: &BuiltCommand) -> Result<LaunchPlan> {
        if built.is_empty() {
            return Err(PlatformError::InvalidInput(
                "no active categories, nothing to register".into(),
            ));
        }
        self.disable()?;

        let context = if method.is_service() {
            InvocationContext::Service
        } else {
            InvocationContext::ScheduledTask
        };
        let plan = LaunchPlan::plan(built, context, &self.bat_path);
        plan.materialize()?;
        let target = self.target_for(&plan, built, method);

        match method {
            AutostartMethod::Task | AutostartMethod::BootTask => {
                let (name, trigger) = if method == AutostartMethod::Task {
                    (&self.settings.task_name, TaskTrigger::Logon)
                } else {
                    (&self.settings.boot_task_name, TaskTrigger::Boot)
                };
                self.tasks.create_task(&TaskSpec {
                    name: name.clone(),
                    target,
                    work_dir: built.work_dir.clone(),
                    trigger,
                })?;
            }
            AutostartMethod::Nssm | AutostartMethod::Service => {
                let backend = self.service_backend(method);
                backend.create_service(&ServiceSpec {
                    name: self.settings.service_name.clone(),
                    display_name: self.settings.service_display_name.clone(),
                    description: SERVICE_DESCRIPTION.to_string(),
                    target,
                    work_dir: built.work_dir.clone(),
                })?;
                backend.start_service(&self.settings.service_name)?;
            }
        }

        AutostartStatus::enabled(method).save(self.store.as_ref())?;
        info!(batch = plan.is_batch(), "Autostart enabled");
        Ok(plan)
    }

    fn target_for(&self, plan: &LaunchPlan, built: &BuiltCommand, method: AutostartMethod) -> LaunchTarget {
        match plan {
            LaunchPlan::Inline { .. } => LaunchTarget::new(&built.exe_path, built.tokens.clone()),
            LaunchPlan::Batch { path, .. } if method.is_service() => LaunchTarget::new(
                "cmd.exe",
                vec!["/c".to_string(), path.display().to_string()],
            ),
            LaunchPlan::Batch { path, .. } => LaunchTarget::new(path, Vec::new()),
        }
    }

    /// Remove every mechanism found and clear the flag.
    /// Returns the methods that were removed.
    #[instrument(skip_all)]
    pub fn disable(&self) -> Result<Vec<AutostartMethod>> {
        let mut removed = Vec::new();

        for (method, name) in [
            (AutostartMethod::Task, &self.settings.task_name),
            (AutostartMethod::BootTask, &self.settings.boot_task_name),
        ] {
            if available(self.tasks.task_exists(name))? {
                self.tasks.delete_task(name)?;
                removed.push(method);
            }
        }

        if let Some(method) = self.observe_service()? {
            let backend = self.service_backend(method);
            let name = &self.settings.service_name;
            if let Err(e) = backend.stop_service(name) {
                warn!(service = %name, error = %e, "Failed to stop service before removal");
            }
            backend.delete_service(name)?;
            removed.push(method);
        }

        AutostartStatus::clear(self.store.as_ref())?;
        if self.bat_path.exists() {
            fs::remove_file(&self.bat_path)?;
            debug!(path = %self.bat_path.display(), "Removed batch wrapper");
        }
        info!(removed = ?removed, "Autostart disabled");
        Ok(removed)
    }

    /// Find the installed service, if any. NSSM and native services share a
    /// name; the stored method tells them apart.
    fn observe_service(&self) -> Result<Option<AutostartMethod>> {
        let name = &self.settings.service_name;
        let exists = match self.scm.service_exists(name) {
            Err(PlatformError::Unsupported(_)) => available(self.nssm.service_exists(name))?,
            other => available(other)?,
        };
        if !exists {
            return Ok(None);
        }
        let stored = AutostartStatus::load(self.store.as_ref())?;
        Ok(Some(match stored.method {
            Some(AutostartMethod::Nssm) => AutostartMethod::Nssm,
            _ => AutostartMethod::Service,
        }))
    }

    /// Mechanism actually installed
    pub fn observe(&self) -> Result<Option<AutostartMethod>> {
        if available(self.tasks.task_exists(&self.settings.task_name))? {
            return Ok(Some(AutostartMethod::Task));
        }
        if available(self.tasks.task_exists(&self.settings.boot_task_name))? {
            return Ok(Some(AutostartMethod::BootTask));
        }
        self.observe_service()
    }

    /// Stored flag and observed state
    pub fn status(&self) -> Result<AutostartReport> {
        Ok(AutostartReport {
            stored: AutostartStatus::load(self.store.as_ref())?,
            observed: self.observe()?,
        })
    }

    /// Overwrite the flag from observed state; `true` when it changed
    pub fn reconcile(&self) -> Result<bool> {
        let observed = self.observe()?;
        Ok(AutostartStatus::reconcile(self.store.as_ref(), observed)?)
    }

    /// [`enable`](Self::enable) on a blocking worker
    pub async fn enable_async(&self, method: AutostartMethod, built: BuiltCommand) -> Result<LaunchPlan> {
        let this = self.clone();
        run_blocking(move || this.enable(method, &built)).await
    }

    /// [`disable`](Self::disable) on a blocking worker
    pub async fn disable_async(&self) -> Result<Vec<AutostartMethod>> {
        let this = self.clone();
        run_blocking(move || this.disable()).await
    }

    /// [`reconcile`](Self::reconcile) on a blocking worker
    pub async fn reconcile_async(&self) -> Result<bool> {
        let this = self.clone();
        run_blocking(move || this.reconcile()).await
    }
}

/// A missing tool or unsupported platform means nothing is installed
fn available(result: Result<bool>) -> Result<bool> {
    match result {
        Err(PlatformError::NotFound(what)) | Err(PlatformError::Unsupported(what)) => {
            debug!(what = %what, "Mechanism unavailable, treated as absent");
            Ok(false)
        }
        other => other,
    }
}

/// Run blocking platform work off the async runtime
pub async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PlatformError::Worker(e.to_string()))?
}
