//! Autostart orchestration against an in-memory Windows

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use winws_core::config::AutostartConfig;
use winws_core::{AutostartMethod, AutostartStatus, BuiltCommand, FileStore, PersistentConfigStore};
use winws_platform::{
    AutostartOrchestrator, LaunchTarget, PlatformError, Result, ServiceControl, ServiceSpec, TaskScheduler, TaskSpec,
};

/// Installed tasks and services, keyed by name
#[derive(Default)]
struct FakeSystem {
    tasks: Mutex<BTreeMap<String, TaskSpec>>,
    services: Mutex<BTreeMap<String, (ServiceSpec, bool)>>,
}

impl TaskScheduler for FakeSystem {
    fn create_task(&self, spec: &TaskSpec) -> Result<()> {
        self.tasks.lock().insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    fn delete_task(&self, name: &str) -> Result<()> {
        self.tasks
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(name.to_string()))
    }

    fn task_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tasks.lock().contains_key(name))
    }
}

impl ServiceControl for FakeSystem {
    fn create_service(&self, spec: &ServiceSpec) -> Result<()> {
        let mut services = self.services.lock();
        if services.contains_key(&spec.name) {
            return Err(PlatformError::Service(format!("{} already exists", spec.name)));
        }
        services.insert(spec.name.clone(), (spec.clone(), false));
        Ok(())
    }

    fn start_service(&self, name: &str) -> Result<()> {
        match self.services.lock().get_mut(name) {
            Some((_, running)) => {
                *running = true;
                Ok(())
            }
            None => Err(PlatformError::NotFound(name.to_string())),
        }
    }

    fn stop_service(&self, name: &str) -> Result<()> {
        if let Some((_, running)) = self.services.lock().get_mut(name) {
            *running = false;
        }
        Ok(())
    }

    fn delete_service(&self, name: &str) -> Result<()> {
        self.services.lock().remove(name);
        Ok(())
    }

    fn service_exists(&self, name: &str) -> Result<bool> {
        Ok(self.services.lock().contains_key(name))
    }
}

fn built(tokens: &[&str]) -> BuiltCommand {
    let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    BuiltCommand {
        exe_path: PathBuf::from("C:/zapret/bin/winws.exe"),
        work_dir: PathBuf::from("C:/zapret"),
        command_line: LaunchTarget::new("C:/zapret/bin/winws.exe", tokens.clone()).command_line(),
        tokens,
        active_categories: vec!["youtube".into()],
    }
}

fn setup(dir: &Path) -> (Arc<FakeSystem>, Arc<FileStore>, AutostartOrchestrator) {
    let system = Arc::new(FakeSystem::default());
    let store = Arc::new(FileStore::new(dir.join("state.json")));
    let orchestrator = AutostartOrchestrator::new(
        system.clone(),
        system.clone(),
        system.clone(),
        store.clone(),
        AutostartConfig::default(),
        dir.join("autostart.bat"),
    );
    (system, store, orchestrator)
}

#[test]
fn test_switching_methods_keeps_one_mechanism() {
    let dir = tempfile::tempdir().unwrap();
    let (system, store, orchestrator) = setup(dir.path());
    let command = built(&["--wf-tcp=443", "--filter-tcp=443", "--dpi-desync=fake"]);

    orchestrator.enable(AutostartMethod::Task, &command).unwrap();
    assert!(system.tasks.lock().contains_key("winws-manager"));

    orchestrator.enable(AutostartMethod::Service, &command).unwrap();
    assert!(system.tasks.lock().is_empty());
    let services = system.services.lock();
    let (spec, running) = services.get("WinwsManager").unwrap();
    assert!(*running);
    assert_eq!(spec.target.args.len(), 3);
    drop(services);

    // flag survives a fresh store instance
    let reopened = FileStore::new(store.path());
    assert_eq!(
        AutostartStatus::load(&reopened).unwrap(),
        AutostartStatus::enabled(AutostartMethod::Service)
    );
    assert!(orchestrator.status().unwrap().in_sync());
}

#[test]
fn test_boot_task_and_disable() {
    let dir = tempfile::tempdir().unwrap();
    let (system, store, orchestrator) = setup(dir.path());

    orchestrator
        .enable(AutostartMethod::BootTask, &built(&["--wf-udp=443"]))
        .unwrap();
    assert_eq!(orchestrator.observe().unwrap(), Some(AutostartMethod::BootTask));

    assert_eq!(orchestrator.disable().unwrap(), vec![AutostartMethod::BootTask]);
    assert!(system.tasks.lock().is_empty());
    assert_eq!(AutostartStatus::load(store.as_ref()).unwrap(), AutostartStatus::default());
    assert_eq!(orchestrator.disable().unwrap(), Vec::new());
}

#[test]
fn test_manual_removal_is_reconciled() {
    let dir = tempfile::tempdir().unwrap();
    let (system, store, orchestrator) = setup(dir.path());
    orchestrator
        .enable(AutostartMethod::Nssm, &built(&["--wf-tcp=80"]))
        .unwrap();

    // someone deletes the service behind our back
    system.services.lock().clear();
    assert!(!orchestrator.status().unwrap().in_sync());

    assert!(orchestrator.reconcile().unwrap());
    assert_eq!(store.get("autostart_enabled").unwrap().as_deref(), Some("false"));
    assert_eq!(store.get("autostart_method").unwrap(), None);
}

#[test]
fn test_long_task_command_goes_through_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _store, orchestrator) = setup(dir.path());
    let long: Vec<String> = (0..30).map(|i| format!("--hostlist=C:/zapret/lists/list-{i}.txt")).collect();
    let long: Vec<&str> = long.iter().map(String::as_str).collect();

    let plan = orchestrator.enable(AutostartMethod::Task, &built(&long)).unwrap();
    assert!(plan.is_batch());

    let tasks = system.tasks.lock();
    let task = tasks.get("winws-manager").unwrap();
    assert_eq!(task.target.program, dir.path().join("autostart.bat"));
    assert!(task.target.command_line().chars().count() <= 260);

    let script = std::fs::read_to_string(dir.path().join("autostart.bat")).unwrap();
    assert!(script.starts_with("@echo off\r\n"));
    assert!(script.contains("list-29.txt"));
}

#[tokio::test]
async fn test_async_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (_system, _store, orchestrator) = setup(dir.path());

    orchestrator
        .enable_async(AutostartMethod::Task, built(&["--wf-tcp=443"]))
        .await
        .unwrap();
    assert!(!orchestrator.reconcile_async().await.unwrap());
    assert_eq!(orchestrator.disable_async().await.unwrap(), vec![AutostartMethod::Task]);
}
