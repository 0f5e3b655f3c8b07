//! Native services through the Win32 service control manager

use crate::error::Result;
use crate::traits::{ServiceControl, ServiceSpec};

/// Win32 SCM backend
#[derive(Debug, Clone, Copy, Default)]
pub struct ScmService;

impl ScmService {
    /// New backend
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
mod imp {
    use std::ffi::{OsStr, OsString};
    use tracing::{debug, info};
    use windows_service::service::{
        ServiceAccess, ServiceErrorControl, ServiceInfo, ServiceStartType, ServiceState, ServiceType,
    };
    use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};

    use super::*;
    use crate::error::PlatformError;

    const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;
    const ERROR_SERVICE_NOT_ACTIVE: i32 = 1062;

    fn os_code(e: &windows_service::Error) -> Option<i32> {
        match e {
            windows_service::Error::Winapi(io) => io.raw_os_error(),
            _ => None,
        }
    }

    fn service_error(action: &str, name: &str, e: windows_service::Error) -> PlatformError {
        PlatformError::Service(format!("{action} '{name}': {e}"))
    }

    fn manager(access: ServiceManagerAccess) -> Result<ServiceManager> {
        ServiceManager::local_computer(None::<&str>, access)
            .map_err(|e| PlatformError::Service(format!("open service manager: {e}")))
    }

    impl ServiceControl for ScmService {
        fn create_service(&self, spec: &ServiceSpec) -> Result<()> {
            let manager = manager(ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE)?;
            let info = ServiceInfo {
                name: OsString::from(&spec.name),
                display_name: OsString::from(&spec.display_name),
                service_type: ServiceType::OWN_PROCESS,
                start_type: ServiceStartType::AutoStart,
                error_control: ServiceErrorControl::Normal,
                executable_path: spec.target.program.clone(),
                launch_arguments: spec.target.args.iter().map(OsString::from).collect(),
                dependencies: Vec::new(),
                account_name: None,
                account_password: None,
            };
            let service = manager
                .create_service(&info, ServiceAccess::CHANGE_CONFIG)
                .map_err(|e| service_error("create", &spec.name, e))?;
            if !spec.description.is_empty() {
                service
                    .set_description(&spec.description)
                    .map_err(|e| service_error("describe", &spec.name, e))?;
            }
            info!(service = %spec.name, "Created service");
            Ok(())
        }

        fn start_service(&self, name: &str) -> Result<()> {
            let manager = manager(ServiceManagerAccess::CONNECT)?;
            let service = manager
                .open_service(name, ServiceAccess::START | ServiceAccess::QUERY_STATUS)
                .map_err(|e| service_error("open", name, e))?;
            let status = service.query_status().map_err(|e| service_error("query", name, e))?;
            if status.current_state == ServiceState::Running {
                debug!(service = name, "Service already running");
                return Ok(());
            }
            service
                .start::<&OsStr>(&[])
                .map_err(|e| service_error("start", name, e))?;
            info!(service = name, "Started service");
            Ok(())
        }

        fn stop_service(&self, name: &str) -> Result<()> {
            let manager = manager(ServiceManagerAccess::CONNECT)?;
            let service = manager
                .open_service(name, ServiceAccess::STOP)
                .map_err(|e| service_error("open", name, e))?;
            match service.stop() {
                Ok(_) => {
                    info!(service = name, "Stopped service");
                    Ok(())
                }
                Err(e) if os_code(&e) == Some(ERROR_SERVICE_NOT_ACTIVE) => {
                    debug!(service = name, "Service was not running");
                    Ok(())
                }
                Err(e) => Err(service_error("stop", name, e)),
            }
        }

        fn delete_service(&self, name: &str) -> Result<()> {
            let manager = manager(ServiceManagerAccess::CONNECT)?;
            let service = manager
                .open_service(name, ServiceAccess::DELETE)
                .map_err(|e| service_error("open", name, e))?;
            service.delete().map_err(|e| service_error("delete", name, e))?;
            info!(service = name, "Deleted service");
            Ok(())
        }

        fn service_exists(&self, name: &str) -> Result<bool> {
            let manager = manager(ServiceManagerAccess::CONNECT)?;
            match manager.open_service(name, ServiceAccess::QUERY_STATUS) {
                Ok(_) => Ok(true),
                Err(e) if os_code(&e) == Some(ERROR_SERVICE_DOES_NOT_EXIST) => Ok(false),
                Err(e) => Err(service_error("open", name, e)),
            }
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use super::*;
    use crate::error::PlatformError;

    fn unsupported() -> PlatformError {
        PlatformError::Unsupported("Win32 service manager".into())
    }

    impl ServiceControl for ScmService {
        fn create_service(&self, _spec: &ServiceSpec) -> Result<()> {
            Err(unsupported())
        }

        fn start_service(&self, _name: &str) -> Result<()> {
            Err(unsupported())
        }

        fn stop_service(&self, _name: &str) -> Result<()> {
            Err(unsupported())
        }

        fn delete_service(&self, _name: &str) -> Result<()> {
            Err(unsupported())
        }

        fn service_exists(&self, _name: &str) -> Result<bool> {
            Err(unsupported())
        }
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::error::PlatformError;

    #[test]
    fn test_unsupported_off_windows() {
        let scm = ScmService::new();
        assert!(matches!(scm.service_exists("x"), Err(PlatformError::Unsupported(_))));
    }
}
