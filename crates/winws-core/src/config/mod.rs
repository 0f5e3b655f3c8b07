//! Configuration management for winws-manager
//!
//! Strongly-typed TOML configuration. Every section has defaults so a
//! partial file (or none at all) yields a working setup.

use crate::chain::FilterChainConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// File locations
    pub paths: PathsConfig,

    /// Command composition
    pub pipeline: PipelineConfig,

    /// Autostart mechanism settings
    pub autostart: AutostartConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Persisted state backend
    pub state: StateConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.paths.work_dir.as_os_str().is_empty() {
            return Err(Error::config_value("paths.work_dir", "Must not be empty"));
        }
        if self.paths.winws_exe.as_os_str().is_empty() {
            return Err(Error::config_value("paths.winws_exe", "Must not be empty"));
        }

        if let Some(set) = &self.pipeline.strategy_set {
            if set.is_empty() || !set.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::config_value(
                    "pipeline.strategy_set",
                    format!("Invalid strategy set name: {set:?}"),
                ));
            }
        }

        for (key, value) in [
            ("autostart.task_name", &self.autostart.task_name),
            ("autostart.boot_task_name", &self.autostart.boot_task_name),
            ("autostart.service_name", &self.autostart.service_name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_value(key, "Must not be empty"));
            }
            if value.contains(['"', '\\', '/']) {
                return Err(Error::config_value(key, "Must not contain quotes or slashes"));
            }
        }
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.autostart.timeout_secs) {
            return Err(Error::config_value(
                "autostart.timeout_secs",
                format!("Must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS}"),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_value(
                "logging.level",
                format!("Unknown level {:?}, expected one of {}", self.logging.level, LOG_LEVELS.join(", ")),
            ));
        }

        match self.state.backend {
            StateBackend::File if self.state.file.as_os_str().is_empty() => {
                Err(Error::config_value("state.file", "Must not be empty for the file backend"))
            }
            StateBackend::Registry if self.state.registry_key.trim().is_empty() => Err(
                Error::config_value("state.registry_key", "Must not be empty for the registry backend"),
            ),
            _ => Ok(()),
        }
    }

    /// Resolve a configured path against `paths.work_dir`
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.work_dir.join(path)
        }
    }

    /// Absolute-ish path of the winws executable
    pub fn winws_exe(&self) -> PathBuf {
        self.resolve_path(&self.paths.winws_exe)
    }

    /// Builtin strategy directory
    pub fn builtin_strategies_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.builtin_strategies)
    }

    /// User strategy directory
    pub fn user_strategies_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.user_strategies)
    }

    /// Builtin categories document
    pub fn categories_file(&self) -> PathBuf {
        self.resolve_path(&self.paths.categories)
    }

    /// User categories document
    pub fn user_categories_file(&self) -> PathBuf {
        self.resolve_path(&self.paths.user_categories)
    }

    /// Raw windivert filter directory, if overridden
    pub fn filter_dir(&self) -> Option<PathBuf> {
        self.paths.filter_dir.as_deref().map(|p| self.resolve_path(p))
    }

    /// State file for the file backend
    pub fn state_file(&self) -> PathBuf {
        self.resolve_path(&self.state.file)
    }
}

const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 30;
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// File locations. Relative paths resolve against `work_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// winws working directory (contains `bin/`, `lists/`, `windivert.filter/`)
    pub work_dir: PathBuf,
    /// winws executable
    pub winws_exe: PathBuf,
    /// Shipped strategy documents
    pub builtin_strategies: PathBuf,
    /// User strategy documents
    pub user_strategies: PathBuf,
    /// Shipped categories document
    pub categories: PathBuf,
    /// User categories document
    pub user_categories: PathBuf,
    /// Override for the raw filter directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            winws_exe: PathBuf::from("bin/winws.exe"),
            builtin_strategies: PathBuf::from("strategies/builtin"),
            user_strategies: PathBuf::from("strategies/user"),
            categories: PathBuf::from("strategies/categories.json"),
            user_categories: PathBuf::from("strategies/user/categories.json"),
            filter_dir: None,
        }
    }
}

/// Command composition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Strategy set suffix, e.g. `orchestra`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_set: Option<String>,
    /// Prepend `--wf-*` capture flags for the active categories
    pub capture_filters: bool,
    /// Rewrite pass toggles
    pub filters: FilterChainConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy_set: None,
            capture_filters: true,
            filters: FilterChainConfig::default(),
        }
    }
}

/// Autostart persistence mechanism
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutostartMethod {
    /// Scheduled task at user logon
    #[default]
    Task,
    /// Scheduled task at system boot (SYSTEM account)
    BootTask,
    /// Service wrapped by NSSM
    Nssm,
    /// Native Win32 service
    Service,
}

impl AutostartMethod {
    /// Every method
    pub const ALL: [AutostartMethod; 4] = [
        AutostartMethod::Task,
        AutostartMethod::BootTask,
        AutostartMethod::Nssm,
        AutostartMethod::Service,
    ];

    /// Name as stored and accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            AutostartMethod::Task => "task",
            AutostartMethod::BootTask => "boot-task",
            AutostartMethod::Nssm => "nssm",
            AutostartMethod::Service => "service",
        }
    }

    /// Whether the method registers a service rather than a task
    pub fn is_service(&self) -> bool {
        matches!(self, AutostartMethod::Nssm | AutostartMethod::Service)
    }
}

impl fmt::Display for AutostartMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AutostartMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        AutostartMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| Error::config_value("autostart.method", format!("Unknown method: {s}")))
    }
}

/// Autostart settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutostartConfig {
    /// Mechanism used by `autostart enable` when none is given
    pub method: AutostartMethod,
    /// Logon task name
    pub task_name: String,
    /// Boot task name
    pub boot_task_name: String,
    /// Service name (NSSM and native)
    pub service_name: String,
    /// Service display name
    pub service_display_name: String,
    /// NSSM executable
    pub nssm_path: PathBuf,
    /// Batch file written when the command line is too long
    pub batch_file: PathBuf,
    /// Timeout for each external command
    pub timeout_secs: u64,
}

impl Default for AutostartConfig {
    fn default() -> Self {
        Self {
            method: AutostartMethod::Task,
            task_name: "winws-manager".to_string(),
            boot_task_name: "winws-manager-boot".to_string(),
            service_name: "WinwsManager".to_string(),
            service_display_name: "winws DPI bypass".to_string(),
            nssm_path: PathBuf::from("bin/nssm.exe"),
            batch_file: PathBuf::from("autostart.bat"),
            timeout_secs: MAX_TIMEOUT_SECS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (None = stderr only)
    pub file: Option<String>,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
        }
    }
}

/// Where persisted state lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// JSON file
    #[default]
    File,
    /// Windows registry (`reg.exe`)
    Registry,
    /// Process memory, lost on exit
    Memory,
}

/// Persisted state settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Backend
    pub backend: StateBackend,
    /// File for the file backend
    pub file: PathBuf,
    /// Key for the registry backend
    pub registry_key: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::File,
            file: PathBuf::from("state.json"),
            registry_key: r"HKCU\Software\winws-manager".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========== Default Config Tests ===========

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.paths.work_dir, PathBuf::from("."));
        assert!(config.pipeline.capture_filters);
        assert_eq!(config.pipeline.filters, FilterChainConfig::default());
        assert_eq!(config.autostart.method, AutostartMethod::Task);
        assert_eq!(config.state.backend, StateBackend::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_path() {
        let mut config = AppConfig::default();
        config.paths.work_dir = PathBuf::from("/app");
        assert_eq!(config.winws_exe(), PathBuf::from("/app/bin/winws.exe"));
        assert_eq!(config.resolve_path(Path::new("/etc/x")), PathBuf::from("/etc/x"));
        assert_eq!(config.filter_dir(), None);
        config.paths.filter_dir = Some(PathBuf::from("filters"));
        assert_eq!(config.filter_dir(), Some(PathBuf::from("/app/filters")));
    }

    // =========== Validation Tests ===========

    #[test]
    fn test_validation_strategy_set() {
        let mut config = AppConfig::default();
        config.pipeline.strategy_set = Some("orchestra".into());
        assert!(config.validate().is_ok());
        config.pipeline.strategy_set = Some("../evil".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_names_and_timeout() {
        let mut config = AppConfig::default();
        config.autostart.task_name = "  ".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.autostart.service_name = "bad\"name".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.autostart.timeout_secs = 120;
        assert!(config.validate().is_err());
        config.autostart.timeout_secs = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "WARN".into();
        assert!(config.validate().is_ok());
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_state() {
        let mut config = AppConfig::default();
        config.state.backend = StateBackend::Registry;
        config.state.registry_key = String::new();
        assert!(config.validate().is_err());
        config.state.backend = StateBackend::Memory;
        assert!(config.validate().is_ok());
    }

    // =========== TOML Serialization Tests ===========

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.pipeline.filters.wssize_injection = true;
        config.autostart.method = AutostartMethod::BootTask;
        let toml = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&toml).unwrap();
        assert!(parsed.pipeline.filters.wssize_injection);
        assert_eq!(parsed.autostart.method, AutostartMethod::BootTask);
        assert_eq!(parsed.paths.winws_exe, config.paths.winws_exe);
    }

    #[test]
    fn test_toml_parse_minimal() {
        let toml_content = r#"
[paths]
work_dir = "C:/zapret"

[pipeline]
strategy_set = "orchestra"

[pipeline.filters]
strip_hostlists = true

[autostart]
method = "nssm"
"#;
        let config = AppConfig::from_toml(toml_content).unwrap();
        assert_eq!(config.paths.work_dir, PathBuf::from("C:/zapret"));
        assert_eq!(config.paths.winws_exe, PathBuf::from("bin/winws.exe"));
        assert_eq!(config.pipeline.strategy_set.as_deref(), Some("orchestra"));
        assert!(config.pipeline.filters.strip_hostlists);
        assert!(!config.pipeline.filters.strip_ipsets);
        assert_eq!(config.autostart.method, AutostartMethod::Nssm);
    }

    #[test]
    fn test_toml_parse_invalid() {
        assert!(AppConfig::from_toml("this is not [valid toml").is_err());
        assert!(AppConfig::from_toml("[autostart]\nmethod = \"cron\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_autostart_method_parse() {
        for method in AutostartMethod::ALL {
            assert_eq!(method.as_str().parse::<AutostartMethod>().unwrap(), method);
        }
        assert_eq!("boot_task".parse::<AutostartMethod>().unwrap(), AutostartMethod::BootTask);
        assert!("cron".parse::<AutostartMethod>().is_err());
        assert!(AutostartMethod::Nssm.is_service());
        assert!(!AutostartMethod::Task.is_service());
    }
}
