//! Loaded configuration plus the collaborators built from it

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use winws_core::config::StateBackend;
use winws_core::{
    AppConfig, BuiltCommand, CategoryCatalog, CommandLineBuilder, FileStore, MemoryStore, PersistentConfigStore,
    Selections, StrategyRegistry, StrategyTables,
};
use winws_platform::{AutostartOrchestrator, CommandRunner, RegistryStore};

/// Config file name looked up in the working and config directories
pub const CONFIG_FILE_NAME: &str = "winws-manager.toml";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> = Lazy::new(|| ProjectDirs::from("", "", "winws-manager"));

/// Per-user config file, if the platform has a config directory
pub fn user_config_file() -> Option<PathBuf> {
    PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// First existing config file in search order
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    user_config_file().filter(|path| path.exists())
}

/// Everything a command needs
pub struct AppContext {
    /// Effective configuration
    pub config: AppConfig,
    /// File the configuration came from
    pub config_path: Option<PathBuf>,
    store: Arc<dyn PersistentConfigStore>,
}

impl AppContext {
    /// Load configuration from `--config` or the search path and apply
    /// command-line overrides
    pub fn load(config: Option<&Path>, work_dir: Option<&Path>) -> Result<Self> {
        let config_path = config.map(Path::to_path_buf).or_else(find_config_file);
        let mut config = match &config_path {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AppConfig::default(),
        };
        if let Some(dir) = work_dir {
            config.paths.work_dir = dir.to_path_buf();
        }
        config.validate().context("Configuration validation failed")?;

        let store = open_store(&config);
        debug!(config = ?config_path, work_dir = %config.paths.work_dir.display(), "Loaded configuration");
        Ok(Self {
            config,
            config_path,
            store,
        })
    }

    /// State store selected by `[state]`
    pub fn store(&self) -> Arc<dyn PersistentConfigStore> {
        self.store.clone()
    }

    /// Builtin categories merged with the user document
    pub fn catalog(&self) -> Result<CategoryCatalog> {
        let path = self.config.categories_file();
        let mut catalog = CategoryCatalog::load(&path)
            .with_context(|| format!("Failed to load categories from {}", path.display()))?;
        catalog
            .merge_user(self.config.user_categories_file())
            .context("Failed to load user categories")?;
        Ok(catalog)
    }

    /// Strategy registry over the configured directories
    pub fn registry(&self) -> StrategyRegistry {
        StrategyRegistry::new(self.config.builtin_strategies_dir(), self.config.user_strategies_dir())
    }

    /// Strategy tables for every category in the catalog
    pub fn tables(&self, catalog: &CategoryCatalog) -> Result<StrategyTables> {
        self.registry()
            .load_all(catalog.strategy_types(), self.config.pipeline.strategy_set.as_deref())
            .context("Failed to load strategies")
    }

    /// Persisted selections
    pub fn selections(&self) -> Result<Selections> {
        Selections::load(self.store.as_ref()).context("Failed to read selections")
    }

    /// Persist selections
    pub fn save_selections(&self, selections: &Selections) -> Result<()> {
        selections
            .save(self.store.as_ref())
            .context("Failed to save selections")
    }

    /// Build the command for `selections`
    pub fn build(&self, selections: &Selections, capture_filters: Option<bool>) -> Result<BuiltCommand> {
        let catalog = self.catalog()?;
        let tables = self.tables(&catalog)?;
        let mut builder = CommandLineBuilder::from_config(&self.config);
        if let Some(enabled) = capture_filters {
            builder = builder.with_capture_filters(enabled);
        }
        Ok(builder.build(selections, &catalog, &tables))
    }

    /// Autostart orchestrator over the real backends
    pub fn orchestrator(&self) -> AutostartOrchestrator {
        AutostartOrchestrator::from_config(&self.config, self.store())
    }

    /// Runner for one-off external commands
    pub fn runner(&self) -> CommandRunner {
        CommandRunner::new(Duration::from_secs(self.config.autostart.timeout_secs))
    }
}

fn open_store(config: &AppConfig) -> Arc<dyn PersistentConfigStore> {
    match config.state.backend {
        StateBackend::File => Arc::new(FileStore::new(config.state_file())),
        StateBackend::Registry => Arc::new(RegistryStore::new(config.state.registry_key.clone())),
        StateBackend::Memory => {
            warn!("Memory state backend: selections and autostart flag are not persisted");
            Arc::new(MemoryStore::new())
        }
    }
}
