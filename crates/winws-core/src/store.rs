//! Persisted application state
//!
//! A small key/value store holds the selections and the autostart flag.
//! Backends: registry (in `winws-platform`), JSON file and memory.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AutostartMethod;
use crate::error::Result;

/// Well-known keys
pub mod keys {
    /// JSON object `category -> strategy id`
    pub const SELECTIONS: &str = "selections";
    /// `"true"` / `"false"`
    pub const AUTOSTART_ENABLED: &str = "autostart_enabled";
    /// Method name, see `AutostartMethod`
    pub const AUTOSTART_METHOD: &str = "autostart_method";
}

/// String key/value store
pub trait PersistentConfigStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; missing keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk.
///
/// Every write rewrites the whole file; last writer wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Store at `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(values) => Ok(values),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Corrupt state file, starting empty");
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl PersistentConfigStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.read();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.write();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)?;
        debug!(key, path = %self.path.display(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.write();
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

/// Persisted autostart flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutostartStatus {
    /// Whether autostart is believed to be configured
    pub enabled: bool,
    /// Mechanism that was configured
    pub method: Option<AutostartMethod>,
}

impl AutostartStatus {
    /// Enabled with a method
    pub fn enabled(method: AutostartMethod) -> Self {
        Self {
            enabled: true,
            method: Some(method),
        }
    }

    /// Read the flag. Unknown method names are dropped with a warning.
    pub fn load(store: &dyn PersistentConfigStore) -> Result<Self> {
        let enabled = store
            .get(keys::AUTOSTART_ENABLED)?
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        let method = match store.get(keys::AUTOSTART_METHOD)? {
            Some(name) => match name.parse() {
                Ok(method) => Some(method),
                Err(e) => {
                    warn!(error = %e, "Ignoring stored autostart method");
                    None
                }
            },
            None => None,
        };
        Ok(Self { enabled, method })
    }

    /// Write the flag
    pub fn save(&self, store: &dyn PersistentConfigStore) -> Result<()> {
        store.set(keys::AUTOSTART_ENABLED, if self.enabled { "true" } else { "false" })?;
        match self.method {
            Some(method) => store.set(keys::AUTOSTART_METHOD, method.as_str()),
            None => store.remove(keys::AUTOSTART_METHOD),
        }
    }

    /// Reset to disabled
    pub fn clear(store: &dyn PersistentConfigStore) -> Result<()> {
        Self::default().save(store)
    }

    /// Overwrite the stored flag with what was observed on the system.
    /// Returns `true` when the stored value changed.
    pub fn reconcile(store: &dyn PersistentConfigStore, observed: Option<AutostartMethod>) -> Result<bool> {
        let stored = Self::load(store)?;
        let actual = match observed {
            Some(method) => Self::enabled(method),
            None => Self::default(),
        };
        if stored == actual {
            return Ok(false);
        }
        info!(
            stored_enabled = stored.enabled,
            stored_method = ?stored.method,
            observed = ?observed,
            "Autostart flag out of sync, overwriting"
        );
        actual.save(store)?;
        Ok(true)
    }
}
