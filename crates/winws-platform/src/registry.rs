//! Registry-backed state under one key, e.g. `HKCU\Software\winws-manager`

use winws_core::store::PersistentConfigStore;

use crate::error::{PlatformError, Result};

/// Root hive of a registry key path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    /// `HKEY_CURRENT_USER`
    CurrentUser,
    /// `HKEY_LOCAL_MACHINE`
    LocalMachine,
}

/// Split `HKCU\Software\x` into its hive and subkey path.
///
/// A path without a hive prefix lives under `HKEY_CURRENT_USER`.
pub fn split_key(key: &str) -> Result<(Hive, &str)> {
    let key = key.trim().trim_matches('\\');
    let (root, rest) = key.split_once('\\').unwrap_or((key, ""));
    let hive = match root.to_ascii_uppercase().as_str() {
        "HKCU" | "HKEY_CURRENT_USER" => Hive::CurrentUser,
        "HKLM" | "HKEY_LOCAL_MACHINE" => Hive::LocalMachine,
        _ => return Ok((Hive::CurrentUser, key)),
    };
    let rest = rest.trim_matches('\\');
    if rest.is_empty() {
        return Err(PlatformError::InvalidInput(format!(
            "Registry key '{key}' names a hive, not a key"
        )));
    }
    Ok((hive, rest))
}

/// String values under one registry key
#[derive(Debug, Clone)]
pub struct RegistryStore {
    key: String,
}

impl RegistryStore {
    /// Store under `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Registry key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PersistentConfigStore for RegistryStore {
    fn get(&self, key: &str) -> winws_core::Result<Option<String>> {
        Ok(imp::get(&self.key, key)?)
    }

    fn set(&self, key: &str, value: &str) -> winws_core::Result<()> {
        Ok(imp::set(&self.key, key, value)?)
    }

    fn remove(&self, key: &str) -> winws_core::Result<()> {
        Ok(imp::remove(&self.key, key)?)
    }
}

#[cfg(windows)]
mod imp {
    use std::io;
    use tracing::debug;
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_SET_VALUE};
    use winreg::RegKey;

    use super::{split_key, Hive};
    use crate::error::Result;

    fn root(hive: Hive) -> RegKey {
        match hive {
            Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        }
    }

    pub fn get(key: &str, name: &str) -> Result<Option<String>> {
        let (hive, path) = split_key(key)?;
        let subkey = match root(hive).open_subkey_with_flags(path, KEY_READ) {
            Ok(subkey) => subkey,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(registry_key = key, "Registry key not present");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match subkey.get_value::<String, _>(name) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, name: &str, value: &str) -> Result<()> {
        let (hive, path) = split_key(key)?;
        let (subkey, _) = root(hive).create_subkey(path)?;
        subkey.set_value(name, &value)?;
        debug!(registry_key = key, value = name, "Registry value written");
        Ok(())
    }

    pub fn remove(key: &str, name: &str) -> Result<()> {
        let (hive, path) = split_key(key)?;
        let subkey = match root(hive).open_subkey_with_flags(path, KEY_SET_VALUE) {
            Ok(subkey) => subkey,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        match subkey.delete_value(name) {
            Ok(()) => {
                debug!(registry_key = key, value = name, "Registry value removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use crate::error::{PlatformError, Result};

    fn unsupported() -> PlatformError {
        PlatformError::Unsupported("Windows registry".into())
    }

    pub fn get(_key: &str, _name: &str) -> Result<Option<String>> {
        Err(unsupported())
    }

    pub fn set(_key: &str, _name: &str, _value: &str) -> Result<()> {
        Err(unsupported())
    }

    pub fn remove(_key: &str, _name: &str) -> Result<()> {
        Err(unsupported())
    }
}
