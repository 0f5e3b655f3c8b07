//! Strategy document loading, merging and user edits

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{Label, Strategy, StrategyArgs, StrategyRecord, StrategySource, StrategyTable, StrategyTables};
use crate::error::{Error, Result};

/// Strategy set that enables lua-desync auto-numbering
pub const ORCHESTRA_SET: &str = "orchestra";

const DOCUMENT_VERSION: &str = "1.0";

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct StrategyDocument {
    #[serde(default)]
    category: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    strategies: Vec<Value>,
}

fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn optional_string(obj: &Map<String, Value>, key: &str, id: &str) -> Result<String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(Error::invalid_strategy(id, format!("'{key}' must be a string"))),
    }
}

/// Validate a raw strategy entry and convert it into a record
pub fn validate_record(value: &Value) -> Result<StrategyRecord> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::invalid_strategy("", "entry is not an object"))?;

    let id = match obj.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => return Err(Error::invalid_strategy("", "missing id")),
    };
    if !valid_id(&id) {
        return Err(Error::invalid_strategy(
            &id,
            "id may only contain letters, digits and underscores",
        ));
    }

    let name = match obj.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => return Err(Error::invalid_strategy(&id, "missing name")),
    };

    let args = match obj.get("args") {
        None => return Err(Error::invalid_strategy(&id, "missing args")),
        Some(Value::String(s)) => StrategyArgs::Line(s.clone()),
        Some(Value::Array(items)) => {
            let lines = items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| Error::invalid_strategy(&id, "args list must contain only strings"))?;
            StrategyArgs::Lines(lines)
        }
        Some(_) => {
            return Err(Error::invalid_strategy(&id, "args must be a string or a list of strings"))
        }
    };

    let label = match obj.get("label") {
        None | Some(Value::Null) => Label::None,
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| Error::invalid_strategy(&id, format!("unknown label '{s}'")))?,
        Some(_) => return Err(Error::invalid_strategy(&id, "label must be a string")),
    };

    let blobs = match obj.get("blobs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::invalid_strategy(&id, "blobs must contain only strings"))?,
        Some(_) => return Err(Error::invalid_strategy(&id, "blobs must be a list")),
    };

    let enabled = match obj.get("enabled") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(Error::invalid_strategy(&id, "enabled must be a boolean")),
    };

    Ok(StrategyRecord {
        description: optional_string(obj, "description", &id)?,
        author: optional_string(obj, "author", &id)?,
        version: optional_string(obj, "version", &id)?,
        id,
        name,
        label,
        blobs,
        args,
        enabled,
    })
}

/// Loads strategy documents and edits the user copy
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    builtin_dir: PathBuf,
    user_dir: PathBuf,
}

impl StrategyRegistry {
    /// Create a registry over a builtin and a user directory
    pub fn new(builtin_dir: impl Into<PathBuf>, user_dir: impl Into<PathBuf>) -> Self {
        Self {
            builtin_dir: builtin_dir.into(),
            user_dir: user_dir.into(),
        }
    }

    /// Builtin document for a category and optional set.
    ///
    /// `<category>_<set>.json` is used when present, `<category>.json`
    /// otherwise.
    pub fn builtin_path(&self, category: &str, strategy_set: Option<&str>) -> PathBuf {
        if let Some(set) = strategy_set.filter(|s| !s.is_empty()) {
            let suffixed = self.builtin_dir.join(format!("{category}_{set}.json"));
            if suffixed.exists() {
                return suffixed;
            }
            debug!(path = %suffixed.display(), "Strategy set document missing, using base document");
        }
        self.builtin_dir.join(format!("{category}.json"))
    }

    /// User document for a category
    pub fn user_path(&self, category: &str) -> PathBuf {
        self.user_dir.join(format!("{category}.json"))
    }

    /// Category names that have a builtin document, sorted
    pub fn builtin_categories(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(&self.builtin_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.ends_with(&format!("_{ORCHESTRA_SET}")) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_document(path: &Path) -> Result<Option<StrategyDocument>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed strategy document");
                Ok(None)
            }
        }
    }

    fn merge_document(
        table: &mut StrategyTable,
        path: &Path,
        source: StrategySource,
        number_lines: bool,
    ) -> Result<()> {
        let Some(doc) = Self::read_document(path)? else {
            return Ok(());
        };
        let mut loaded = 0usize;
        for value in &doc.strategies {
            match validate_record(value) {
                Ok(record) => {
                    table.upsert(Strategy::from_record(record, source, number_lines));
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping invalid strategy"),
            }
        }
        debug!(path = %path.display(), loaded, "Merged strategy document");
        Ok(())
    }

    /// Load the merged table for a category.
    ///
    /// User entries override builtin entries with the same id.
    pub fn load(&self, category: &str, strategy_set: Option<&str>) -> Result<StrategyTable> {
        let number_lines = strategy_set == Some(ORCHESTRA_SET);
        let mut table = StrategyTable::new(category);

        let builtin = self.builtin_path(category, strategy_set);
        Self::merge_document(&mut table, &builtin, StrategySource::Builtin, number_lines)?;
        Self::merge_document(&mut table, &self.user_path(category), StrategySource::User, number_lines)?;

        info!(category, set = ?strategy_set, count = table.len(), "Loaded strategies");
        Ok(table)
    }

    /// Load tables for several categories
    pub fn load_all<'a>(
        &self,
        categories: impl IntoIterator<Item = &'a str>,
        strategy_set: Option<&str>,
    ) -> Result<StrategyTables> {
        let mut tables = StrategyTables::new();
        for category in categories {
            if !tables.contains_key(category) {
                tables.insert(category.to_string(), self.load(category, strategy_set)?);
            }
        }
        Ok(tables)
    }

    fn read_user_document(&self, category: &str) -> Result<StrategyDocument> {
        let path = self.user_path(category);
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| Error::document(path.display().to_string(), e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StrategyDocument {
                category: category.to_string(),
                version: DOCUMENT_VERSION.to_string(),
                strategies: Vec::new(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn write_user_document(&self, category: &str, doc: &StrategyDocument) -> Result<()> {
        fs::create_dir_all(&self.user_dir)?;
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(self.user_path(category), json)?;
        Ok(())
    }

    /// Insert or replace a strategy in the user document
    pub fn save(&self, category: &str, record: &StrategyRecord) -> Result<()> {
        let value = serde_json::to_value(record)?;
        validate_record(&value)?;

        let mut doc = self.read_user_document(category)?;
        let existing = doc
            .strategies
            .iter()
            .position(|s| s.get("id").and_then(Value::as_str) == Some(record.id.as_str()));
        match existing {
            Some(pos) => doc.strategies[pos] = value,
            None => doc.strategies.push(value),
        }

        self.write_user_document(category, &doc)?;
        info!(category, id = %record.id, "Saved user strategy");
        Ok(())
    }

    /// Remove a strategy from the user document
    pub fn delete(&self, category: &str, id: &str) -> Result<()> {
        let mut doc = self.read_user_document(category)?;
        let before = doc.strategies.len();
        doc.strategies
            .retain(|s| s.get("id").and_then(Value::as_str) != Some(id));
        if doc.strategies.len() == before {
            return Err(Error::StrategyNotFound {
                category: category.to_string(),
                id: id.to_string(),
            });
        }

        self.write_user_document(category, &doc)?;
        info!(category, id, "Deleted user strategy");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_accepts_minimal() {
        let record = validate_record(&json!({"id": "a_1", "name": "A", "args": ""})).unwrap();
        assert_eq!(record.label, Label::None);
        assert!(record.blobs.is_empty());
        assert!(record.enabled);
    }

    #[test]
    fn test_validate_rejections() {
        let cases = [
            (json!({"name": "A", "args": ""}), "missing id"),
            (json!({"id": "", "name": "A", "args": ""}), "missing id"),
            (json!({"id": "a-b", "name": "A", "args": ""}), "letters"),
            (json!({"id": "a", "args": ""}), "missing name"),
            (json!({"id": "a", "name": "A"}), "missing args"),
            (json!({"id": "a", "name": "A", "args": "", "label": "shiny"}), "unknown label"),
            (json!({"id": "a", "name": "A", "args": "", "blobs": "x.bin"}), "blobs must be a list"),
            (json!("not an object"), "not an object"),
        ];
        for (value, expected) in cases {
            let err = validate_record(&value).unwrap_err();
            assert!(err.to_string().contains(expected), "{err} should mention {expected}");
        }
    }

    #[test]
    fn test_builtin_categories_skip_set_variants() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["tcp.json", "tcp_orchestra.json", "discord_voice.json", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let registry = StrategyRegistry::new(dir.path(), dir.path().join("user"));
        assert_eq!(registry.builtin_categories().unwrap(), vec!["discord_voice", "tcp"]);
    }
}
