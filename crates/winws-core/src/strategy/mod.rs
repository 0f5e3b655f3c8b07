//! Strategy definitions
//!
//! A strategy is a named, reusable fragment of winws arguments implementing
//! one DPI-bypass technique. Strategies are grouped per category document
//! (`tcp`, `udp`, `http80`, `discord_voice`, ...) and come from a builtin
//! and a user-editable source.

mod loader;
pub mod orchestra;

pub use loader::{validate_record, StrategyRegistry, ORCHESTRA_SET};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::tokens::split_args;

/// Selection value meaning "category disabled"
pub const NONE_STRATEGY: &str = "none";

/// UI badge attached to a strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// No badge
    #[default]
    None,
    /// Recommended default
    Recommended,
    /// Tuned for games
    Game,
    /// May break some sites
    Caution,
    /// Experimental
    Experimental,
    /// Known stable
    Stable,
}

impl Label {
    /// Label name as stored in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::None => "none",
            Label::Recommended => "recommended",
            Label::Game => "game",
            Label::Caution => "caution",
            Label::Experimental => "experimental",
            Label::Stable => "stable",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(Label::None),
            "recommended" => Ok(Label::Recommended),
            "game" => Ok(Label::Game),
            "caution" => Ok(Label::Caution),
            "experimental" => Ok(Label::Experimental),
            "stable" => Ok(Label::Stable),
            _ => Err(Error::config_value("label", format!("Unknown label: {s}"))),
        }
    }
}

/// Where a strategy was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategySource {
    /// Shipped document, read-only
    Builtin,
    /// User document
    User,
}

/// Raw `args` value: one string or a list of per-line fragments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyArgs {
    /// Single argument string (may contain newlines)
    Line(String),
    /// Ordered per-line fragments
    Lines(Vec<String>),
}

impl StrategyArgs {
    /// Source lines in order
    pub fn lines(&self) -> Vec<String> {
        match self {
            StrategyArgs::Line(s) => s.lines().map(str::to_string).collect(),
            StrategyArgs::Lines(lines) => lines.clone(),
        }
    }
}

/// Strategy entry as stored in a JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecord {
    /// Unique id, `[A-Za-z0-9_]+`
    pub id: String,
    /// Display name
    pub name: String,
    /// Longer description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Author
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    /// Strategy version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// UI badge
    #[serde(default)]
    pub label: Label,
    /// Blob files the arguments need
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blobs: Vec<String>,
    /// Argument fragment(s)
    pub args: StrategyArgs,
    /// Whether the strategy may be selected
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A loaded, normalized strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    /// Unique id within its category
    pub id: String,
    /// Display name
    pub name: String,
    /// Longer description
    pub description: String,
    /// Author
    pub author: String,
    /// Strategy version
    pub version: String,
    /// UI badge
    pub label: Label,
    /// Blob files the arguments need
    pub blobs: Vec<String>,
    /// Arguments joined into one string
    pub args: String,
    /// Whether the strategy may be selected
    pub enabled: bool,
    /// Created by the user
    pub user_created: bool,
    /// Source document
    pub source: StrategySource,
}

impl Strategy {
    /// Normalize a validated record. `number_lines` runs the orchestra
    /// auto-numbering on the source lines before they are joined.
    pub fn from_record(record: StrategyRecord, source: StrategySource, number_lines: bool) -> Self {
        let mut lines = record.args.lines();
        if number_lines {
            lines = orchestra::auto_number(&lines);
        }
        let args = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            author: record.author,
            version: record.version,
            label: record.label,
            blobs: record.blobs,
            args,
            enabled: record.enabled,
            user_created: source == StrategySource::User,
            source,
        }
    }

    /// Argument tokens
    pub fn tokens(&self) -> Vec<String> {
        split_args(&self.args)
    }

    /// Declared blobs that are not present in `bin_dir`
    pub fn missing_blobs(&self, bin_dir: &Path) -> Vec<String> {
        self.blobs
            .iter()
            .filter(|b| !bin_dir.join(b).exists())
            .cloned()
            .collect()
    }

    /// Convert back into a document record
    pub fn to_record(&self) -> StrategyRecord {
        StrategyRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            version: self.version.clone(),
            label: self.label,
            blobs: self.blobs.clone(),
            args: StrategyArgs::Line(self.args.clone()),
            enabled: self.enabled,
        }
    }
}

/// Strategies of one category, in document order
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    category: String,
    entries: Vec<Strategy>,
}

impl StrategyTable {
    /// Create an empty table
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            entries: Vec::new(),
        }
    }

    /// Category document name
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Insert, replacing an entry with the same id in place
    pub fn upsert(&mut self, strategy: Strategy) {
        match self.entries.iter_mut().find(|s| s.id == strategy.id) {
            Some(existing) => *existing = strategy,
            None => self.entries.push(strategy),
        }
    }

    /// Look up by id
    pub fn get(&self, id: &str) -> Option<&Strategy> {
        self.entries.iter().find(|s| s.id == id)
    }

    /// Whether an id is present
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Iterate entries in order
    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.entries.iter()
    }

    /// Ids in order
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|s| s.id.as_str()).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loaded tables keyed by category document name (a category's `strategy_type`)
pub type StrategyTables = HashMap<String, StrategyTable>;
