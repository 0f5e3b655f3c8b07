//! Traffic categories and per-category strategy selections

mod filters;
mod resolver;

pub use filters::{capture_flags, FilterKey, FilterProtocol, NetFilter, FILTERS};
pub use resolver::CategoryFilterResolver;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{keys, PersistentConfigStore};
use crate::strategy::NONE_STRATEGY;

/// Port range used by categories that need every non-standard port
pub const ALL_PORTS_RANGE: &str = "444-65535";

/// Which command group a category belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandGroup {
    /// Shipped category
    #[default]
    Builtin,
    /// User-defined category
    User,
}

/// A traffic class that gets at most one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique key
    pub key: String,
    /// Display name
    #[serde(default)]
    pub full_name: String,
    /// Protocol string, e.g. `TCP`, `UDP`, `TCP/UDP`, `UDP (QUIC)`
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Comma separated ports / ranges
    #[serde(default)]
    pub ports: String,
    /// Prebuilt filter arguments
    #[serde(default)]
    pub base_filter: String,
    /// Strategy document this category selects from
    pub strategy_type: String,
    /// Needs the 444-65535 range
    #[serde(default)]
    pub requires_all_ports: bool,
    /// Drop `--payload=` restrictions from the strategy
    #[serde(default)]
    pub strip_payload: bool,
    /// Presentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Presentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Sort order
    #[serde(default)]
    pub order: i32,
    /// Builtin or user category
    #[serde(default)]
    pub command_group: CommandGroup,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

impl Category {
    /// Whether the protocol string includes TCP
    pub fn has_tcp(&self) -> bool {
        self.protocol.to_uppercase().contains("TCP")
    }

    /// Whether the protocol string includes UDP (QUIC counts as UDP)
    pub fn has_udp(&self) -> bool {
        let protocol = self.protocol.to_uppercase();
        protocol.contains("UDP") || protocol.contains("QUIC")
    }

    /// Filter arguments for this category.
    ///
    /// `base_filter` wins when set; otherwise `--filter-tcp=`/`--filter-udp=`
    /// tokens are derived from the ports, `444-65535` for all-ports
    /// categories.
    pub fn effective_base_filter(&self) -> String {
        if !self.base_filter.trim().is_empty() {
            return self.base_filter.trim().to_string();
        }
        let ports = if self.requires_all_ports {
            ALL_PORTS_RANGE
        } else {
            self.ports.trim()
        };
        if ports.is_empty() {
            return String::new();
        }

        let mut parts = Vec::new();
        if self.has_tcp() {
            parts.push(format!("--filter-tcp={ports}"));
        }
        if self.has_udp() {
            parts.push(format!("--filter-udp={ports}"));
        }
        parts.join(" ")
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidCategory {
            key: self.key.clone(),
            reason: reason.to_string(),
        };
        if self.key.trim().is_empty() {
            return Err(invalid("missing key"));
        }
        if self.strategy_type.trim().is_empty() {
            return Err(invalid("missing strategy_type"));
        }
        if !self.has_tcp() && !self.has_udp() {
            return Err(invalid("protocol must include TCP or UDP"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryDocument {
    List(Vec<serde_json::Value>),
    Wrapped { categories: Vec<serde_json::Value> },
}

/// Ordered set of categories
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    /// Build from categories, dropping invalid and duplicate keys
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut catalog = Self::default();
        catalog.extend(categories);
        catalog
    }

    fn extend(&mut self, categories: impl IntoIterator<Item = Category>) {
        let mut seen: HashSet<String> = self.categories.iter().map(|c| c.key.clone()).collect();
        for category in categories {
            if let Err(e) = category.validate() {
                warn!(error = %e, "Skipping invalid category");
                continue;
            }
            if !seen.insert(category.key.clone()) {
                warn!(key = %category.key, "Skipping duplicate category");
                continue;
            }
            self.categories.push(category);
        }
        // Stable: equal orders keep document order.
        self.categories.sort_by_key(|c| c.order);
    }

    /// Parse a `categories.json` document (array or `{"categories": [...]}`)
    pub fn from_json(content: &str) -> Result<Self> {
        let doc: CategoryDocument = serde_json::from_str(content)?;
        let values = match doc {
            CategoryDocument::List(v) | CategoryDocument::Wrapped { categories: v } => v,
        };
        let categories = values.into_iter().filter_map(|value| {
            match serde_json::from_value::<Category>(value) {
                Ok(category) => Some(category),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed category record");
                    None
                }
            }
        });
        Ok(Self::new(categories))
    }

    /// Load a categories document
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)
            .map_err(|e| Error::document(path.display().to_string(), e.to_string()))?;
        info!(path = %path.display(), count = catalog.len(), "Loaded categories");
        Ok(catalog)
    }

    /// Add user categories from a second document; builtin keys win
    pub fn merge_user<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No user categories");
            return Ok(());
        }
        let user = Self::load(path)?;
        self.extend(user.categories.into_iter().map(|mut c| {
            c.command_group = CommandGroup::User;
            c
        }));
        Ok(())
    }

    /// Look up by key
    pub fn get(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Categories in display order
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Distinct strategy document names in use
    pub fn strategy_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for c in &self.categories {
            if !types.contains(&c.strategy_type.as_str()) {
                types.push(&c.strategy_type);
            }
        }
        types
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Active strategy id per category. Missing keys mean `"none"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selections(BTreeMap<String, String>);

impl Selections {
    /// Empty selections
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected strategy id, `"none"` when unset
    pub fn get(&self, category: &str) -> &str {
        self.0.get(category).map_or(NONE_STRATEGY, String::as_str)
    }

    /// Select a strategy
    pub fn set(&mut self, category: impl Into<String>, strategy_id: impl Into<String>) {
        self.0.insert(category.into(), strategy_id.into());
    }

    /// Whether a category has a strategy other than `"none"`
    pub fn is_active(&self, category: &str) -> bool {
        self.get(category) != NONE_STRATEGY
    }

    /// Active `(category, strategy)` pairs
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, id)| id.as_str() != NONE_STRATEGY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Turn a filter off: every dependent active category is set to `"none"`.
    /// Returns the categories that were disabled.
    pub fn disable_filter(&mut self, filter: FilterKey, resolver: &CategoryFilterResolver) -> Vec<String> {
        let disabled = resolver.categories_to_disable(filter, self);
        for key in &disabled {
            self.set(key.clone(), NONE_STRATEGY);
        }
        if !disabled.is_empty() {
            info!(%filter, categories = ?disabled, "Disabled categories depending on filter");
        }
        disabled
    }

    /// Read from a store
    pub fn load(store: &dyn PersistentConfigStore) -> Result<Self> {
        match store.get(keys::SELECTIONS)? {
            Some(json) => serde_json::from_str(&json).or_else(|e| {
                warn!(error = %e, "Stored selections are malformed, starting empty");
                Ok(Self::default())
            }),
            None => Ok(Self::default()),
        }
    }

    /// Write to a store
    pub fn save(&self, store: &dyn PersistentConfigStore) -> Result<()> {
        store.set(keys::SELECTIONS, &serde_json::to_string(self)?)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Selections {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn category(key: &str, protocol: &str, ports: &str) -> Category {
        Category {
            key: key.into(),
            full_name: key.into(),
            protocol: protocol.into(),
            ports: ports.into(),
            base_filter: String::new(),
            strategy_type: "tcp".into(),
            requires_all_ports: false,
            strip_payload: false,
            icon: None,
            color: None,
            order: 0,
            command_group: CommandGroup::Builtin,
        }
    }

    #[test]
    fn test_derived_base_filter() {
        assert_eq!(category("a", "TCP", "80,443").effective_base_filter(), "--filter-tcp=80,443");
        assert_eq!(
            category("a", "TCP/UDP", "443").effective_base_filter(),
            "--filter-tcp=443 --filter-udp=443"
        );
        let mut all = category("a", "UDP (QUIC)", "443");
        all.requires_all_ports = true;
        assert_eq!(all.effective_base_filter(), "--filter-udp=444-65535");
    }

    #[test]
    fn test_explicit_base_filter_wins() {
        let mut c = category("a", "TCP", "443");
        c.base_filter = " --filter-tcp=443 --hostlist=list-youtube.txt ".into();
        assert_eq!(c.effective_base_filter(), "--filter-tcp=443 --hostlist=list-youtube.txt");
    }

    #[test]
    fn test_catalog_parsing_and_order() {
        let json = r#"{"categories": [
            {"key": "b", "protocol": "TCP", "ports": "443", "strategy_type": "tcp", "order": 2},
            {"key": "a", "protocol": "UDP", "ports": "443", "strategy_type": "udp", "order": 1},
            {"key": "a", "protocol": "UDP", "ports": "443", "strategy_type": "udp"},
            {"key": "bad", "protocol": "ICMP", "strategy_type": "tcp"},
            {"key": "broken"}
        ]}"#;
        let catalog = CategoryCatalog::from_json(json).unwrap();
        let keys: Vec<_> = catalog.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(catalog.strategy_types(), vec!["udp", "tcp"]);
    }

    #[test]
    fn test_selections_default_none() {
        let mut s = Selections::new();
        assert_eq!(s.get("youtube"), "none");
        assert!(!s.is_active("youtube"));
        s.set("youtube", "other_seqovl");
        s.set("discord", "none");
        assert!(s.is_active("youtube"));
        assert_eq!(s.active().collect::<Vec<_>>(), vec![("youtube", "other_seqovl")]);
    }

    #[test]
    fn test_selections_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(Selections::load(&store).unwrap(), Selections::new());
        let s: Selections = [("youtube", "other_seqovl")].into_iter().collect();
        s.save(&store).unwrap();
        assert_eq!(Selections::load(&store).unwrap(), s);
    }
}
