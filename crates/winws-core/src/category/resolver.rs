//! Category → capture filter mapping

use std::collections::{BTreeMap, BTreeSet};

use super::{Category, CategoryCatalog, FilterKey, Selections};

/// Maps categories to the filters they need, and back
#[derive(Debug, Clone, Default)]
pub struct CategoryFilterResolver {
    // filter -> dependent category keys, catalog order
    dependents: BTreeMap<FilterKey, Vec<String>>,
}

impl CategoryFilterResolver {
    /// Build the inverse index for a catalog
    pub fn new(catalog: &CategoryCatalog) -> Self {
        let mut dependents: BTreeMap<FilterKey, Vec<String>> = BTreeMap::new();
        for category in catalog.iter() {
            for key in Self::required_filters(category) {
                dependents.entry(key).or_default().push(category.key.clone());
            }
        }
        Self { dependents }
    }

    /// Filters a category needs.
    ///
    /// Voice categories use byte-signature filters only, WARP uses its
    /// bundled port pair; everything else is derived per protocol from the
    /// port string. Ports are matched as substrings of that string, so
    /// `8080` counts as 80 and a range only counts by its literal bounds.
    pub fn required_filters(category: &Category) -> BTreeSet<FilterKey> {
        let mut keys = BTreeSet::new();

        if category.strategy_type == "discord_voice" {
            keys.extend([FilterKey::RawDiscord, FilterKey::RawStun, FilterKey::RawWireguard]);
            return keys;
        }

        let is_warp = category.key.to_lowercase().contains("warp")
            || category.strategy_type.to_lowercase().contains("warp");
        if is_warp && category.has_tcp() {
            keys.insert(FilterKey::TcpWarp);
            return keys;
        }

        let has = |port: &str| category.ports.contains(port);
        let all_ports = category.requires_all_ports || has("65535") || has("*");

        if category.has_tcp() {
            if has("80") {
                keys.insert(FilterKey::Tcp80);
            }
            if has("443") {
                keys.insert(FilterKey::Tcp443);
            }
            if has("6568") || category.key == "anydesk_tcp" {
                keys.insert(FilterKey::Tcp6568);
            }
            if all_ports {
                keys.insert(FilterKey::TcpAllPorts);
            }
        }
        if category.has_udp() {
            if has("443") {
                keys.insert(FilterKey::Udp443);
            }
            if all_ports {
                keys.insert(FilterKey::UdpAllPorts);
            }
        }
        keys
    }

    /// Filters needed by every active category
    pub fn active_filters(catalog: &CategoryCatalog, selections: &Selections) -> BTreeSet<FilterKey> {
        catalog
            .iter()
            .filter(|c| selections.is_active(&c.key))
            .flat_map(Self::required_filters)
            .collect()
    }

    /// Categories that require a filter
    pub fn categories_requiring(&self, filter: FilterKey) -> Vec<String> {
        self.dependents.get(&filter).cloned().unwrap_or_default()
    }

    /// Active categories that must be disabled when `filter` is turned off
    pub fn categories_to_disable(&self, filter: FilterKey, selections: &Selections) -> Vec<String> {
        self.dependents
            .get(&filter)
            .map(|keys| {
                keys.iter()
                    .filter(|k| selections.is_active(k))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::super::CommandGroup;
    use super::*;

    fn category(key: &str, protocol: &str, ports: &str, strategy_type: &str) -> Category {
        Category {
            key: key.into(),
            full_name: String::new(),
            protocol: protocol.into(),
            ports: ports.into(),
            base_filter: String::new(),
            strategy_type: strategy_type.into(),
            requires_all_ports: false,
            strip_payload: false,
            icon: None,
            color: None,
            order: 0,
            command_group: CommandGroup::Builtin,
        }
    }

    fn set(keys: &[FilterKey]) -> BTreeSet<FilterKey> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_discord_voice_short_circuits() {
        let c = category("discord_voice", "UDP", "443,50000-65535", "discord_voice");
        assert_eq!(
            CategoryFilterResolver::required_filters(&c),
            set(&[FilterKey::RawDiscord, FilterKey::RawStun, FilterKey::RawWireguard])
        );
    }

    #[test]
    fn test_warp_short_circuits() {
        let c = category("warp_tcp", "TCP", "443,853", "tcp");
        assert_eq!(CategoryFilterResolver::required_filters(&c), set(&[FilterKey::TcpWarp]));

        // WARP over UDP falls back to port derivation
        let c = category("warp_udp", "UDP", "443", "udp");
        assert_eq!(CategoryFilterResolver::required_filters(&c), set(&[FilterKey::Udp443]));
    }

    #[test]
    fn test_port_derivation() {
        let c = category("youtube", "TCP", "80,443", "tcp");
        assert_eq!(
            CategoryFilterResolver::required_filters(&c),
            set(&[FilterKey::Tcp80, FilterKey::Tcp443])
        );

        let c = category("anydesk_tcp", "TCP", "", "tcp");
        assert_eq!(CategoryFilterResolver::required_filters(&c), set(&[FilterKey::Tcp6568]));

        let c = category("games", "TCP/UDP", "444-65535", "tcp");
        assert_eq!(
            CategoryFilterResolver::required_filters(&c),
            set(&[FilterKey::TcpAllPorts, FilterKey::UdpAllPorts])
        );

        let mut c = category("quic", "UDP (QUIC)", "443", "udp");
        c.requires_all_ports = true;
        assert_eq!(
            CategoryFilterResolver::required_filters(&c),
            set(&[FilterKey::Udp443, FilterKey::UdpAllPorts])
        );

        let c = category("any", "TCP", "*", "tcp");
        assert_eq!(CategoryFilterResolver::required_filters(&c), set(&[FilterKey::TcpAllPorts]));
    }

    #[test]
    fn test_ports_matched_as_text() {
        let c = category("everything", "TCP", "1-65535", "tcp");
        assert_eq!(CategoryFilterResolver::required_filters(&c), set(&[FilterKey::TcpAllPorts]));

        let c = category("alt_http", "TCP", "8080", "tcp");
        assert_eq!(CategoryFilterResolver::required_filters(&c), set(&[FilterKey::Tcp80]));

        // Turning off tcp_6568 leaves an all-ports category alone
        let catalog = CategoryCatalog::new([
            category("everything", "TCP", "1-65535", "tcp"),
            category("anydesk_tcp", "TCP", "6568", "tcp"),
        ]);
        let resolver = CategoryFilterResolver::new(&catalog);
        assert_eq!(resolver.categories_requiring(FilterKey::Tcp6568), vec!["anydesk_tcp"]);
    }

    #[test]
    fn test_cascade() {
        let catalog = CategoryCatalog::new([
            category("youtube", "TCP", "443", "tcp"),
            category("discord", "TCP", "443", "tcp"),
            category("http", "TCP", "80", "http80"),
        ]);
        let resolver = CategoryFilterResolver::new(&catalog);
        assert_eq!(resolver.categories_requiring(FilterKey::Tcp443), vec!["youtube", "discord"]);
        assert!(resolver.categories_requiring(FilterKey::RawStun).is_empty());

        let mut selections: Selections =
            [("youtube", "other_seqovl"), ("discord", "none"), ("http", "fake")].into_iter().collect();
        assert_eq!(resolver.categories_to_disable(FilterKey::Tcp443, &selections), vec!["youtube"]);

        let disabled = selections.disable_filter(FilterKey::Tcp443, &resolver);
        assert_eq!(disabled, vec!["youtube"]);
        assert!(!selections.is_active("youtube"));
        assert!(selections.is_active("http"));

        assert_eq!(
            CategoryFilterResolver::active_filters(&catalog, &selections),
            set(&[FilterKey::Tcp80])
        );
    }
}
