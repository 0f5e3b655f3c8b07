//! Network-level capture filters
//!
//! Categories are user-facing; filters are what winws actually intercepts
//! (`--wf-tcp`, `--wf-udp`, `--wf-raw-part`). Several categories usually
//! share one filter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// Filter identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterKey {
    /// TCP port 80
    #[serde(rename = "tcp_80")]
    Tcp80,
    /// TCP port 443
    #[serde(rename = "tcp_443")]
    Tcp443,
    /// TCP port 6568 (AnyDesk)
    #[serde(rename = "tcp_6568")]
    Tcp6568,
    /// TCP 444-65535
    #[serde(rename = "tcp_all_ports")]
    TcpAllPorts,
    /// TCP 443 and 853 for WARP
    #[serde(rename = "tcp_warp")]
    TcpWarp,
    /// UDP port 443 (QUIC)
    #[serde(rename = "udp_443")]
    Udp443,
    /// UDP 444-65535
    #[serde(rename = "udp_all_ports")]
    UdpAllPorts,
    /// Discord voice signature
    #[serde(rename = "raw_discord")]
    RawDiscord,
    /// STUN signature
    #[serde(rename = "raw_stun")]
    RawStun,
    /// WireGuard handshake signature
    #[serde(rename = "raw_wireguard")]
    RawWireguard,
}

impl FilterKey {
    /// Every key, in catalog order
    pub const ALL: [FilterKey; 10] = [
        FilterKey::Tcp80,
        FilterKey::Tcp443,
        FilterKey::Tcp6568,
        FilterKey::TcpAllPorts,
        FilterKey::TcpWarp,
        FilterKey::Udp443,
        FilterKey::UdpAllPorts,
        FilterKey::RawDiscord,
        FilterKey::RawStun,
        FilterKey::RawWireguard,
    ];

    /// Key as written in config and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Tcp80 => "tcp_80",
            FilterKey::Tcp443 => "tcp_443",
            FilterKey::Tcp6568 => "tcp_6568",
            FilterKey::TcpAllPorts => "tcp_all_ports",
            FilterKey::TcpWarp => "tcp_warp",
            FilterKey::Udp443 => "udp_443",
            FilterKey::UdpAllPorts => "udp_all_ports",
            FilterKey::RawDiscord => "raw_discord",
            FilterKey::RawStun => "raw_stun",
            FilterKey::RawWireguard => "raw_wireguard",
        }
    }

    /// Catalog entry for this key
    pub fn filter(&self) -> &'static NetFilter {
        FILTERS
            .iter()
            .find(|f| f.key == *self)
            .unwrap_or(&FILTERS[0])
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FilterKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::config_value("filter", format!("Unknown filter: {s}")))
    }
}

/// Capture layer of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterProtocol {
    /// `--wf-tcp`
    Tcp,
    /// `--wf-udp`
    Udp,
    /// `--wf-raw-part`
    Raw,
}

/// Catalog entry
#[derive(Debug)]
pub struct NetFilter {
    /// Identity
    pub key: FilterKey,
    /// Capture layer
    pub protocol: FilterProtocol,
    /// Ports (TCP/UDP) or the raw filter part file (RAW)
    pub ports: &'static [&'static str],
    /// Display name
    pub name: &'static str,
    /// Shown before enabling
    pub warning: Option<&'static str>,
}

/// Static filter catalog, in key order
pub static FILTERS: &[NetFilter] = &[
    NetFilter {
        key: FilterKey::Tcp80,
        protocol: FilterProtocol::Tcp,
        ports: &["80"],
        name: "HTTP (TCP 80)",
        warning: None,
    },
    NetFilter {
        key: FilterKey::Tcp443,
        protocol: FilterProtocol::Tcp,
        ports: &["443"],
        name: "HTTPS (TCP 443)",
        warning: None,
    },
    NetFilter {
        key: FilterKey::Tcp6568,
        protocol: FilterProtocol::Tcp,
        ports: &["6568"],
        name: "AnyDesk (TCP 6568)",
        warning: None,
    },
    NetFilter {
        key: FilterKey::TcpAllPorts,
        protocol: FilterProtocol::Tcp,
        ports: &["444-65535"],
        name: "All TCP ports",
        warning: Some("Intercepting every TCP port raises CPU load and may slow down games"),
    },
    NetFilter {
        key: FilterKey::TcpWarp,
        protocol: FilterProtocol::Tcp,
        ports: &["443", "853"],
        name: "Cloudflare WARP (TCP 443, 853)",
        warning: None,
    },
    NetFilter {
        key: FilterKey::Udp443,
        protocol: FilterProtocol::Udp,
        ports: &["443"],
        name: "QUIC (UDP 443)",
        warning: None,
    },
    NetFilter {
        key: FilterKey::UdpAllPorts,
        protocol: FilterProtocol::Udp,
        ports: &["444-65535"],
        name: "All UDP ports",
        warning: Some("Intercepting every UDP port can break voice chat and online games"),
    },
    NetFilter {
        key: FilterKey::RawDiscord,
        protocol: FilterProtocol::Raw,
        ports: &["windivert_part.discord_media.txt"],
        name: "Discord voice",
        warning: None,
    },
    NetFilter {
        key: FilterKey::RawStun,
        protocol: FilterProtocol::Raw,
        ports: &["windivert_part.stun.txt"],
        name: "STUN",
        warning: None,
    },
    NetFilter {
        key: FilterKey::RawWireguard,
        protocol: FilterProtocol::Raw,
        ports: &["windivert_part.wireguard.txt"],
        name: "WireGuard",
        warning: None,
    },
];

/// Render global capture flags for a filter set.
///
/// TCP and UDP ports are merged into one `--wf-tcp=`/`--wf-udp=` token each
/// (deduplicated, catalog order); every raw filter becomes its own
/// `--wf-raw-part=@file` token.
pub fn capture_flags(keys: &BTreeSet<FilterKey>) -> Vec<String> {
    let mut tcp: Vec<&str> = Vec::new();
    let mut udp: Vec<&str> = Vec::new();
    let mut raw: Vec<String> = Vec::new();

    for filter in FILTERS.iter().filter(|f| keys.contains(&f.key)) {
        let target = match filter.protocol {
            FilterProtocol::Tcp => &mut tcp,
            FilterProtocol::Udp => &mut udp,
            FilterProtocol::Raw => {
                raw.extend(filter.ports.iter().map(|f| format!("--wf-raw-part=@{f}")));
                continue;
            }
        };
        for port in filter.ports {
            if !target.contains(port) {
                target.push(*port);
            }
        }
    }

    let mut flags = Vec::new();
    if !tcp.is_empty() {
        flags.push(format!("--wf-tcp={}", tcp.join(",")));
    }
    if !udp.is_empty() {
        flags.push(format!("--wf-udp={}", udp.join(",")));
    }
    flags.extend(raw);
    flags
}
