//! Port list parsing
//!
//! Port lists appear in `--filter-tcp=`/`--filter-udp=` values and in
//! category definitions: comma separated single ports or `start-end` ranges.

use std::fmt;
use tracing::debug;

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    /// First port
    pub start: u16,
    /// Last port (inclusive)
    pub end: u16,
}

impl PortRange {
    /// Whether the range covers `port`
    pub fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parsed port list. Unparseable entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortList {
    ranges: Vec<PortRange>,
    wildcard: bool,
}

impl PortList {
    /// Parse a comma separated list such as `80,443,1024-65535`
    pub fn parse(ports: &str) -> Self {
        let mut list = Self::default();
        for part in ports.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part == "*" {
                list.wildcard = true;
                continue;
            }
            let range = match part.split_once('-') {
                Some((start, end)) => match (start.trim().parse(), end.trim().parse()) {
                    (Ok(start), Ok(end)) if start <= end => Some(PortRange { start, end }),
                    _ => None,
                },
                None => part.parse().ok().map(|p| PortRange { start: p, end: p }),
            };
            match range {
                Some(range) => list.ranges.push(range),
                None => debug!(part, "Skipping invalid port entry"),
            }
        }
        list
    }

    /// Whether an explicit port or range covers `port`. A `*` entry is not
    /// a port and covers nothing here; see [`PortList::is_wildcard`].
    pub fn contains(&self, port: u16) -> bool {
        self.ranges.iter().any(|r| r.contains(port))
    }

    /// Whether the list had a `*` entry
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Parsed ranges in input order
    pub fn ranges(&self) -> &[PortRange] {
        &self.ranges
    }

    /// Whether nothing was parsed
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && !self.wildcard
    }
}

/// Whether a port list covers 443
pub fn has_port_443(ports: &str) -> bool {
    PortList::parse(ports).contains(443)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_port_443() {
        assert!(has_port_443("443"));
        assert!(has_port_443("80,443"));
        assert!(has_port_443("440-445"));
        assert!(!has_port_443("444-65535"));
        assert!(!has_port_443("80"));
        assert!(!has_port_443(""));
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let list = PortList::parse("abc, 80 ,500-400,1000-2000");
        assert_eq!(list.ranges().len(), 2);
        assert!(list.contains(80));
        assert!(list.contains(1500));
        assert!(!list.contains(450));
    }

    #[test]
    fn test_wildcard() {
        let list = PortList::parse("*");
        assert!(list.is_wildcard());
        assert!(!list.contains(443));
        assert!(!has_port_443("*"));
        assert!(!list.is_empty());
    }

    #[test]
    fn test_display() {
        let list = PortList::parse("80,444-65535");
        let rendered: Vec<String> = list.ranges().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["80", "444-65535"]);
    }
}
