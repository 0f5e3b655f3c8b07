//! File reference resolution inside argument tokens
//!
//! Strategies reference hostlists, ipsets, blob files and raw windivert
//! filter parts by bare file name. [`PathResolver`] rewrites those into paths
//! under the installation's `lists/`, `bin/` and `windivert.filter/`
//! directories. Dispatch is a table of prefix rows evaluated in order; the
//! first matching row wins.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::tokens::{is_absolute_value, split_flag};

/// Directory holding hostlist and ipset files, relative to the work dir
pub const LISTS_DIR: &str = "lists";
/// Directory holding blob files, relative to the work dir
pub const BIN_DIR: &str = "bin";
/// Directory holding raw windivert filter parts, relative to the work dir
pub const FILTER_DIR: &str = "windivert.filter";

/// Value prefixes that mark a literal blob value rather than a file
const LITERAL_BLOB_PREFIXES: &[&str] = &["0x", "!", "^"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathKind {
    /// `@file` raw filter part
    RawFilter,
    /// Hostlist / ipset file
    List,
    /// Binary blob file
    Blob,
}

struct PathRule {
    prefixes: &'static [&'static str],
    kind: PathKind,
}

static RULES: &[PathRule] = &[
    PathRule {
        prefixes: &["--wf-raw-part="],
        kind: PathKind::RawFilter,
    },
    PathRule {
        prefixes: &[
            "--hostlist=",
            "--ipset=",
            "--hostlist-exclude=",
            "--ipset-exclude=",
        ],
        kind: PathKind::List,
    },
    PathRule {
        prefixes: &[
            "--dpi-desync-fake-tls=",
            "--dpi-desync-fake-syndata=",
            "--dpi-desync-fake-quic=",
            "--dpi-desync-fake-unknown-udp=",
            "--dpi-desync-split-seqovl-pattern=",
            "--dpi-desync-fake-http=",
            "--dpi-desync-fake-unknown=",
            "--dpi-desync-fakedsplit-pattern=",
        ],
        kind: PathKind::Blob,
    },
];

/// Resolves relative file references against the installation directories
#[derive(Debug, Clone)]
pub struct PathResolver {
    lists_dir: PathBuf,
    bin_dir: PathBuf,
    filter_dir: PathBuf,
}

impl PathResolver {
    /// Create a resolver using the standard layout under `work_dir`
    pub fn new(work_dir: &Path) -> Self {
        Self {
            lists_dir: work_dir.join(LISTS_DIR),
            bin_dir: work_dir.join(BIN_DIR),
            filter_dir: work_dir.join(FILTER_DIR),
        }
    }

    /// Override the raw windivert filter directory
    pub fn with_filter_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.filter_dir = dir.into();
        self
    }

    /// Lists directory used for hostlists and ipsets
    pub fn lists_dir(&self) -> &Path {
        &self.lists_dir
    }

    /// Blob directory
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Resolve every token. Output has the same length and order as input.
    pub fn resolve(&self, tokens: &[String]) -> Vec<String> {
        tokens.iter().map(|t| self.resolve_token(t)).collect()
    }

    /// Resolve a single token
    pub fn resolve_token(&self, token: &str) -> String {
        let Some(rule) = RULES
            .iter()
            .find(|rule| rule.prefixes.iter().any(|p| token.starts_with(p)))
        else {
            return token.to_string();
        };
        let Some((flag, value)) = split_flag(token) else {
            return token.to_string();
        };

        match rule.kind {
            PathKind::RawFilter => match value.strip_prefix('@') {
                Some(name) if !is_absolute_value(name) => {
                    let path = self.filter_dir.join(name);
                    if !path.exists() {
                        warn!(path = %path.display(), "Raw filter file not found");
                    }
                    format!("{flag}@{}", path.display())
                }
                _ => token.to_string(),
            },
            PathKind::List => {
                let (at, name) = match value.strip_prefix('@') {
                    Some(rest) => ("@", rest),
                    None => ("", value),
                };
                if name.is_empty() || is_absolute_value(name) {
                    return token.to_string();
                }
                let path = self.lists_dir.join(name);
                debug!(token, path = %path.display(), "Resolved list file");
                format!("{flag}{at}{}", path.display())
            }
            PathKind::Blob => {
                if value.is_empty()
                    || LITERAL_BLOB_PREFIXES.iter().any(|p| value.starts_with(p))
                    || is_absolute_value(value)
                {
                    return token.to_string();
                }
                let path = self.bin_dir.join(value);
                debug!(token, path = %path.display(), "Resolved blob file");
                format!("{flag}{}", path.display())
            }
        }
    }
}

/// Resolve tokens against the standard layout under `work_dir`
pub fn resolve(tokens: &[String], work_dir: &Path) -> Vec<String> {
    PathResolver::new(work_dir).resolve(tokens)
}
