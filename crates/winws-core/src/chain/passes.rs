//! Individual rewrite passes

use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::ports::has_port_443;
use super::{PassContext, RewritePass};
use crate::tokens::{has_any_prefix, is_absolute_value, split_flag, SEPARATOR};

/// Flags whose value names a list file that must exist
const LIST_FILE_PREFIXES: &[&str] = &[
    "--hostlist=",
    "--hostlist-exclude=",
    "--ipset=",
    "--ipset-exclude=",
];

/// Hostlist directives removed in "all sites" mode
pub(crate) const HOSTLIST_PREFIXES: &[&str] =
    &["--hostlist=", "--hostlist-domains=", "--hostlist-exclude="];

/// Ipset directives removed in "all IPs" mode
pub(crate) const IPSET_PREFIXES: &[&str] = &["--ipset=", "--ipset-ip=", "--ipset-exclude="];

const PLACEHOLDER: &str = "# Created automatically because a strategy references this list\n\
                           # Add one entry per line\n";

/// Creates empty placeholder files for referenced lists that are missing
pub struct EnsureListFiles;

impl EnsureListFiles {
    fn ensure(path: &Path) {
        if path.exists() {
            return;
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create list directory");
                return;
            }
        }
        match fs::write(path, PLACEHOLDER) {
            Ok(()) => info!(path = %path.display(), "Created placeholder list file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to create list file"),
        }
    }
}

impl RewritePass for EnsureListFiles {
    fn name(&self) -> &'static str {
        "ensure_list_files"
    }

    fn apply(&self, tokens: Vec<String>, ctx: &PassContext) -> Vec<String> {
        for token in &tokens {
            if !has_any_prefix(token, LIST_FILE_PREFIXES) {
                continue;
            }
            let Some((_, value)) = split_flag(token) else {
                continue;
            };
            let value = value.strip_prefix('@').unwrap_or(value);
            if value.is_empty() {
                continue;
            }
            if is_absolute_value(value) {
                Self::ensure(Path::new(value));
            } else {
                Self::ensure(&ctx.lists_dir.join(value));
            }
        }
        tokens
    }
}

/// Removes every token starting with one of the prefixes
pub struct StripPrefixes {
    name: &'static str,
    prefixes: &'static [&'static str],
}

impl StripPrefixes {
    /// "Apply to all sites": drop hostlist directives
    pub fn hostlists() -> Self {
        Self {
            name: "strip_hostlists",
            prefixes: HOSTLIST_PREFIXES,
        }
    }

    /// "Apply to all IPs": drop ipset directives
    pub fn ipsets() -> Self {
        Self {
            name: "strip_ipsets",
            prefixes: IPSET_PREFIXES,
        }
    }
}

impl RewritePass for StripPrefixes {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, tokens: Vec<String>, _ctx: &PassContext) -> Vec<String> {
        let before = tokens.len();
        let out: Vec<String> = tokens
            .into_iter()
            .filter(|t| !has_any_prefix(t, self.prefixes))
            .collect();
        debug!(pass = self.name, removed = before - out.len(), "Stripped directives");
        out
    }
}

/// Swaps the `other.txt` hostlist for `allzone.txt`
pub struct AllzoneSubstitution;

impl RewritePass for AllzoneSubstitution {
    fn name(&self) -> &'static str {
        "allzone_substitution"
    }

    fn apply(&self, tokens: Vec<String>, _ctx: &PassContext) -> Vec<String> {
        tokens
            .into_iter()
            .map(|t| {
                if t.starts_with("--hostlist=") && t.contains("other.txt") {
                    t.replace("other.txt", "allzone.txt")
                } else {
                    t
                }
            })
            .collect()
    }
}

/// Adds window-size limiting to TCP/443 filter blocks
pub struct WssizeInjection;

impl WssizeInjection {
    fn is_wssize(token: &str) -> bool {
        token == "--wssize" || token.starts_with("--wssize=") || token.starts_with("--wssize-forced-cutoff")
    }
}

impl RewritePass for WssizeInjection {
    fn name(&self) -> &'static str {
        "wssize_injection"
    }

    fn apply(&self, mut tokens: Vec<String>, _ctx: &PassContext) -> Vec<String> {
        let mut i = 0;
        while i < tokens.len() {
            let Some(ports) = tokens[i].strip_prefix("--filter-tcp=") else {
                i += 1;
                continue;
            };
            if !has_port_443(ports) {
                i += 1;
                continue;
            }

            // The block runs until the next separator or the end of the list.
            let end = tokens[i + 1..]
                .iter()
                .position(|t| t == SEPARATOR)
                .map_or(tokens.len(), |p| i + 1 + p);

            if !tokens[i + 1..end].iter().any(|t| Self::is_wssize(t)) {
                debug!(filter = %tokens[i], "Injecting wssize");
                tokens.splice(
                    end..end,
                    [
                        "--wssize".to_string(),
                        "1:6".to_string(),
                        "--wssize-forced-cutoff=0".to_string(),
                    ],
                );
            }
            i += 1;
        }
        tokens
    }
}
