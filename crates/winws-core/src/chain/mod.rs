//! Filter chain
//!
//! Ordered sequence of text-level rewrite passes over a resolved argument
//! list. Each pass is idempotent and the order is fixed: list files must
//! exist before anything uses them, stripping runs before substitution, and
//! window-size injection sees the final filter set.

mod passes;
pub mod ports;

pub use passes::{AllzoneSubstitution, EnsureListFiles, StripPrefixes, WssizeInjection};
pub use ports::{has_port_443, PortList, PortRange};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Pass toggles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterChainConfig {
    /// Drop all hostlist directives ("apply to all sites")
    pub strip_hostlists: bool,
    /// Drop all ipset directives ("apply to all IPs")
    pub strip_ipsets: bool,
    /// Replace `other.txt` hostlists with `allzone.txt`
    pub allzone_substitution: bool,
    /// Add `--wssize 1:6` to TCP/443 blocks
    pub wssize_injection: bool,
}

/// Data shared by all passes of one run
#[derive(Debug, Clone)]
pub struct PassContext {
    /// Directory that relative list files live in
    pub lists_dir: PathBuf,
}

/// A single rewrite over the token list
pub trait RewritePass: Send + Sync {
    /// Pass name for logging
    fn name(&self) -> &'static str;

    /// Rewrite the token list. Must be idempotent.
    fn apply(&self, tokens: Vec<String>, ctx: &PassContext) -> Vec<String>;
}

/// Configured sequence of passes
pub struct FilterChain {
    passes: Vec<Box<dyn RewritePass>>,
}

impl FilterChain {
    /// Build the chain for a configuration
    pub fn from_config(config: &FilterChainConfig) -> Self {
        let mut passes: Vec<Box<dyn RewritePass>> = vec![Box::new(EnsureListFiles)];

        if config.strip_hostlists {
            passes.push(Box::new(StripPrefixes::hostlists()));
        }
        if config.strip_ipsets {
            passes.push(Box::new(StripPrefixes::ipsets()));
        }
        if config.allzone_substitution {
            passes.push(Box::new(AllzoneSubstitution));
        }
        if config.wssize_injection {
            passes.push(Box::new(WssizeInjection));
        }

        Self { passes }
    }

    /// Names of the enabled passes, in execution order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over the tokens
    #[instrument(skip_all, fields(tokens = tokens.len()))]
    pub fn apply(&self, tokens: Vec<String>, lists_dir: &Path) -> Vec<String> {
        let ctx = PassContext {
            lists_dir: lists_dir.to_path_buf(),
        };
        self.passes
            .iter()
            .fold(tokens, |tokens, pass| pass.apply(tokens, &ctx))
    }
}

/// Apply the chain described by `config` to `tokens`
pub fn apply(tokens: Vec<String>, lists_dir: &Path, config: &FilterChainConfig) -> Vec<String> {
    FilterChain::from_config(config).apply(tokens, lists_dir)
}
