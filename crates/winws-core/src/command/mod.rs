//! Command line composition
//!
//! Turns selections into the final winws argument list: one block per active
//! category (`base_filter` + strategy args), blocks separated by `--new`,
//! global capture flags in front, then path resolution and the filter chain.

mod escape;
mod launch;

pub use escape::{escape_batch, escape_xml, quote_token, render_arguments, render_command_line};
pub use launch::{InvocationContext, LaunchPlan};

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::category::{capture_flags, CategoryCatalog, CategoryFilterResolver, FilterKey, Selections};
use crate::chain::{FilterChain, FilterChainConfig};
use crate::config::AppConfig;
use crate::paths::PathResolver;
use crate::strategy::StrategyTables;
use crate::tokens::{split_args, SEPARATOR};

const PAYLOAD_PREFIX: &str = "--payload=";

/// Result of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltCommand {
    /// winws executable
    pub exe_path: PathBuf,
    /// Working directory winws runs in
    pub work_dir: PathBuf,
    /// Final argument tokens
    pub tokens: Vec<String>,
    /// Rendered, escaped command line including the executable
    pub command_line: String,
    /// Categories that contributed a block, in order
    pub active_categories: Vec<String>,
}

impl BuiltCommand {
    /// Whether no category contributed anything
    pub fn is_empty(&self) -> bool {
        self.active_categories.is_empty()
    }
}

/// Builds winws command lines
#[derive(Debug, Clone)]
pub struct CommandLineBuilder {
    work_dir: PathBuf,
    exe_path: PathBuf,
    chain: FilterChainConfig,
    capture_filters: bool,
    filter_dir: Option<PathBuf>,
}

impl CommandLineBuilder {
    /// Builder with default pass toggles and capture flags enabled
    pub fn new(work_dir: impl Into<PathBuf>, exe_path: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            exe_path: exe_path.into(),
            chain: FilterChainConfig::default(),
            capture_filters: true,
            filter_dir: None,
        }
    }

    /// Builder configured from the application config
    pub fn from_config(config: &AppConfig) -> Self {
        let mut builder = Self::new(&config.paths.work_dir, config.winws_exe())
            .with_chain(config.pipeline.filters)
            .with_capture_filters(config.pipeline.capture_filters);
        if let Some(dir) = config.filter_dir() {
            builder = builder.with_filter_dir(dir);
        }
        builder
    }

    /// Set the rewrite pass toggles
    pub fn with_chain(mut self, chain: FilterChainConfig) -> Self {
        self.chain = chain;
        self
    }

    /// Enable or disable the `--wf-*` capture flags
    pub fn with_capture_filters(mut self, enabled: bool) -> Self {
        self.capture_filters = enabled;
        self
    }

    /// Override the raw filter directory
    pub fn with_filter_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.filter_dir = Some(dir.into());
        self
    }

    /// Working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn path_resolver(&self) -> PathResolver {
        let resolver = PathResolver::new(&self.work_dir);
        match &self.filter_dir {
            Some(dir) => resolver.with_filter_dir(dir.clone()),
            None => resolver,
        }
    }

    /// Compose the command for the given selections
    #[instrument(skip_all, fields(work_dir = %self.work_dir.display()))]
    pub fn build(
        &self,
        selections: &Selections,
        catalog: &CategoryCatalog,
        tables: &StrategyTables,
    ) -> BuiltCommand {
        let resolver = self.path_resolver();

        for (key, _) in selections.active() {
            if catalog.get(key).is_none() {
                warn!(category = key, "Selection for unknown category ignored");
            }
        }

        let mut body: Vec<String> = Vec::new();
        let mut active = Vec::new();
        let mut filters: BTreeSet<FilterKey> = BTreeSet::new();

        for category in catalog.iter() {
            if !selections.is_active(&category.key) {
                continue;
            }
            let strategy_id = selections.get(&category.key);

            let Some(strategy) = tables
                .get(&category.strategy_type)
                .and_then(|table| table.get(strategy_id))
            else {
                warn!(category = %category.key, strategy = strategy_id, "Unknown strategy, category skipped");
                continue;
            };
            if !strategy.enabled {
                warn!(category = %category.key, strategy = strategy_id, "Strategy is disabled, category skipped");
                continue;
            }
            for blob in strategy.missing_blobs(resolver.bin_dir()) {
                warn!(category = %category.key, strategy = strategy_id, blob = %blob, "Strategy blob file is missing");
            }

            let mut block = split_args(&category.effective_base_filter());
            let mut args = strategy.tokens();
            if category.strip_payload {
                args.retain(|t| !t.starts_with(PAYLOAD_PREFIX));
            }
            block.extend(args);
            if block.is_empty() {
                warn!(category = %category.key, "Category produced no arguments, skipped");
                continue;
            }

            if !body.is_empty() {
                body.push(SEPARATOR.to_string());
            }
            debug!(category = %category.key, strategy = strategy_id, tokens = block.len(), "Added category block");
            body.extend(block);
            filters.extend(CategoryFilterResolver::required_filters(category));
            active.push(category.key.clone());
        }

        let mut tokens = if self.capture_filters {
            capture_flags(&filters)
        } else {
            Vec::new()
        };
        tokens.extend(body);

        let tokens = resolver.resolve(&tokens);
        let tokens = FilterChain::from_config(&self.chain).apply(tokens, resolver.lists_dir());
        let command_line = render_command_line(&self.exe_path.display().to_string(), &tokens);

        info!(
            categories = active.len(),
            tokens = tokens.len(),
            length = command_line.chars().count(),
            "Built command line"
        );

        BuiltCommand {
            exe_path: self.exe_path.clone(),
            work_dir: self.work_dir.clone(),
            tokens,
            command_line,
            active_categories: active,
        }
    }
}
