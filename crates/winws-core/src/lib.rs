//! # winws-manager Core
//!
//! Platform-independent composition of winws command lines.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Strategies** - builtin and user JSON documents merged per category
//! - **Categories** - traffic classes, their capture filters and selections
//! - **Path resolution** - list, blob and raw filter files under the work dir
//! - **Filter chain** - ordered, idempotent rewrite passes over the tokens
//! - **Command building** - escaping, length ceilings and the batch fallback
//! - **Configuration** - TOML application config and persisted state
//!
//! ## Example
//!
//! ```rust,no_run
//! use winws_core::{AppConfig, CategoryCatalog, CommandLineBuilder, Selections, StrategyRegistry};
//!
//! let config = AppConfig::load("winws-manager.toml")?;
//! let catalog = CategoryCatalog::load(config.categories_file())?;
//! let registry = StrategyRegistry::new(config.builtin_strategies_dir(), config.user_strategies_dir());
//! let tables = registry.load_all(catalog.strategy_types(), config.pipeline.strategy_set.as_deref())?;
//!
//! let mut selections = Selections::new();
//! selections.set("youtube", "other_seqovl");
//!
//! let built = CommandLineBuilder::from_config(&config).build(&selections, &catalog, &tables);
//! println!("{}", built.command_line);
//! # Ok::<(), winws_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod category;
pub mod chain;
pub mod command;
pub mod config;
pub mod error;
pub mod paths;
pub mod store;
pub mod strategy;
pub mod tokens;

// Re-exports for convenience
pub use category::{Category, CategoryCatalog, CategoryFilterResolver, FilterKey, Selections};
pub use chain::{FilterChain, FilterChainConfig};
pub use command::{BuiltCommand, CommandLineBuilder, InvocationContext, LaunchPlan};
pub use config::{AppConfig, AutostartMethod};
pub use error::{Error, Result};
pub use paths::PathResolver;
pub use store::{AutostartStatus, FileStore, MemoryStore, PersistentConfigStore};
pub use strategy::{Strategy, StrategyRegistry, StrategyTable, StrategyTables};
