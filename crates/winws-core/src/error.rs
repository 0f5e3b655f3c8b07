//! Error types for winws-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Main error type for winws-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A strategy record failed validation
    #[error("Invalid strategy '{id}': {reason}")]
    InvalidStrategy {
        /// Strategy id (may be empty when the id itself is missing)
        id: String,
        /// Why the record was rejected
        reason: String,
    },

    /// Strategy id is not present in the user document
    #[error("Strategy '{id}' not found in category '{category}'")]
    StrategyNotFound {
        /// Strategy category
        category: String,
        /// Requested id
        id: String,
    },

    /// A strategy or category document could not be parsed
    #[error("Malformed document '{path}': {message}")]
    Document {
        /// Path to the document
        path: String,
        /// Parser message
        message: String,
    },

    /// Invalid category definition
    #[error("Invalid category '{key}': {reason}")]
    InvalidCategory {
        /// Category key
        key: String,
        /// Why the record was rejected
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Persistent store failure
    #[error("State store error: {0}")]
    Store(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a strategy validation error
    pub fn invalid_strategy(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStrategy {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a document error
    pub fn document(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_strategy("bad id", "id contains invalid characters");
        assert!(err.to_string().contains("bad id"));
        assert!(err.to_string().contains("invalid characters"));

        let err = Error::StrategyNotFound {
            category: "tcp".into(),
            id: "missing".into(),
        };
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_config_value_error() {
        let err = Error::config_value("paths.work_dir", "must not be empty");
        match err {
            Error::ConfigValue { key, .. } => assert_eq!(key, "paths.work_dir"),
            _ => panic!("Wrong error type"),
        }
    }
}
