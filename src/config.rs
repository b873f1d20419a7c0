//! Configuration
//!
//! Loads the server configuration from a TOML file. Every field has a
//! default, so an empty file (or no file at all) yields a working setup:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 6379
//!
//! [store]
//! namespace = "test"
//! set = "redis"
//! bin = "b"
//! type_bin = "t"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
        }
    }
}

/// Where and how records are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub namespace: String,
    pub set: String,
    /// Bin holding the container value
    pub bin: String,
    /// Bin holding the logical type name
    pub type_bin: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "test".to_string(),
            set: "redis".to_string(),
            bin: "b".to_string(),
            type_bin: "t".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("port cannot be 0".to_string()));
        }

        if self.store.namespace.is_empty() {
            return Err(ConfigError::Invalid("namespace cannot be empty".to_string()));
        }

        if self.store.bin.is_empty() || self.store.type_bin.is_empty() {
            return Err(ConfigError::Invalid(
                "bin and type_bin cannot be empty".to_string(),
            ));
        }

        if self.store.bin == self.store.type_bin {
            return Err(ConfigError::Invalid(format!(
                "bin and type_bin must differ (both are '{}')",
                self.store.bin
            )));
        }

        Ok(())
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
