//! Configuration management for the connection logger.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod network;
mod probe;
mod registry;
pub use network::*;
pub use probe::*;
pub use registry::*;


use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use tonic::transport::Endpoint;

use crate::Error;
use crate::Result;

/// Environment prefix for overrides, e.g. `CONNLOG__REGISTRY__COMPONENT`
const ENV_PREFIX: &str = "CONNLOG";

/// Main configuration container
///
/// Sources are merged with increasing priority:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConnLoggerConfig {
    /// Registry and watcher behaviour
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Transport parameters for monitored channels
    #[serde(default)]
    pub network: NetworkConfig,
    /// Health probing of monitored channels
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Log output
    #[serde(default)]
    pub log: LogConfig,
    /// Connections registered at startup by the binary
    #[serde(default)]
    pub connections: Vec<ConnectionTarget>,
}

/// A named endpoint to monitor
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub name: String,
    /// e.g. "http://127.0.0.1:50051"
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// Directory of the log file; logs go to stdout when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_name: default_log_file_name(),
        }
    }
}

fn default_log_file_name() -> String {
    "conn-logger.log".to_string()
}

impl ConnLoggerConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers MUST call `validate()` once all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/conn-logger.toml");
    /// std::env::set_var("CONNLOG__PROBE__INTERVAL_IN_MS", "500");
    /// let cfg = ConnLoggerConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Environment variables are re-applied on top, so they keep the highest priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.registry.validate()?;
        self.network.validate()?;
        self.probe.validate()?;
        self.validate_connections()?;
        Ok(self)
    }

    fn validate_connections(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for target in &self.connections {
            if target.name.is_empty() {
                return Err(Error::Config(ConfigError::Message(format!(
                    "connection for {} has an empty name",
                    target.address
                ))));
            }
            if !seen.insert(target.name.as_str()) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "connection name {} is configured more than once",
                    target.name
                ))));
            }
            Endpoint::from_shared(target.address.clone()).map_err(|e| {
                Error::Config(ConfigError::Message(format!(
                    "connection {} has invalid address {}: {}",
                    target.name, target.address, e
                )))
            })?;
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
