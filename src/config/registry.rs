use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Behaviour of the connection registry and its watcher tasks
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Prefix of every registration and transition log line
    #[serde(default = "default_component")]
    pub component: String,

    /// Upper bound for joining all watchers during shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_in_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            component: default_component(),
            shutdown_timeout_in_ms: default_shutdown_timeout(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.component.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "registry.component must not be empty".into(),
            )));
        }

        if self.shutdown_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "registry.shutdown_timeout_in_ms must be greater than 0".into(),
            )));
        }

        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_in_ms)
    }
}

fn default_component() -> String {
    "ConnLogger".to_string()
}

const fn default_shutdown_timeout() -> u64 {
    5000
}
