use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Health probing used to detect the connectivity state of gRPC channels
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProbeConfig {
    /// Delay between two health checks of the same channel
    #[serde(default = "default_probe_interval")]
    pub interval_in_ms: u64,

    /// Service name sent in the health check request ("" checks the whole server)
    #[serde(default)]
    pub service: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_in_ms: default_probe_interval(),
            service: String::new(),
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_in_ms < 10 {
            return Err(Error::Config(ConfigError::Message(format!(
                "probe.interval_in_ms {} too small, minimum 10ms",
                self.interval_in_ms
            ))));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_in_ms)
    }
}

const fn default_probe_interval() -> u64 {
    1000
}
