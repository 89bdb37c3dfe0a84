//! Connection Logger Error Hierarchy
//!
//! Defines the error types surfaced by the registry, the gRPC probing layer
//! and configuration loading.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registration and lifecycle failures of the connection registry
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Channel construction failures
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Log file setup failures
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A live registration already uses this name
    #[error("connection with name {0} already exists")]
    AlreadyExists(String),

    #[error("connection name must not be empty")]
    EmptyName,

    /// The registry has been shut down and accepts no new connections
    #[error("connection registry is closed")]
    Closed,

    /// `register` was called from a thread without a Tokio runtime
    #[error("no Tokio runtime to spawn the watcher on")]
    NoRuntime,

    /// Watchers did not stop within the configured shutdown window
    #[error("watchers still running after {0:?}")]
    ShutdownTimeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Malformed connection addresses
    #[error("Invalid URI format: {0}")]
    InvalidURI(String),
}

impl Error {
    /// Returns the registry error carried by this error, if any
    pub fn as_registry(&self) -> Option<&RegistryError> {
        match self {
            Error::Registry(e) => Some(e),
            _ => None,
        }
    }

    /// Whether registration failed because the name is taken
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::Registry(RegistryError::AlreadyExists(_)))
    }
}
