//! # conn-logger
//!
//! Tracks the connectivity state of named, long-lived gRPC connections and
//! logs every transition.
//!
//! - [`ConnectionRegistry`] - unique registration by name, one watcher task per
//!   connection, last-known state per name
//! - [`Connectivity`] - the contract a connection implements to be observed
//! - [`ConnectivityCell`] - in-process state publisher implementing that contract
//! - [`ProbedChannel`] - tonic channel whose state is detected by health checks
//!
//! The registry only observes: dialing, retries and teardown stay with the
//! owner of each connection.
//!
//! ```ignore
//! let registry = ConnectionRegistry::new(RegistryConfig::default());
//! let channel = ProbedChannel::connect(
//!     "http://127.0.0.1:50051",
//!     &NetworkConfig::default(),
//!     &ProbeConfig::default(),
//! )?;
//! registry.register("db1", Arc::new(channel))?;
//! // ConnLogger: connection for db1 is being logged. current state IDLE
//! // ConnLogger: state change for db1 has occurred. new state: READY
//! ```

mod config;
mod connectivity;
mod errors;
mod network;
mod registry;

pub use config::*;
pub use connectivity::*;
pub use errors::*;
pub use network::*;
pub use registry::*;

#[cfg(test)]
mod test_utils;
