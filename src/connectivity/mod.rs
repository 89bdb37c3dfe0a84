//! Connectivity contract between the registry and the connections it observes.
//!
//! A monitored connection only has to answer two questions: what its state is
//! right now, and when that state moves away from a given baseline. Everything
//! else about the connection (dialing, retries, teardown) stays with its owner.

mod cell;
pub use cell::*;

#[cfg(test)]
mod cell_test;

use std::fmt;

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;

/// Connectivity state of a long-lived connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectivityState {
    /// No activity, no transport established
    Idle,
    /// Establishing a transport
    Connecting,
    /// Transport is established and usable
    Ready,
    /// Transport failed and is expected to recover
    TransientFailure,
    /// Connection has been closed by its owner
    Shutdown,
}

impl ConnectivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::Idle => "IDLE",
            ConnectivityState::Connecting => "CONNECTING",
            ConnectivityState::Ready => "READY",
            ConnectivityState::TransientFailure => "TRANSIENT_FAILURE",
            ConnectivityState::Shutdown => "SHUTDOWN",
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connectivity: Send + Sync + 'static {
    /// Non-blocking read of the current state.
    fn current_state(&self) -> ConnectivityState;

    /// Blocks until the state differs from `baseline` or `cancel` fires.
    ///
    /// Returns `true` when a state change ended the wait (immediately if the
    /// state already differs from `baseline`), `false` when cancelled.
    async fn wait_for_state_change(
        &self,
        baseline: ConnectivityState,
        cancel: CancellationToken,
    ) -> bool;
}
