use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tracing::trace;

use super::Connectivity;
use super::ConnectivityState;

/// In-process publisher of a connection's state
///
/// Owners call [`ConnectivityCell::set_state`] whenever they detect a
/// transition; observers use the [`Connectivity`] contract. Clones share the
/// same state.
#[derive(Debug, Clone)]
pub struct ConnectivityCell {
    tx: Arc<watch::Sender<ConnectivityState>>,
}

impl ConnectivityCell {
    pub fn new(initial: ConnectivityState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Publishes `state`. Returns whether it differs from the previous one;
    /// setting the current state again wakes nobody.
    pub fn set_state(
        &self,
        state: ConnectivityState,
    ) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            trace!(%state, "Connectivity state published");
        }
        changed
    }
}

impl Default for ConnectivityCell {
    fn default() -> Self {
        Self::new(ConnectivityState::Idle)
    }
}

#[async_trait]
impl Connectivity for ConnectivityCell {
    fn current_state(&self) -> ConnectivityState {
        *self.tx.borrow()
    }

    async fn wait_for_state_change(
        &self,
        baseline: ConnectivityState,
        cancel: CancellationToken,
    ) -> bool {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() != baseline {
                return true;
            }
            tokio::select! {
                changed = rx.changed() => {
                    // The sender lives as long as self
                    if changed.is_err() {
                        return false;
                    }
                }
                _ = cancel.cancelled() => return false,
            }
        }
    }
}
