use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::Weak;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;

use super::connection_registry::RegistryInner;
use crate::Connectivity;
use crate::ConnectivityState;

/// Background task following the transitions of one registered connection
pub(super) struct Watcher<C> {
    id: u64,
    name: String,
    handle: Arc<C>,
    cancel: CancellationToken,
    registry: Weak<RegistryInner<C>>,
    component: String,
}

impl<C: Connectivity> Watcher<C> {
    pub(super) fn new(
        id: u64,
        name: String,
        handle: Arc<C>,
        cancel: CancellationToken,
        registry: Weak<RegistryInner<C>>,
        component: String,
    ) -> Self {
        Self {
            id,
            name,
            handle,
            cancel,
            registry,
            component,
        }
    }

    pub(super) async fn run(self) {
        trace!("Watcher started");
        while self.step().await.is_continue() {}
        if let Some(registry) = self.registry.upgrade() {
            registry.watchers.remove(&self.id);
        }
        debug!("Watcher terminated");
    }

    /// One Lookup -> Blocking -> record iteration.
    ///
    /// Breaks when the record is gone, belongs to a later registration, or the
    /// watcher was cancelled.
    pub(super) async fn step(&self) -> ControlFlow<()> {
        let Some(baseline) = self.lookup() else {
            return ControlFlow::Break(());
        };

        let changed = self
            .handle
            .wait_for_state_change(baseline, self.cancel.clone())
            .await;

        // Transitions between the wake-up and this read are coalesced
        let observed = self.handle.current_state();
        if changed {
            info!(
                "{}: state change for {} has occurred. new state: {}",
                self.component, self.name, observed
            );
        } else {
            trace!(%baseline, %observed, "Woke up without a state change");
        }

        self.record(observed);
        ControlFlow::Continue(())
    }

    /// Last recorded state, if the record is still ours
    fn lookup(&self) -> Option<ConnectivityState> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let registry = self.registry.upgrade()?;
        let entry = registry.entries.get(&self.name)?;
        (entry.id == self.id).then_some(entry.state)
    }

    fn record(
        &self,
        state: ConnectivityState,
    ) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if let Some(mut entry) = registry.entries.get_mut(&self.name) {
            if entry.id == self.id {
                entry.state = state;
            }
        };
    }
}
