//! Shared helpers for unit tests
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;

use crate::Connectivity;
use crate::ConnectivityState;

/// Polls `condition` until it holds or `timeout` elapses
pub(crate) async fn wait_until<F>(
    condition: F,
    timeout: Duration,
) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Connection whose wait never returns, cancellation included
pub(crate) struct UnresponsiveConnection;

#[async_trait]
impl Connectivity for UnresponsiveConnection {
    fn current_state(&self) -> ConnectivityState {
        ConnectivityState::Ready
    }

    async fn wait_for_state_change(
        &self,
        _baseline: ConnectivityState,
        _cancel: CancellationToken,
    ) -> bool {
        std::future::pending::<bool>().await
    }
}
