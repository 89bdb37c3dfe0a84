use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tonic::transport::Channel;
use tonic::Code;
use tonic::Status;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::HealthCheckResponse;
use tracing::debug;
use tracing::trace;

use crate::Connectivity;
use crate::ConnectivityCell;
use crate::ConnectivityState;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait HealthProbe: Send + Sync + 'static {
    /// Performs one check and maps its outcome to a connectivity state
    async fn probe(&self) -> ConnectivityState;
}

/// Probes a channel with the standard gRPC health checking protocol
pub struct GrpcHealthProbe {
    client: HealthClient<Channel>,
    service: String,
}

impl GrpcHealthProbe {
    pub fn new(
        channel: Channel,
        service: impl Into<String>,
    ) -> Self {
        Self {
            client: HealthClient::new(channel),
            service: service.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for GrpcHealthProbe {
    async fn probe(&self) -> ConnectivityState {
        let mut client = self.client.clone();
        let request = tonic::Request::new(HealthCheckRequest {
            service: self.service.clone(),
        });
        let result = client.check(request).await.map(|response| response.into_inner());
        if let Err(status) = &result {
            trace!(code = ?status.code(), "Health check failed: {}", status.message());
        }
        state_from_health(result)
    }
}

/// `SERVING` means ready. A peer without a health service still answered, so
/// `Unimplemented` counts as ready too; every other outcome is a transient failure.
pub(crate) fn state_from_health(result: std::result::Result<HealthCheckResponse, Status>) -> ConnectivityState {
    match result {
        Ok(response) if response.status == ServingStatus::Serving as i32 => ConnectivityState::Ready,
        Ok(_) => ConnectivityState::TransientFailure,
        Err(status) if status.code() == Code::Unimplemented => ConnectivityState::Ready,
        Err(_) => ConnectivityState::TransientFailure,
    }
}

/// Probes every `interval` and publishes the outcome into `cell` until
/// `cancel` fires, then publishes `SHUTDOWN`.
pub(crate) async fn run_probe<P: HealthProbe>(
    probe: P,
    cell: ConnectivityCell,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if cell.current_state() == ConnectivityState::Idle {
            cell.set_state(ConnectivityState::Connecting);
        }

        let state = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            state = probe.probe() => state,
        };
        cell.set_state(state);
    }

    cell.set_state(ConnectivityState::Shutdown);
    debug!("Health probe stopped");
}
