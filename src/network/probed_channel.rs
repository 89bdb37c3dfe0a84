use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tonic::transport::Channel;
use tonic::transport::Endpoint;
use tracing::debug;
use tracing::info_span;
use tracing::Instrument;

use super::health_probe::run_probe;
use super::health_probe::GrpcHealthProbe;
use crate::Connectivity;
use crate::ConnectivityCell;
use crate::ConnectivityState;
use crate::NetworkConfig;
use crate::NetworkError;
use crate::ProbeConfig;
use crate::Result;

/// Lazily-connecting gRPC channel whose state is detected by health probing
///
/// The channel dials on first use; a background probe keeps the published
/// state current. Closing or dropping the channel stops the probe and moves
/// the state to `SHUTDOWN`.
#[derive(Debug)]
pub struct ProbedChannel {
    address: String,
    channel: Channel,
    cell: ConnectivityCell,
    cancel: CancellationToken,
}

impl ProbedChannel {
    /// Builds the channel and starts probing it. Must be called from within a
    /// Tokio runtime.
    pub fn connect(
        address: impl Into<String>,
        network: &NetworkConfig,
        probe: &ProbeConfig,
    ) -> Result<Self> {
        let address = address.into();
        let channel = endpoint(&address, network)?.connect_lazy();
        let cell = ConnectivityCell::new(ConnectivityState::Idle);
        let cancel = CancellationToken::new();

        let health = GrpcHealthProbe::new(channel.clone(), probe.service.clone());
        tokio::spawn(
            run_probe(health, cell.clone(), probe.interval(), cancel.clone())
                .instrument(info_span!("probe", %address)),
        );
        debug!(%address, interval_in_ms = probe.interval_in_ms, "Probing channel");

        Ok(Self {
            address,
            channel,
            cell,
            cancel,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Underlying channel, for issuing RPCs
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// Stops probing; the state settles on `SHUTDOWN`.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ProbedChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Connectivity for ProbedChannel {
    fn current_state(&self) -> ConnectivityState {
        self.cell.current_state()
    }

    async fn wait_for_state_change(
        &self,
        baseline: ConnectivityState,
        cancel: CancellationToken,
    ) -> bool {
        self.cell.wait_for_state_change(baseline, cancel).await
    }
}

/// Pre-configured endpoint for `address`
pub(crate) fn endpoint(
    address: &str,
    config: &NetworkConfig,
) -> Result<Endpoint> {
    let mut endpoint = Endpoint::from_shared(address.to_string())
        .map_err(|e| NetworkError::InvalidURI(format!("{address}: {e}")))?
        .connect_timeout(Duration::from_millis(config.connect_timeout_in_ms))
        .tcp_keepalive(Some(Duration::from_secs(config.tcp_keepalive_in_secs)))
        .http2_keep_alive_interval(Duration::from_secs(
            config.http2_keep_alive_interval_in_secs,
        ))
        .keep_alive_timeout(Duration::from_secs(config.http2_keep_alive_timeout_in_secs));

    if config.request_timeout_in_ms > 0 {
        endpoint = endpoint.timeout(Duration::from_millis(config.request_timeout_in_ms));
    }

    Ok(endpoint)
}
