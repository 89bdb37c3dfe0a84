use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tonic::Status;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::HealthCheckResponse;

use super::health_probe::*;
use crate::test_utils::wait_until;
use crate::Connectivity;
use crate::ConnectivityCell;
use crate::ConnectivityState;

fn response(status: ServingStatus) -> HealthCheckResponse {
    HealthCheckResponse {
        status: status as i32,
    }
}

#[test]
fn test_serving_maps_to_ready() {
    assert_eq!(
        state_from_health(Ok(response(ServingStatus::Serving))),
        ConnectivityState::Ready
    );
}

#[test]
fn test_not_serving_maps_to_transient_failure() {
    assert_eq!(
        state_from_health(Ok(response(ServingStatus::NotServing))),
        ConnectivityState::TransientFailure
    );
    assert_eq!(
        state_from_health(Ok(response(ServingStatus::Unknown))),
        ConnectivityState::TransientFailure
    );
}

#[test]
fn test_unimplemented_health_service_maps_to_ready() {
    assert_eq!(
        state_from_health(Err(Status::unimplemented("no health service"))),
        ConnectivityState::Ready
    );
}

#[test]
fn test_transport_errors_map_to_transient_failure() {
    assert_eq!(
        state_from_health(Err(Status::unavailable("connection refused"))),
        ConnectivityState::TransientFailure
    );
    assert_eq!(
        state_from_health(Err(Status::deadline_exceeded("timeout"))),
        ConnectivityState::TransientFailure
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_probe_publishes_each_outcome() {
    let mut probe = MockHealthProbe::new();
    let mut calls = 0;
    probe.expect_probe().returning(move || {
        calls += 1;
        if calls <= 2 {
            ConnectivityState::Ready
        } else {
            ConnectivityState::TransientFailure
        }
    });

    let cell = ConnectivityCell::default();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_probe(
        probe,
        cell.clone(),
        Duration::from_millis(100),
        cancel.clone(),
    ));

    assert!(
        wait_until(
            || cell.current_state() == ConnectivityState::Ready,
            Duration::from_secs(1)
        )
        .await
    );
    assert!(
        wait_until(
            || cell.current_state() == ConnectivityState::TransientFailure,
            Duration::from_secs(1)
        )
        .await
    );

    cancel.cancel();
    task.await.unwrap();
    assert_eq!(cell.current_state(), ConnectivityState::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_run_probe_stops_before_first_tick_when_cancelled() {
    let mut probe = MockHealthProbe::new();
    probe.expect_probe().never();

    let cell = ConnectivityCell::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    run_probe(probe, cell.clone(), Duration::from_millis(100), cancel).await;

    assert_eq!(cell.current_state(), ConnectivityState::Shutdown);
}
