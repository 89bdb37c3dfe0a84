use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::*;

#[test]
fn test_state_display_uses_upper_snake_case() {
    assert_eq!(ConnectivityState::Idle.to_string(), "IDLE");
    assert_eq!(ConnectivityState::Connecting.to_string(), "CONNECTING");
    assert_eq!(ConnectivityState::Ready.to_string(), "READY");
    assert_eq!(
        ConnectivityState::TransientFailure.to_string(),
        "TRANSIENT_FAILURE"
    );
    assert_eq!(ConnectivityState::Shutdown.to_string(), "SHUTDOWN");
}

#[test]
fn test_set_state_reports_real_changes_only() {
    let cell = ConnectivityCell::default();
    assert_eq!(cell.current_state(), ConnectivityState::Idle);

    assert!(cell.set_state(ConnectivityState::Ready));
    assert!(!cell.set_state(ConnectivityState::Ready));
    assert_eq!(cell.current_state(), ConnectivityState::Ready);
}

#[test]
fn test_clones_share_state() {
    let cell = ConnectivityCell::new(ConnectivityState::Connecting);
    let observer = cell.clone();

    cell.set_state(ConnectivityState::TransientFailure);
    assert_eq!(observer.current_state(), ConnectivityState::TransientFailure);
}

#[tokio::test]
async fn test_wait_returns_immediately_when_state_already_differs() {
    let cell = ConnectivityCell::new(ConnectivityState::Ready);

    let changed = timeout(
        Duration::from_millis(100),
        cell.wait_for_state_change(ConnectivityState::Idle, CancellationToken::new()),
    )
    .await
    .expect("wait should not block");

    assert!(changed);
}

#[tokio::test]
async fn test_wait_wakes_on_transition() {
    let cell = ConnectivityCell::new(ConnectivityState::Idle);
    let waiter = cell.clone();

    let handle = tokio::spawn(async move {
        waiter
            .wait_for_state_change(ConnectivityState::Idle, CancellationToken::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());

    cell.set_state(ConnectivityState::Connecting);

    let changed = timeout(Duration::from_millis(500), handle)
        .await
        .expect("waiter should wake")
        .expect("waiter should not panic");
    assert!(changed);
}

#[tokio::test]
async fn test_wait_ignores_republishing_the_baseline() {
    let cell = ConnectivityCell::new(ConnectivityState::Idle);

    cell.set_state(ConnectivityState::Idle);
    let result = timeout(
        Duration::from_millis(50),
        cell.wait_for_state_change(ConnectivityState::Idle, CancellationToken::new()),
    )
    .await;

    assert!(result.is_err(), "No transition happened, wait must keep blocking");
}

#[tokio::test]
async fn test_wait_returns_false_on_cancellation() {
    let cell = ConnectivityCell::new(ConnectivityState::Idle);
    let token = CancellationToken::new();
    let waiter = cell.clone();
    let wait_token = token.clone();

    let handle = tokio::spawn(async move {
        waiter
            .wait_for_state_change(ConnectivityState::Idle, wait_token)
            .await
    });

    token.cancel();

    let changed = timeout(Duration::from_millis(500), handle)
        .await
        .expect("cancellation should wake the waiter")
        .unwrap();
    assert!(!changed);
    assert_eq!(cell.current_state(), ConnectivityState::Idle);
}
