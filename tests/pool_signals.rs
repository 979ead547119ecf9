//! Pools subscribing to OS signals on the caller's behalf.

use std::time::Duration;

use serverpool::{Item, Pool, PoolConfig, SignalKind};

mod common;
use common::{EventLog, MockServer};

fn hangup_config() -> PoolConfig {
    PoolConfig {
        stop_timeout_ms: 1_000,
        signals: vec![SignalKind::Hangup],
    }
}

#[cfg(unix)]
async fn send_hangup() {
    let status = tokio::process::Command::new("kill")
        .arg("-HUP")
        .arg(std::process::id().to_string())
        .status()
        .await
        .expect("kill available");
    assert!(status.success());
}

#[cfg(unix)]
#[tokio::test]
async fn pools_hold_independent_subscriptions() {
    let log = EventLog::new();
    let first = Pool::new(
        &hangup_config(),
        vec![Item::new("first", MockServer::new("first", &log).build())],
    );
    let second = Pool::new(
        &hangup_config(),
        vec![Item::new("second", MockServer::new("second", &log).build())],
    );

    let (first_signals, _first_errors) = first.start().unwrap();
    let (mut second_signals, _second_errors) = second.start().unwrap();
    assert_eq!(first_signals.listener_count(), 1);
    assert_eq!(second_signals.listener_count(), 1);

    drop(first_signals);
    assert!(second_signals.is_listening());

    send_hangup().await;
    let received = tokio::time::timeout(Duration::from_secs(2), second_signals.recv())
        .await
        .expect("second pool still receives SIGHUP");
    assert_eq!(received, SignalKind::Hangup);

    first.stop().await.unwrap();
    second.stop().await.unwrap();
    assert!(second_signals.is_listening());
}

#[cfg(unix)]
#[tokio::test]
async fn every_pool_sees_each_delivery() {
    let log = EventLog::new();
    let first = Pool::new(&hangup_config(), vec![Item::new("a", MockServer::new("a", &log).build())]);
    let second = Pool::new(&hangup_config(), vec![Item::new("b", MockServer::new("b", &log).build())]);

    let (mut first_signals, _e1) = first.start().unwrap();
    let (mut second_signals, _e2) = second.start().unwrap();

    send_hangup().await;
    for signals in [&mut first_signals, &mut second_signals] {
        let received = tokio::time::timeout(Duration::from_secs(2), signals.recv())
            .await
            .expect("SIGHUP delivered");
        assert_eq!(received, SignalKind::Hangup);
    }
}

#[cfg(not(unix))]
#[tokio::test]
async fn unsupported_signal_leaves_pool_unstarted() {
    let log = EventLog::new();
    let server = MockServer::new("only", &log).build();
    let pool = Pool::new(&hangup_config(), vec![Item::new("only", server.clone())]);

    use serverpool::{ItemState, PoolError};

    assert!(matches!(pool.start(), Err(PoolError::Signal(_))));
    assert_eq!(pool.state("only"), Some(ItemState::Unstarted));
    assert_eq!(server.start_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(matches!(pool.stop().await, Err(PoolError::NotStarted)));
}
