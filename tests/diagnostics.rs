//! Diagnostics endpoint driven by a pool, probed over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serverpool::config::DiagnosticsConfig;
use serverpool::{DiagnosticsServer, Item, ItemState, Pool, Server};

mod common;
use common::{test_config, wait_for_state, EventLog, MockServer};

fn local_diagnostics() -> Arc<DiagnosticsServer> {
    Arc::new(DiagnosticsServer::new(DiagnosticsConfig {
        bind_address: "127.0.0.1:0".to_string(),
        ..DiagnosticsConfig::default()
    }))
}

async fn bound_addr(server: &DiagnosticsServer) -> SocketAddr {
    for _ in 0..200 {
        if let Some(addr) = server.local_addr() {
            return addr;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("diagnostics server never bound");
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn probes_follow_pool_readiness() {
    let diagnostics = local_diagnostics();
    let log = EventLog::new();
    let pool = Pool::new(
        &test_config(Duration::from_secs(5)),
        vec![
            Item::new("diagnostics", diagnostics.clone()),
            Item::new("worker", MockServer::new("worker", &log).build()),
        ],
    );

    let (_signals, _errors) = pool.start().unwrap();
    let addr = bound_addr(&diagnostics).await;
    assert_eq!(diagnostics.address(), addr.to_string());

    let client = client();
    let healthz = format!("http://{addr}/healthz");
    let readyz = format!("http://{addr}/readyz");

    let res = client.get(&healthz).send().await.expect("diagnostics reachable");
    assert_eq!(res.status(), 200);

    let res = client.get(&readyz).send().await.unwrap();
    assert_eq!(res.status(), 503, "not ready before Pool::ready");

    pool.ready(true);
    let res = client.get(&readyz).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let reports = pool.stop().await.unwrap();
    assert!(reports.iter().all(|r| r.outcome.is_stopped()), "{reports:?}");
    assert!(!diagnostics.is_ready());
    wait_for_state(&pool, "diagnostics", ItemState::Stopped).await;

    assert!(
        client.get(&healthz).send().await.is_err(),
        "listener should be closed after stop"
    );
}

#[tokio::test]
async fn port_conflict_surfaces_on_error_channel() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let diagnostics = Arc::new(DiagnosticsServer::new(DiagnosticsConfig {
        bind_address: taken.local_addr().unwrap().to_string(),
        ..DiagnosticsConfig::default()
    }));

    let pool = Pool::new(
        &test_config(Duration::from_secs(1)),
        vec![Item::new("diagnostics", diagnostics)],
    );
    let (_signals, mut errors) = pool.start().unwrap();

    let failure = tokio::time::timeout(Duration::from_secs(1), errors.recv())
        .await
        .expect("bind failure delivered")
        .expect("channel open");
    assert_eq!(failure.item, "diagnostics");
    assert!(failure.to_string().starts_with("diagnostics: I/O error"));

    let reports = pool.stop().await.unwrap();
    assert!(reports[0].outcome.is_stopped());
}
