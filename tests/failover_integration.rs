//! Failover tests: one-shot retry, eviction, sticky overwrite.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use room_gateway::discovery::{Discovery, Node};

mod common;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_forwarding_error_fails_over_to_survivor() {
    // nothing listens on P1's port
    let dead_addr: SocketAddr = "127.0.0.1:28501".parse().unwrap();
    let live_addr: SocketAddr = "127.0.0.1:28502".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28503".parse().unwrap();

    common::start_mock_backend(live_addr, "P2").await;

    let fleet = vec![
        Node::new("P1", dead_addr.to_string()),
        Node::new("P2", live_addr.to_string()),
    ];
    let (discovery, _events, shutdown) = common::spawn_gateway(proxy_addr, fleet).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // rotation picks the dead P1 first; the retry must land on P2
    let res = client()
        .get(format!("http://{}", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "P2");

    // eviction is asynchronous, best-effort
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(discovery.evicted(), vec!["P1".to_string()]);

    // with P1 gone, traffic flows without retries
    for _ in 0..3 {
        let res = client()
            .get(format!("http://{}", proxy_addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.text().await.unwrap(), "P2");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_failover_overwrites_sticky_mapping() {
    let dead_addr: SocketAddr = "127.0.0.1:28511".parse().unwrap();
    let live_addr: SocketAddr = "127.0.0.1:28512".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28513".parse().unwrap();

    common::start_mock_backend(live_addr, "P2").await;

    let fleet = vec![
        Node::new("P1", dead_addr.to_string()),
        Node::new("P2", live_addr.to_string()),
    ];
    let (discovery, _events, shutdown) = common::spawn_gateway(proxy_addr, fleet).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // the session is first assigned to the dead P1; the failed forward
    // unregisters it locally, and the retry re-resolves: the sticky target
    // is now stale, so rotation picks P2 and the mapping is overwritten
    let res = client()
        .get(format!("http://{}/abc123/game?join=1", proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "P2");
    assert_eq!(discovery.sticky_of("abc123").as_deref(), Some("P2"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_retry_is_bounded_to_one_hop() {
    let dead1_addr: SocketAddr = "127.0.0.1:28521".parse().unwrap();
    let dead2_addr: SocketAddr = "127.0.0.1:28522".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28523".parse().unwrap();

    let fleet = vec![
        Node::new("P1", dead1_addr.to_string()),
        Node::new("P2", dead2_addr.to_string()),
    ];
    let (discovery, _events, shutdown) = common::spawn_gateway(proxy_addr, fleet).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // both backends are dead: the original attempt and the single retry
    // fail, and the error surfaces instead of walking the fleet further
    let res = client()
        .get(format!("http://{}", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let evicted = discovery.evicted();
    assert_eq!(evicted.len(), 2, "both failed backends are evicted: {evicted:?}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_evict_is_idempotent() {
    let discovery = common::StaticDiscovery::new(vec![Node::new("P1", "10.0.0.1:2567")]);
    let node = Node::new("P1", "10.0.0.1:2567");

    discovery.evict(&node).await.unwrap();
    assert!(discovery.list_members().await.unwrap().is_empty());

    // evicting an already-absent node is a no-op, not an error
    discovery.evict(&node).await.unwrap();
    assert!(discovery.list_members().await.unwrap().is_empty());
}
