//! Coordinator wiring: config-driven timeouts, relay queue limits and peer
//! instances answering relayed calls.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pagelink_channel::{ChannelEndpoint, ChannelError, HostClient, Transport};
use pagelink_config::Config;
use pagelink_dom::Document;
use pagelink_host::{Coordinator, HostServer};
use pagelink_protocols::{Query, Selector};
use serde_json::{Value, json};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(2);

fn config() -> Config {
    let mut config = Config::default();
    config.watcher.debounce_ms = 20;
    config.relay.poll_interval_ms = 10;
    config
}

fn host(config: &Config, url: &str, transport: Transport) -> HostServer {
    let document = Document::parse_html("<ul><li>one</li><li>two</li></ul>", url).unwrap();
    pagelink_host::serve(config, document, transport).unwrap()
}

/// UI client <-> coordinator <-> host at `url`.
fn start(config: &Config, url: &str) -> (HostServer, Coordinator, HostClient) {
    let (host_side, coordinator_host_side) = Transport::memory_pair();
    let (front_side, ui_side) = Transport::memory_pair();
    let host = host(config, url, host_side);
    let coordinator = Coordinator::start(config, coordinator_host_side, front_side);
    let ui = HostClient::new(Arc::new(ChannelEndpoint::connect("ui", ui_side)));
    (host, coordinator, ui)
}

#[tokio::test]
async fn test_calls_and_pushes_pass_through() {
    let config = config();
    let (_host, _coordinator, ui) = start(&config, "https://main.test/");
    assert_eq!(ui.location().await.unwrap(), "https://main.test/");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut map = BTreeMap::new();
    map.insert("items".to_string(), Query::new(Selector::rule("li")));
    let id = ui
        .register_query_map(map, move |push| {
            let _ = tx.send(push);
        })
        .await
        .unwrap();

    let push = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(push.id, id);
    assert_eq!(push.elements["items"].len(), 2);
}

#[tokio::test]
async fn test_configured_timeout_applies_to_host_calls() {
    let mut config = config();
    config.channel.request_timeout_ms = Some(50);

    // A host link whose far end never answers.
    let (_silent, coordinator_host_side) = Transport::memory_pair();
    let (front_side, ui_side) = Transport::memory_pair();
    let _coordinator = Coordinator::start(&config, coordinator_host_side, front_side);
    let ui = HostClient::new(Arc::new(ChannelEndpoint::connect("ui", ui_side)));

    match tokio::time::timeout(WAIT, ui.location()).await.unwrap() {
        Err(ChannelError::Remote(message)) => {
            assert_eq!(message, "Request 'getLocation' timed out after 50ms")
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_relay_queue_limit_comes_from_config() {
    let mut config = config();
    config.relay.max_queue = 1;
    let (_host, coordinator, ui) = start(&config, "https://main.test/");
    let front = ui.endpoint().clone();

    let first = {
        let front = front.clone();
        tokio::spawn(async move {
            front
                .call("forwardToPeer", json!({"peer": "west", "fn": "getLocation"}))
                .await
        })
    };
    tokio::time::timeout(WAIT, async {
        while coordinator.relay().queued("west") == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let err = front
        .call("forwardToPeer", json!({"peer": "west", "fn": "getLocation"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::Remote(ref m) if m == "Peer 'west' queue is full"));
    first.abort();
}

#[tokio::test]
async fn test_peer_instance_answers_relayed_calls() {
    let config = config();
    let (_host, coordinator, ui) = start(&config, "https://main.test/");

    let (peer_side, coordinator_peer_side) = Transport::memory_pair();
    let peer = host(&config, "https://peer.test/", peer_side);
    let _accepted = coordinator.accept("coordinator-peer", coordinator_peer_side);
    let _agent = peer.join_relay("west", &config.relay);

    let location = tokio::time::timeout(
        WAIT,
        ui.endpoint()
            .call("forwardToPeer", json!({"peer": "west", "fn": "getLocation"})),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(location, json!("https://peer.test/"));

    let err = ui
        .endpoint()
        .call(
            "forwardToPeer",
            json!({"peer": "west", "fn": "click", "args": {"selector": {"addressing": "RULE", "pattern": "#none"}}}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::Remote(ref m) if m == "No element matches '#none'"));

    // The local host is untouched by relayed traffic.
    assert_eq!(ui.location().await.unwrap(), "https://main.test/");
    assert_eq!(coordinator.relay().waiting_count(), 0);
    peer.shutdown().await;
    assert_eq!(
        ui.endpoint().call("getLocation", Value::Null).await.unwrap(),
        json!("https://main.test/")
    );
}
