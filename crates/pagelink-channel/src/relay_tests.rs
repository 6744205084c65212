use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::*;
use crate::transport::Transport;

/// Stands in for a peer instance's local dispatch table.
struct PeerHandler {
    location: &'static str,
}

#[async_trait]
impl RequestHandler for PeerHandler {
    async fn handle(&self, function: &str, _args: Value) -> Result<Value, String> {
        match function {
            "getLocation" => Ok(json!(self.location)),
            other => Err(format!("Unknown function '{}'", other)),
        }
    }
}

/// The coordinator's own functions.
struct CoordinatorHandler;

#[async_trait]
impl RequestHandler for CoordinatorHandler {
    async fn handle(&self, function: &str, _args: Value) -> Result<Value, String> {
        match function {
            "ping" => Ok(json!("pong")),
            other => Err(format!("Unknown function '{}'", other)),
        }
    }
}

#[tokio::test]
async fn test_forward_poll_reply() {
    let relay = Arc::new(PeerRelay::new(8));

    let forward = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.forward("tab-2", "getLocation", Value::Null).await })
    };
    while relay.queued("tab-2") == 0 {
        tokio::task::yield_now().await;
    }

    let requests = relay.poll("tab-2");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].function, "getLocation");
    assert_eq!(relay.queued("tab-2"), 0);

    assert!(relay.reply(requests[0].relay_id, Ok(json!("https://b.test/"))));
    assert_eq!(forward.await.unwrap(), Ok(json!("https://b.test/")));
    assert_eq!(relay.waiting_count(), 0);
}

#[tokio::test]
async fn test_full_queue_rejects() {
    let relay = Arc::new(PeerRelay::new(1));
    let first = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.forward("tab", "a", Value::Null).await })
    };
    while relay.queued("tab") == 0 {
        tokio::task::yield_now().await;
    }

    let second = relay.forward("tab", "b", Value::Null).await;
    assert_eq!(second, Err("Peer 'tab' queue is full".to_string()));

    first.abort();
}

#[tokio::test]
async fn test_reply_to_unknown_relay() {
    let relay = PeerRelay::new(4);
    assert!(!relay.reply(42, Ok(Value::Null)));
}

#[tokio::test]
async fn test_abandoned_forward_is_withdrawn() {
    let relay = PeerRelay::new(4);
    let result = tokio::time::timeout(
        Duration::from_millis(10),
        relay.forward("tab", "getLocation", Value::Null),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(relay.queued("tab"), 0);
    assert_eq!(relay.waiting_count(), 0);
}

#[tokio::test]
async fn test_relayed_request_wire_format() {
    let request = RelayedRequest {
        relay_id: 3,
        function: "click".to_string(),
        args: json!({"selector": {"pattern": "a", "addressing": "RULE"}}),
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["relayId"], json!(3));
    assert_eq!(value["fn"], json!("click"));
}

#[tokio::test]
async fn test_service_passes_through_other_functions() {
    let service = RelayService::new(Arc::new(PeerRelay::new(4)), CoordinatorHandler);
    assert_eq!(service.handle("ping", Value::Null).await, Ok(json!("pong")));
    assert_eq!(
        service.handle(REPLY_TO_PEER, json!({"relayId": 9})).await,
        Ok(json!(false))
    );
    assert!(service.handle(FORWARD_TO_PEER, json!({})).await.is_err());
}

#[tokio::test]
async fn test_relay_round_trip_through_coordinator() {
    let relay = Arc::new(PeerRelay::new(16));

    // ui <-> coordinator
    let (ui_side, coord_ui_side) = Transport::memory_pair();
    let _coord_ui = ChannelEndpoint::serve(
        "coordinator-ui",
        coord_ui_side,
        Arc::new(RelayService::new(relay.clone(), CoordinatorHandler)),
    );
    let ui = ChannelEndpoint::connect("ui", ui_side);

    // peer <-> coordinator
    let (peer_side, coord_peer_side) = Transport::memory_pair();
    let _coord_peer = ChannelEndpoint::serve(
        "coordinator-peer",
        coord_peer_side,
        Arc::new(RelayService::new(relay.clone(), CoordinatorHandler)),
    );
    let peer = Arc::new(ChannelEndpoint::connect("peer", peer_side));

    let shutdown = CancellationToken::new();
    let agent = PeerAgent::new(
        "tab-2",
        peer,
        Arc::new(PeerHandler {
            location: "https://other.test/inbox",
        }),
        Duration::from_millis(5),
    )
    .spawn(shutdown.clone());

    let payload = ui
        .call(FORWARD_TO_PEER, json!({"peer": "tab-2", "fn": "getLocation"}))
        .await
        .unwrap();
    assert_eq!(payload, json!("https://other.test/inbox"));

    match ui
        .call(FORWARD_TO_PEER, json!({"peer": "tab-2", "fn": "explode"}))
        .await
    {
        Err(ChannelError::Remote(message)) => assert_eq!(message, "Unknown function 'explode'"),
        other => panic!("expected remote error, got {:?}", other),
    }

    // Local functions still reach the coordinator's own handler.
    assert_eq!(ui.call("ping", Value::Null).await.unwrap(), json!("pong"));

    shutdown.cancel();
    agent.await.unwrap();
}

/// Coordinator that hands out two requests and rejects the first reply.
#[derive(Default)]
struct FlakyCoordinator {
    replies: Mutex<Vec<u64>>,
}

#[async_trait]
impl RequestHandler for FlakyCoordinator {
    async fn handle(&self, function: &str, args: Value) -> Result<Value, String> {
        match function {
            POLL_PEER_MESSAGES => Ok(json!([
                {"relayId": 1, "fn": "getLocation"},
                {"relayId": 2, "fn": "getLocation"},
            ])),
            REPLY_TO_PEER => {
                let relay_id = args["relayId"].as_u64().unwrap_or_default();
                self.replies.lock().push(relay_id);
                if relay_id == 1 {
                    Err("reply rejected".to_string())
                } else {
                    Ok(json!(true))
                }
            }
            other => Err(format!("Unknown function '{}'", other)),
        }
    }
}

#[tokio::test]
async fn test_failed_reply_does_not_skip_rest_of_batch() {
    let coordinator = Arc::new(FlakyCoordinator::default());
    let (peer_side, coordinator_side) = Transport::memory_pair();
    let _served = ChannelEndpoint::serve("coordinator", coordinator_side, coordinator.clone());
    let agent = PeerAgent::new(
        "tab-2",
        Arc::new(ChannelEndpoint::connect("tab-2", peer_side)),
        Arc::new(PeerHandler {
            location: "https://b.test/",
        }),
        Duration::from_millis(10),
    );

    let err = agent.poll_once().await.unwrap_err();
    assert!(matches!(err, ChannelError::Remote(ref m) if m == "reply rejected"));
    assert_eq!(*coordinator.replies.lock(), vec![1, 2]);
}
