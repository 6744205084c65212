//! Store-and-forward relay between named peer instances.
//!
//! The coordinator owns a [`PeerRelay`]. A caller forwards a request to a
//! named peer; the request waits in that peer's queue until the peer polls,
//! and the peer's reply is handed back to the forwarding caller.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::endpoint::ChannelEndpoint;
use crate::error::ChannelError;
use crate::handler::RequestHandler;

pub const FORWARD_TO_PEER: &str = "forwardToPeer";
pub const POLL_PEER_MESSAGES: &str = "pollPeerMessages";
pub const REPLY_TO_PEER: &str = "replyToPeer";

/// A request waiting for a peer to pick it up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedRequest {
    pub relay_id: u64,
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Deserialize)]
struct ForwardArgs {
    peer: String,
    #[serde(rename = "fn")]
    function: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
struct PollArgs {
    peer: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyArgs {
    relay_id: u64,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Default)]
struct RelayState {
    queues: HashMap<String, VecDeque<RelayedRequest>>,
    waiting: HashMap<u64, oneshot::Sender<Result<Value, String>>>,
}

/// Per-peer queues plus the forwarders waiting on replies.
pub struct PeerRelay {
    max_queue: usize,
    next_id: AtomicU64,
    state: Mutex<RelayState>,
}

/// Withdraws a forwarded request when its forwarder stops waiting.
struct ForwardGuard<'a> {
    relay: &'a PeerRelay,
    peer: String,
    relay_id: u64,
}

impl Drop for ForwardGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.relay.state.lock();
        state.waiting.remove(&self.relay_id);
        if let Some(queue) = state.queues.get_mut(&self.peer) {
            queue.retain(|req| req.relay_id != self.relay_id);
            if queue.is_empty() {
                state.queues.remove(&self.peer);
            }
        }
    }
}

impl PeerRelay {
    pub fn new(max_queue: usize) -> Self {
        Self {
            max_queue,
            next_id: AtomicU64::new(1),
            state: Mutex::new(RelayState::default()),
        }
    }

    /// Queue a request for `peer` and wait for the peer's reply.
    pub async fn forward(&self, peer: &str, function: &str, args: Value) -> Result<Value, String> {
        let relay_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            let queue = state.queues.entry(peer.to_string()).or_default();
            if queue.len() >= self.max_queue {
                warn!("Relay queue for peer '{}' is full", peer);
                return Err(format!("Peer '{}' queue is full", peer));
            }
            queue.push_back(RelayedRequest {
                relay_id,
                function: function.to_string(),
                args,
            });
            state.waiting.insert(relay_id, tx);
        }
        let _guard = ForwardGuard {
            relay: self,
            peer: peer.to_string(),
            relay_id,
        };
        debug!("Queued relay {} '{}' for peer '{}'", relay_id, function, peer);

        rx.await
            .unwrap_or_else(|_| Err(format!("Relay {} abandoned", relay_id)))
    }

    /// Take every request queued for `peer`.
    pub fn poll(&self, peer: &str) -> Vec<RelayedRequest> {
        self.state
            .lock()
            .queues
            .remove(peer)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Resolve a forwarded request. `false` if nobody is waiting for it.
    pub fn reply(&self, relay_id: u64, outcome: Result<Value, String>) -> bool {
        let waiter = self.state.lock().waiting.remove(&relay_id);
        match waiter {
            Some(tx) => tx.send(outcome).is_ok(),
            None => {
                debug!("Reply for unknown relay {}", relay_id);
                false
            }
        }
    }

    pub fn queued(&self, peer: &str) -> usize {
        self.state.lock().queues.get(peer).map_or(0, VecDeque::len)
    }

    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiting.len()
    }
}

/// Serves the relay functions and passes everything else to `inner`.
pub struct RelayService<H> {
    relay: Arc<PeerRelay>,
    inner: H,
}

impl<H: RequestHandler> RelayService<H> {
    pub fn new(relay: Arc<PeerRelay>, inner: H) -> Self {
        Self { relay, inner }
    }

    pub fn relay(&self) -> &Arc<PeerRelay> {
        &self.relay
    }
}

fn decode<T: serde::de::DeserializeOwned>(function: &str, args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("Invalid arguments for '{}': {}", function, e))
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for RelayService<H> {
    async fn handle(&self, function: &str, args: Value) -> Result<Value, String> {
        match function {
            FORWARD_TO_PEER => {
                let forward: ForwardArgs = decode(function, args)?;
                self.relay
                    .forward(&forward.peer, &forward.function, forward.args)
                    .await
            }
            POLL_PEER_MESSAGES => {
                let poll: PollArgs = decode(function, args)?;
                let messages = self.relay.poll(&poll.peer);
                serde_json::to_value(messages).map_err(|e| e.to_string())
            }
            REPLY_TO_PEER => {
                let reply: ReplyArgs = decode(function, args)?;
                let outcome = match reply.error {
                    Some(error) => Err(error),
                    None => Ok(reply.payload.unwrap_or(Value::Null)),
                };
                Ok(Value::Bool(self.relay.reply(reply.relay_id, outcome)))
            }
            _ => self.inner.handle(function, args).await,
        }
    }
}

/// Runs inside a peer instance: polls the coordinator for relayed requests
/// and answers them with a local handler.
pub struct PeerAgent {
    peer: String,
    coordinator: Arc<ChannelEndpoint>,
    handler: Arc<dyn RequestHandler>,
    poll_interval: Duration,
}

impl PeerAgent {
    pub fn new(
        peer: impl Into<String>,
        coordinator: Arc<ChannelEndpoint>,
        handler: Arc<dyn RequestHandler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            peer: peer.into(),
            coordinator,
            handler,
            poll_interval,
        }
    }

    /// Poll once and answer everything received. Returns how many requests
    /// were handled. Every drained request gets a reply attempt; the first
    /// failed reply is reported afterwards.
    pub async fn poll_once(&self) -> Result<usize, ChannelError> {
        let messages = self
            .coordinator
            .call(POLL_PEER_MESSAGES, json!({ "peer": self.peer }))
            .await?;
        let requests: Vec<RelayedRequest> = serde_json::from_value(messages)?;

        let mut first_error = None;
        for request in &requests {
            debug!(
                "Peer '{}' handling relay {} '{}'",
                self.peer, request.relay_id, request.function
            );
            let reply = match self
                .handler
                .handle(&request.function, request.args.clone())
                .await
            {
                Ok(payload) => json!({ "relayId": request.relay_id, "payload": payload }),
                Err(error) => json!({ "relayId": request.relay_id, "error": error }),
            };
            if let Err(e) = self.coordinator.call(REPLY_TO_PEER, reply).await {
                warn!(
                    "Peer '{}' failed to reply to relay {}: {}",
                    self.peer, request.relay_id, e
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(requests.len()),
        }
    }

    /// Poll until `shutdown` fires or the coordinator goes away.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Peer agent '{}' started", self.peer);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.poll_once().await {
                Ok(_) => {}
                Err(ChannelError::Disconnected) => {
                    warn!("Peer agent '{}': coordinator disconnected", self.peer);
                    break;
                }
                Err(e) => warn!("Peer agent '{}' poll failed: {}", self.peer, e),
            }
        }
        info!("Peer agent '{}' stopped", self.peer);
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
