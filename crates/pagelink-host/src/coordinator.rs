//! The coordinator between UI surfaces and the host document.
//!
//! Every connection the coordinator accepts is served by a [`RelayService`]
//! over the host link: relay functions are answered from the shared
//! [`PeerRelay`], everything else is forwarded to the host. Host pushes are
//! relayed to the front connection.

use std::sync::Arc;
use std::time::Duration;

use pagelink_channel::{ChannelEndpoint, PeerRelay, RelayService, Transport};
use pagelink_config::Config;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Coordinator {
    host: Arc<ChannelEndpoint>,
    front: Arc<ChannelEndpoint>,
    relay: Arc<PeerRelay>,
    request_timeout: Option<Duration>,
    push_relay: JoinHandle<()>,
}

impl Coordinator {
    /// Link to the host over `host` and serve the UI surface over `front`.
    pub fn start(config: &Config, host: Transport, front: Transport) -> Self {
        let request_timeout = config.channel.request_timeout_ms.map(Duration::from_millis);
        let host = Arc::new(
            ChannelEndpoint::connect("coordinator-host", host).with_request_timeout(request_timeout),
        );
        let relay = Arc::new(PeerRelay::new(config.relay.max_queue));
        let front = Arc::new(serve_relay(
            "coordinator",
            front,
            &relay,
            &host,
            request_timeout,
        ));
        let push_relay = host.forward_pushes_to(front.clone());

        info!(
            "Coordinator started (relay queue {}, request timeout {:?})",
            config.relay.max_queue, request_timeout
        );
        Self {
            host,
            front,
            relay,
            request_timeout,
            push_relay,
        }
    }

    /// Serve another connection, typically a peer instance polling the relay.
    pub fn accept(&self, name: impl Into<String>, transport: Transport) -> Arc<ChannelEndpoint> {
        Arc::new(serve_relay(
            name,
            transport,
            &self.relay,
            &self.host,
            self.request_timeout,
        ))
    }

    pub fn host(&self) -> &Arc<ChannelEndpoint> {
        &self.host
    }

    pub fn front(&self) -> &Arc<ChannelEndpoint> {
        &self.front
    }

    pub fn relay(&self) -> &Arc<PeerRelay> {
        &self.relay
    }

    /// Resolves when either the host or the front link goes down.
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.host.closed() => {}
            _ = self.front.closed() => {}
        }
    }

    pub fn shutdown(self) {
        self.push_relay.abort();
        self.front.close();
        self.host.close();
        info!("Coordinator stopped");
    }
}

fn serve_relay(
    name: impl Into<String>,
    transport: Transport,
    relay: &Arc<PeerRelay>,
    host: &Arc<ChannelEndpoint>,
    request_timeout: Option<Duration>,
) -> ChannelEndpoint {
    let service = RelayService::new(relay.clone(), host.clone());
    ChannelEndpoint::serve(name, transport, Arc::new(service)).with_request_timeout(request_timeout)
}
