//! Wiring a host runtime to a channel endpoint.

use std::sync::Arc;
use std::time::Duration;

use pagelink_channel::{CancellationToken, ChannelEndpoint, PeerAgent, Transport};
use pagelink_config::{Config, RelayConfig};
use pagelink_dom::Document;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::context::HostContext;
use crate::error::HostError;
use crate::fetch::Fetcher;
use crate::runtime::{HostHandle, HostRuntime};

/// A document served over a transport.
pub struct HostServer {
    handle: HostHandle,
    endpoint: Arc<ChannelEndpoint>,
    runtime: JoinHandle<()>,
    pump: JoinHandle<()>,
    agent_shutdown: CancellationToken,
}

impl HostServer {
    pub fn handle(&self) -> &HostHandle {
        &self.handle
    }

    pub fn endpoint(&self) -> &Arc<ChannelEndpoint> {
        &self.endpoint
    }

    /// Resolves when the peer disconnects.
    pub async fn closed(&self) {
        self.endpoint.closed().await
    }

    /// Answer relayed requests addressed to `peer`, polling the other end
    /// of this server's link every `relay.poll_interval_ms`.
    pub fn join_relay(&self, peer: impl Into<String>, relay: &RelayConfig) -> JoinHandle<()> {
        let peer = peer.into();
        info!("Joining relay as peer '{}'", peer);
        PeerAgent::new(
            peer,
            self.endpoint.clone(),
            Arc::new(self.handle.clone()),
            Duration::from_millis(relay.poll_interval_ms),
        )
        .spawn(self.agent_shutdown.child_token())
    }

    pub async fn shutdown(self) {
        self.agent_shutdown.cancel();
        self.handle.shutdown();
        self.endpoint.close();
        let _ = self.runtime.await;
        self.pump.abort();
        info!("Host server stopped");
    }
}

/// Serve `document` with the default clipboard and capture backends.
pub fn serve(config: &Config, document: Document, transport: Transport) -> Result<HostServer, HostError> {
    serve_with(config, document, transport, default_backends)
}

#[cfg(feature = "system-clipboard")]
fn default_backends(context: HostContext) -> HostContext {
    match crate::clipboard::SystemClipboard::new() {
        Ok(clipboard) => context.with_clipboard(clipboard),
        Err(e) => {
            tracing::warn!("System clipboard unavailable, using in-memory clipboard: {}", e);
            context
        }
    }
}

#[cfg(not(feature = "system-clipboard"))]
fn default_backends(context: HostContext) -> HostContext {
    context
}

/// Serve `document`; `customize` may swap the context's backends.
pub fn serve_with<F>(
    config: &Config,
    mut document: Document,
    transport: Transport,
    customize: F,
) -> Result<HostServer, HostError>
where
    F: FnOnce(HostContext) -> HostContext,
{
    document.set_viewport_size(
        f64::from(config.document.viewport_width),
        f64::from(config.document.viewport_height),
    );

    let (push_tx, mut push_rx) = mpsc::unbounded_channel();
    let context = customize(HostContext::new(document, push_tx));
    let fetcher = Fetcher::new(&config.fetch)?;
    let (handle, runtime) = HostRuntime::spawn(
        context,
        fetcher,
        Duration::from_millis(config.watcher.debounce_ms),
    );

    let endpoint = Arc::new(
        ChannelEndpoint::serve("host", transport, Arc::new(handle.clone()))
            .with_request_timeout(config.channel.request_timeout_ms.map(Duration::from_millis)),
    );

    let pump = {
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            while let Some(message) = push_rx.recv().await {
                if let Err(e) = endpoint.push(message).await {
                    debug!("Push pump stopped: {}", e);
                    break;
                }
            }
        })
    };

    Ok(HostServer {
        handle,
        endpoint,
        runtime,
        pump,
        agent_shutdown: CancellationToken::new(),
    })
}
