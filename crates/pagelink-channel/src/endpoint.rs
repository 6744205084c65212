//! Request/response correlation over a transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pagelink_protocols::{Frame, PushMessage};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ChannelError;
use crate::handler::RequestHandler;
use crate::push::PushListeners;
use crate::transport::{FrameSink, FrameSource, Transport};

/// Caller waiting for the response to one request.
struct PendingRequest {
    tx: oneshot::Sender<Result<Value, ChannelError>>,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

/// Removes a pending entry when its caller stops waiting.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashMap<u64, PendingRequest>>,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// One side of a cross-context link.
///
/// Issues requests and pairs each response with the caller that sent it,
/// answers incoming requests through an optional [`RequestHandler`], and
/// routes pushes into its [`PushListeners`].
pub struct ChannelEndpoint {
    /// Name used in log lines.
    name: String,
    sink: Arc<dyn FrameSink>,
    /// Request ID counter.
    request_id: AtomicU64,
    /// Requests waiting for responses.
    pending: PendingMap,
    listeners: PushListeners,
    /// Cancelled once the link is down.
    closed: CancellationToken,
    request_timeout: Option<Duration>,
    _recv_task: JoinHandle<()>,
}

impl ChannelEndpoint {
    /// Start an endpoint that only issues requests.
    pub fn connect(name: impl Into<String>, transport: Transport) -> Self {
        Self::start(name.into(), transport, None)
    }

    /// Start an endpoint that also serves incoming requests.
    pub fn serve(
        name: impl Into<String>,
        transport: Transport,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        Self::start(name.into(), transport, Some(handler))
    }

    fn start(name: String, transport: Transport, handler: Option<Arc<dyn RequestHandler>>) -> Self {
        let Transport { sink, source } = transport;
        let sink: Arc<dyn FrameSink> = Arc::from(sink);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let listeners = PushListeners::new();
        let closed = CancellationToken::new();

        let recv_task = {
            let ctx = LoopContext {
                name: name.clone(),
                sink: sink.clone(),
                pending: pending.clone(),
                listeners: listeners.clone(),
                handler,
                closed: closed.clone(),
            };
            tokio::spawn(async move {
                ctx.receive_loop(source).await;
            })
        };

        debug!("Channel endpoint '{}' started", name);

        Self {
            name,
            sink,
            request_id: AtomicU64::new(1),
            pending,
            listeners,
            closed,
            request_timeout: None,
            _recv_task: recv_task,
        }
    }

    /// Fail calls that get no response within `timeout`.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listeners(&self) -> &PushListeners {
        &self.listeners
    }

    /// Send a request and wait for its response.
    pub async fn call(&self, function: &str, args: Value) -> Result<Value, ChannelError> {
        self.call_inner(function, args, None).await
    }

    /// Like [`call`](Self::call), but gives up with
    /// [`ChannelError::Cancelled`] once `cancel` fires.
    pub async fn call_cancellable(
        &self,
        function: &str,
        args: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ChannelError> {
        self.call_inner(function, args, Some(cancel)).await
    }

    async fn call_inner(
        &self,
        function: &str,
        args: Value,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ChannelError> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Disconnected);
        }

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };
        // The receive loop drains pending entries after cancelling the token.
        if self.closed.is_cancelled() {
            return Err(ChannelError::Disconnected);
        }

        self.send_frame(Frame::Request {
            id,
            function: function.to_string(),
            args,
        })
        .await?;

        let response = async {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Disconnected),
            }
        };
        let bounded = async {
            match self.request_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, response).await {
                    Ok(result) => result,
                    Err(_) => {
                        debug!("{}: request {} '{}' timed out", self.name, id, function);
                        Err(ChannelError::Timeout {
                            function: function.to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        })
                    }
                },
                None => response.await,
            }
        };
        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = bounded => result,
            _ = cancelled => {
                debug!("{}: request {} '{}' cancelled", self.name, id, function);
                Err(ChannelError::Cancelled)
            }
        }
    }

    /// Send an unsolicited push to the peer.
    pub async fn push(&self, message: PushMessage) -> Result<(), ChannelError> {
        let frame = message.into_frame()?;
        self.send_frame(frame).await
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), ChannelError> {
        send_frame(&*self.sink, &self.name, &frame).await
    }

    /// Relay every push this endpoint receives to `target`.
    pub fn forward_pushes_to(&self, target: Arc<ChannelEndpoint>) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.listeners.forward_to(tx);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = target.push(message).await {
                    debug!("{}: push relay stopped: {}", target.name, e);
                    break;
                }
            }
        })
    }

    /// Shut the link down; in-flight calls fail with `Disconnected`.
    pub fn close(&self) {
        self.closed.cancel();
        self.sink.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the link is down.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Drop for ChannelEndpoint {
    fn drop(&mut self) {
        self.close();
        self._recv_task.abort();
    }
}

#[async_trait]
impl RequestHandler for ChannelEndpoint {
    async fn handle(&self, function: &str, args: Value) -> Result<Value, String> {
        self.call(function, args).await.map_err(|e| match e {
            ChannelError::Remote(message) => message,
            other => other.to_string(),
        })
    }
}

async fn send_frame(sink: &dyn FrameSink, name: &str, frame: &Frame) -> Result<(), ChannelError> {
    let json = serde_json::to_string(frame)?;
    trace!("{} send: {}", name, json);
    sink.send(json).await
}

/// State shared with the background receive task.
struct LoopContext {
    name: String,
    sink: Arc<dyn FrameSink>,
    pending: PendingMap,
    listeners: PushListeners,
    handler: Option<Arc<dyn RequestHandler>>,
    closed: CancellationToken,
}

impl LoopContext {
    async fn receive_loop(self, mut source: Box<dyn FrameSource>) {
        loop {
            let text = tokio::select! {
                _ = self.closed.cancelled() => break,
                text = source.recv() => match text {
                    Some(text) => text,
                    None => {
                        debug!("{}: transport closed", self.name);
                        break;
                    }
                },
            };
            trace!("{} recv: {}", self.name, text);

            match serde_json::from_str::<Frame>(&text) {
                Ok(frame) => self.handle_frame(frame).await,
                Err(e) => warn!("{}: failed to parse frame: {}", self.name, e),
            }
        }

        self.closed.cancel();
        let orphaned: Vec<PendingRequest> =
            self.pending.lock().drain().map(|(_, req)| req).collect();
        if !orphaned.is_empty() {
            debug!("{}: failing {} in-flight requests", self.name, orphaned.len());
        }
        for req in orphaned {
            let _ = req.tx.send(Err(ChannelError::Disconnected));
        }
    }

    async fn handle_frame(&self, frame: Frame) {
        match frame {
            Frame::Response { id, payload, error } => {
                let pending_req = self.pending.lock().remove(&id);
                match pending_req {
                    Some(req) => {
                        let result = match error {
                            Some(message) => Err(ChannelError::Remote(message)),
                            None => Ok(payload.unwrap_or(Value::Null)),
                        };
                        let _ = req.tx.send(result);
                    }
                    None => debug!("{}: dropping response to unknown request {}", self.name, id),
                }
            }
            Frame::Request { id, function, args } => match &self.handler {
                Some(handler) => {
                    let handler = handler.clone();
                    let sink = self.sink.clone();
                    let name = self.name.clone();
                    tokio::spawn(async move {
                        let outcome = handler.handle(&function, args).await;
                        let response = Frame::response(id, outcome);
                        if let Err(e) = send_frame(&*sink, &name, &response).await {
                            debug!("{}: response to '{}' not delivered: {}", name, function, e);
                        }
                    });
                }
                None => {
                    let response = Frame::response(id, Err(ChannelError::NoHandler(function).to_string()));
                    if let Err(e) = send_frame(&*self.sink, &self.name, &response).await {
                        debug!("{}: error response not delivered: {}", self.name, e);
                    }
                }
            },
            Frame::Push { key, value } => self.listeners.dispatch(key, value),
        }
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
