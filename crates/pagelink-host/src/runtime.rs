//! Host runtime: the single task that owns the document.
//!
//! Calls and embedder mutations arrive over a command queue and run one at a
//! time against the [`HostContext`]. After every command the mutation queue
//! is drained; any change (re)arms the debouncer and the watcher ticks once
//! the document has been quiet for the debounce window.

use std::time::Duration;

use async_trait::async_trait;
use pagelink_channel::RequestHandler;
use pagelink_dom::Document;
use pagelink_protocols::HostCall;
use pagelink_watcher::Debouncer;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::context::{Dispatch, HostContext};
use crate::error::HostError;
use crate::fetch::Fetcher;

type Mutation = Box<dyn FnOnce(&mut Document) + Send>;

enum Command {
    Call {
        call: HostCall,
        reply: oneshot::Sender<Result<Value, HostError>>,
    },
    Mutate(Mutation),
    Shutdown,
}

/// Handle to a running host runtime. Cheap to clone.
#[derive(Clone)]
pub struct HostHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl HostHandle {
    /// Execute one call and wait for its result.
    pub async fn call(&self, call: HostCall) -> Result<Value, HostError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Call { call, reply })
            .map_err(|_| HostError::Stopped)?;
        rx.await.map_err(|_| HostError::Stopped)?
    }

    /// Run `f` against the live document, as the page itself would.
    pub async fn mutate<F, R>(&self, f: F) -> Result<R, HostError>
    where
        F: FnOnce(&mut Document) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mutation: Mutation = Box::new(move |doc| {
            let _ = tx.send(f(doc));
        });
        self.commands
            .send(Command::Mutate(mutation))
            .map_err(|_| HostError::Stopped)?;
        rx.await.map_err(|_| HostError::Stopped)
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

#[async_trait]
impl RequestHandler for HostHandle {
    async fn handle(&self, function: &str, args: Value) -> Result<Value, String> {
        let call = HostCall::from_request(function, args)
            .map_err(|e| format!("Invalid call '{}': {}", function, e))?;
        self.call(call).await.map_err(|e| e.to_string())
    }
}

pub struct HostRuntime {
    context: HostContext,
    fetcher: Fetcher,
    debouncer: Debouncer,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl HostRuntime {
    /// Start the runtime task.
    pub fn spawn(
        context: HostContext,
        fetcher: Fetcher,
        debounce: Duration,
    ) -> (HostHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Self {
            context,
            fetcher,
            debouncer: Debouncer::new(debounce),
            commands: rx,
        };
        let task = tokio::spawn(runtime.run());
        (HostHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        info!(
            "Host runtime started for {} (debounce {:?})",
            self.context.document().url(),
            self.debouncer.window()
        );
        // Changes made before startup still reach subscriptions.
        if self.context.observe() {
            self.debouncer.trigger();
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Call { call, reply }) => self.handle_call(call, reply),
                    Some(Command::Mutate(mutation)) => mutation(self.context.document_mut()),
                    Some(Command::Shutdown) | None => break,
                },
                _ = self.debouncer.wait() => {
                    self.debouncer.reset();
                    let report = self.context.tick();
                    trace!(
                        "tick: {} notified, {} handlers bound",
                        report.notified.len(),
                        report.handlers_bound
                    );
                }
            }

            if self.context.observe() {
                self.debouncer.trigger();
            }
        }
        info!("Host runtime stopped");
    }

    fn handle_call(&mut self, call: HostCall, reply: oneshot::Sender<Result<Value, HostError>>) {
        match self.context.dispatch(call) {
            Ok(Dispatch::Done(value)) => {
                let _ = reply.send(Ok(value));
            }
            Ok(Dispatch::Fetch(prepared)) => {
                let fetcher = self.fetcher.clone();
                tokio::spawn(async move {
                    let result = fetcher.execute(prepared).await.and_then(|response| {
                        serde_json::to_value(response).map_err(HostError::from)
                    });
                    let _ = reply.send(result);
                });
            }
            Err(e) => {
                debug!("call failed: {}", e);
                let _ = reply.send(Err(e));
            }
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
