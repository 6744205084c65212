//! Frame transports.
//!
//! A transport moves serialized frames (one JSON document per message)
//! between two contexts. It knows nothing about requests or pushes; that is
//! the endpoint's job.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::ChannelError;

/// Sending half of a transport.
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    async fn send(&self, frame: String) -> Result<(), ChannelError>;

    /// Tear the link down so the peer observes end-of-stream.
    fn close(&self) {}
}

/// Receiving half of a transport. `None` means the peer is gone.
#[async_trait]
pub trait FrameSource: Send + 'static {
    async fn recv(&mut self) -> Option<String>;
}

/// Both halves of one side of a link.
pub struct Transport {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

impl Transport {
    pub fn new(sink: impl FrameSink, source: impl FrameSource) -> Self {
        Self {
            sink: Box::new(sink),
            source: Box::new(source),
        }
    }

    /// Two connected in-process transports.
    pub fn memory_pair() -> (Transport, Transport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let a = Transport::new(MemorySink::new(a_tx), MemorySource { rx: b_rx });
        let b = Transport::new(MemorySink::new(b_tx), MemorySource { rx: a_rx });
        (a, b)
    }

    /// Newline-delimited JSON over any async byte stream pair.
    pub fn json_lines<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Transport::new(
            JsonLinesSink {
                writer: tokio::sync::Mutex::new(Some(writer)),
            },
            JsonLinesSource {
                lines: BufReader::new(reader).lines(),
            },
        )
    }
}

struct MemorySink {
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl MemorySink {
    fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&self, frame: String) -> Result<(), ChannelError> {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.send(frame).map_err(|_| ChannelError::Disconnected),
            None => Err(ChannelError::Disconnected),
        }
    }

    fn close(&self) {
        self.tx.lock().take();
    }
}

struct MemorySource {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

struct JsonLinesSink<W> {
    writer: tokio::sync::Mutex<Option<W>>,
}

#[async_trait]
impl<W> FrameSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, frame: String) -> Result<(), ChannelError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ChannelError::Disconnected)?;
        let mut line = frame.into_bytes();
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    fn close(&self) {
        // A send in progress keeps the writer; it is dropped with the sink.
        if let Ok(mut guard) = self.writer.try_lock() {
            guard.take();
        }
    }
}

struct JsonLinesSource<R> {
    lines: Lines<BufReader<R>>,
}

#[async_trait]
impl<R> FrameSource for JsonLinesSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Option<String> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some(line),
                Ok(None) => return None,
                Err(e) => {
                    warn!("Transport read error: {}", e);
                    return None;
                }
            }
        }
    }
}
