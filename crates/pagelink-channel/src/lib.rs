//! pagelink channel - cross-context messaging
//!
//! Execution contexts share no memory; they exchange JSON [`Frame`]s over a
//! [`Transport`]. A [`ChannelEndpoint`] sits on each side of a transport and
//! provides:
//!
//! - request/response correlation: every request gets exactly one response,
//!   delivered to the caller that issued it, however many calls are in flight
//! - dispatch of incoming requests to a [`RequestHandler`]
//! - the push side-channel, fanned in to a [`PushListeners`] table
//!
//! Calls have no default timeout. Callers that need a bound pass a
//! `CancellationToken` or configure a timeout explicitly; a torn-down
//! transport fails every in-flight call with [`ChannelError::Disconnected`].
//!
//! [`Frame`]: pagelink_protocols::Frame

mod client;
mod endpoint;
mod error;
mod handler;
mod push;
mod relay;
mod transport;

pub use client::HostClient;
pub use endpoint::ChannelEndpoint;
pub use error::ChannelError;
pub use handler::RequestHandler;
pub use push::{NativeEventCallback, PushListeners, SubscriptionCallback};
pub use relay::{
    FORWARD_TO_PEER, POLL_PEER_MESSAGES, PeerAgent, PeerRelay, REPLY_TO_PEER, RelayService,
    RelayedRequest,
};
pub use tokio_util::sync::CancellationToken;
pub use transport::{FrameSink, FrameSource, Transport};
