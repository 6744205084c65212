//! pagelink host - the document-access context
//!
//! [`HostContext`] owns the live document together with the mutation
//! watcher, the highlight overlay and the clipboard / capture backends, and
//! executes [`HostCall`]s against it with one `match`.
//!
//! [`HostRuntime`] runs a context on a single task: commands are processed
//! one at a time, so no two evaluations ever touch the document
//! concurrently. The only suspension points are the command queue, the
//! debounce timer and outbound fetches, which run on their own tasks.
//!
//! [`serve`] connects a runtime to a [`ChannelEndpoint`] and pumps watcher
//! pushes onto it. [`Coordinator`] sits between UI surfaces and a served
//! host and owns the peer relay.
//!
//! [`HostCall`]: pagelink_protocols::HostCall
//! [`ChannelEndpoint`]: pagelink_channel::ChannelEndpoint

mod actions;
mod capture;
mod clipboard;
mod context;
mod coordinator;
mod error;
mod fetch;
mod highlight;
mod runtime;
mod serve;

pub use capture::{ScreenCapture, WireframeCapture};
#[cfg(feature = "system-clipboard")]
pub use clipboard::SystemClipboard;
pub use clipboard::{ClipboardBackend, MemoryClipboard};
pub use context::{Dispatch, HostContext};
pub use coordinator::Coordinator;
pub use error::HostError;
pub use fetch::{Fetcher, PreparedFetch};
pub use highlight::{Highlight, HighlightLayer};
pub use runtime::{HostHandle, HostRuntime};
pub use serve::{HostServer, serve, serve_with};
