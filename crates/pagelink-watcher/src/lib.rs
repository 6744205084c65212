//! pagelink watcher - change detection over the host document
//!
//! [`MutationWatcher`] owns the registered query-map subscriptions and the
//! [`EventBridge`]. Each tick re-evaluates every live subscription in
//! ascending id order, pushes a notification only when the result differs
//! from the last delivered one, then re-applies native event listeners to
//! newly matched elements.
//!
//! The watcher never schedules itself: whoever owns the document feeds
//! mutation batches into a [`Debouncer`] and calls [`MutationWatcher::tick`]
//! once the burst settles.

mod arena;
mod bridge;
mod debounce;
mod watcher;

use pagelink_protocols::PushMessage;
use tokio::sync::mpsc;

pub use arena::SlotArena;
pub use bridge::EventBridge;
pub use debounce::Debouncer;
pub use watcher::{MutationWatcher, Subscription, TickReport};

/// Outbound side of the push channel.
pub type PushSink = mpsc::UnboundedSender<PushMessage>;
