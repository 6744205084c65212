//! # pagelink protocols
//!
//! Serializable types exchanged between the document-access context, the
//! sandboxed UI surface and the coordinating process. Contains only data
//! definitions - no behaviour beyond encoding helpers.
//!
//! ## Contents
//!
//! - [`Selector`], [`Query`], [`QueryMap`] - declarative element queries
//! - [`ElementSnapshot`], [`QueryMapResult`] - evaluation results
//! - [`HostCall`] - every remotely callable host operation
//! - [`Frame`] - request / response / push envelope on the wire
//! - [`ActionRegistry`] - explicit action metadata table

mod action;
mod call;
mod frame;
mod ids;
mod query;
mod selector;
mod snapshot;

pub use action::{ActionMetadata, ActionRegistry};
pub use call::{
    CsrfForwarding, FetchRequest, FetchResponse, FunctionInfo, HostCall, ScreenshotData,
};
pub use frame::{Frame, NativeEventPush, PushKey, PushMessage, SubscriptionPush};
pub use ids::{ListenerId, SubscriptionId};
pub use query::{ATTR_ALL, ATTR_NODE, ATTR_STYLE, ATTR_TEXT, Query, QueryMap};
pub use selector::{Addressing, Range, Selector};
pub use snapshot::{Coords, ElementSnapshot, QueryMapResult};
