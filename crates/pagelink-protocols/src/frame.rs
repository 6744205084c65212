//! Message envelopes crossing context boundaries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ListenerId, SubscriptionId};
use crate::snapshot::QueryMapResult;

/// One message on a transport.
///
/// Requests and responses are paired by `id`; pushes are unsolicited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Frame {
    Request {
        id: u64,
        #[serde(rename = "fn")]
        function: String,
        #[serde(default)]
        args: Value,
    },
    Response {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Push {
        key: PushKey,
        value: Value,
    },
}

impl Frame {
    /// Build the response frame for a finished request.
    pub fn response(id: u64, outcome: Result<Value, String>) -> Self {
        match outcome {
            Ok(payload) => Self::Response {
                id,
                payload: Some(payload),
                error: None,
            },
            Err(error) => Self::Response {
                id,
                payload: None,
                error: Some(error),
            },
        }
    }
}

/// Side-channel key of a push message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PushKey {
    Subscription,
    NativeEvent,
}

/// Mutation watcher notification: a subscription's result changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPush {
    pub id: SubscriptionId,
    pub elements: QueryMapResult,
    pub url: String,
}

/// Native event bridge notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeEventPush {
    pub event: String,
    pub event_id: ListenerId,
}

/// Typed push message before it is put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Subscription(SubscriptionPush),
    NativeEvent(NativeEventPush),
}

impl PushMessage {
    pub fn key(&self) -> PushKey {
        match self {
            Self::Subscription(_) => PushKey::Subscription,
            Self::NativeEvent(_) => PushKey::NativeEvent,
        }
    }

    pub fn into_frame(self) -> Result<Frame, serde_json::Error> {
        let key = self.key();
        let value = match self {
            Self::Subscription(push) => serde_json::to_value(push)?,
            Self::NativeEvent(push) => serde_json::to_value(push)?,
        };
        Ok(Frame::Push { key, value })
    }
}
