//! The host dispatch table.
//!
//! Every operation the document-access context exposes is a variant of
//! [`HostCall`]. On the wire a call is `{ "fn": name, "args": {...} }`, which
//! is exactly serde's adjacently tagged representation, so the contract is
//! statically enumerable from this one enum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ListenerId, SubscriptionId};
use crate::query::{Query, QueryMap};
use crate::selector::Selector;

/// A remotely callable host operation with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fn", content = "args", rename_all = "camelCase")]
pub enum HostCall {
    EvaluateQuery {
        query: Query,
    },
    #[serde(rename_all = "camelCase")]
    EvaluateQueryMap {
        query_map: QueryMap,
    },
    #[serde(rename_all = "camelCase")]
    RegisterQueryMap {
        query_map: QueryMap,
    },
    UnregisterQueryMap {
        id: SubscriptionId,
    },
    RegisterNativeEvent {
        selector: Selector,
        events: Vec<String>,
    },
    RemoveNativeEvent {
        id: ListenerId,
    },
    Click {
        selector: Selector,
    },
    DoubleClick {
        selector: Selector,
    },
    TypeText {
        selector: Selector,
        text: String,
        #[serde(default)]
        append: bool,
    },
    SelectOption {
        selector: Selector,
        value: String,
    },
    DragDrop {
        source: Selector,
        target: Selector,
    },
    Screenshot {
        #[serde(default)]
        selector: Option<Selector>,
    },
    Fetch(FetchRequest),
    ReadClipboard,
    WriteClipboard {
        text: String,
    },
    Highlight {
        selector: Selector,
        #[serde(default)]
        color: Option<String>,
    },
    ClearHighlights,
    GetLocation,
}

/// Name and description of one exposed function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub description: &'static str,
}

const CATALOG: &[FunctionInfo] = &[
    FunctionInfo { name: "evaluateQuery", description: "Evaluate one query against the live document" },
    FunctionInfo { name: "evaluateQueryMap", description: "Evaluate a named bundle of queries" },
    FunctionInfo { name: "registerQueryMap", description: "Subscribe to changes of a query map" },
    FunctionInfo { name: "unregisterQueryMap", description: "Cancel a query-map subscription" },
    FunctionInfo { name: "registerNativeEvent", description: "Forward native events fired on matched elements" },
    FunctionInfo { name: "removeNativeEvent", description: "Stop re-attaching a native-event listener entry" },
    FunctionInfo { name: "click", description: "Simulate a click on the first matched element" },
    FunctionInfo { name: "doubleClick", description: "Simulate a double click on the first matched element" },
    FunctionInfo { name: "typeText", description: "Enter text into the first matched element" },
    FunctionInfo { name: "selectOption", description: "Select an option of the first matched select element" },
    FunctionInfo { name: "dragDrop", description: "Drag one element onto another" },
    FunctionInfo { name: "screenshot", description: "Capture the visible surface or one element" },
    FunctionInfo { name: "fetch", description: "Perform an HTTP request, optionally forwarding a CSRF cookie" },
    FunctionInfo { name: "readClipboard", description: "Read text from the clipboard" },
    FunctionInfo { name: "writeClipboard", description: "Write text to the clipboard" },
    FunctionInfo { name: "highlight", description: "Visually highlight matched elements" },
    FunctionInfo { name: "clearHighlights", description: "Remove all highlights" },
    FunctionInfo { name: "getLocation", description: "Current document location" },
];

/// Functions that take no arguments.
const UNIT_CALLS: &[&str] = &["readClipboard", "clearHighlights", "getLocation"];

fn is_empty_args(args: &Value) -> bool {
    match args {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

impl HostCall {
    /// Wire name of this call.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EvaluateQuery { .. } => "evaluateQuery",
            Self::EvaluateQueryMap { .. } => "evaluateQueryMap",
            Self::RegisterQueryMap { .. } => "registerQueryMap",
            Self::UnregisterQueryMap { .. } => "unregisterQueryMap",
            Self::RegisterNativeEvent { .. } => "registerNativeEvent",
            Self::RemoveNativeEvent { .. } => "removeNativeEvent",
            Self::Click { .. } => "click",
            Self::DoubleClick { .. } => "doubleClick",
            Self::TypeText { .. } => "typeText",
            Self::SelectOption { .. } => "selectOption",
            Self::DragDrop { .. } => "dragDrop",
            Self::Screenshot { .. } => "screenshot",
            Self::Fetch(_) => "fetch",
            Self::ReadClipboard => "readClipboard",
            Self::WriteClipboard { .. } => "writeClipboard",
            Self::Highlight { .. } => "highlight",
            Self::ClearHighlights => "clearHighlights",
            Self::GetLocation => "getLocation",
        }
    }

    /// Every exposed function, in declaration order.
    pub fn catalog() -> &'static [FunctionInfo] {
        CATALOG
    }

    /// Decode a request's function name and arguments.
    pub fn from_request(function: &str, args: Value) -> Result<Self, serde_json::Error> {
        let mut envelope = Map::new();
        envelope.insert("fn".to_string(), Value::String(function.to_string()));
        if UNIT_CALLS.contains(&function) {
            // Callers commonly send `{}` or `[]` for argument-less functions.
            if !is_empty_args(&args) {
                envelope.insert("args".to_string(), args);
            }
        } else if args.is_null() {
            envelope.insert("args".to_string(), Value::Object(Map::new()));
        } else {
            envelope.insert("args".to_string(), args);
        }
        serde_json::from_value(Value::Object(envelope))
    }

    /// Split into the function name and arguments carried by a request.
    pub fn into_request(self) -> Result<(String, Value), serde_json::Error> {
        let name = self.name().to_string();
        let mut value = serde_json::to_value(self)?;
        let args = value
            .as_object_mut()
            .and_then(|obj| obj.remove("args"))
            .unwrap_or(Value::Null);
        Ok((name, args))
    }
}

/// Arguments of the `fetch` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Copy a document cookie into a request header before sending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf: Option<CsrfForwarding>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
            csrf: None,
        }
    }
}

/// Cookie-to-header CSRF token forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfForwarding {
    /// Name of the document cookie holding the token.
    pub cookie: String,
    /// Request header the token is copied into.
    pub header: String,
}

/// Result of a successful `fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub url: String,
}

/// Result of `screenshot`: base64 PNG plus its pixel size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotData {
    pub data: String,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
#[path = "call_tests.rs"]
mod tests;
