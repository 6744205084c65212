//! Typed access to the host dispatch table.

use std::sync::Arc;

use pagelink_protocols::{
    ElementSnapshot, FetchRequest, FetchResponse, HostCall, ListenerId, NativeEventPush, Query,
    QueryMap, QueryMapResult, ScreenshotData, Selector, SubscriptionId, SubscriptionPush,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::endpoint::ChannelEndpoint;
use crate::error::ChannelError;

/// Calls [`HostCall`]s through an endpoint and decodes their results.
///
/// Subscription and listener registration also install the local push
/// callback under the id the host returned.
#[derive(Clone)]
pub struct HostClient {
    endpoint: Arc<ChannelEndpoint>,
}

impl HostClient {
    pub fn new(endpoint: Arc<ChannelEndpoint>) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Arc<ChannelEndpoint> {
        &self.endpoint
    }

    /// Issue a call and return its raw payload.
    pub async fn call(&self, call: HostCall) -> Result<Value, ChannelError> {
        let (function, args) = call.into_request()?;
        self.endpoint.call(&function, args).await
    }

    async fn call_as<T: DeserializeOwned>(&self, call: HostCall) -> Result<T, ChannelError> {
        let payload = self.call(call).await?;
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn evaluate_query(&self, query: Query) -> Result<Vec<ElementSnapshot>, ChannelError> {
        self.call_as(HostCall::EvaluateQuery { query }).await
    }

    pub async fn evaluate_query_map(
        &self,
        query_map: QueryMap,
    ) -> Result<QueryMapResult, ChannelError> {
        self.call_as(HostCall::EvaluateQueryMap { query_map }).await
    }

    /// Subscribe to a query map; `callback` receives every change push.
    pub async fn register_query_map<F>(
        &self,
        query_map: QueryMap,
        callback: F,
    ) -> Result<SubscriptionId, ChannelError>
    where
        F: Fn(SubscriptionPush) + Send + Sync + 'static,
    {
        let id: SubscriptionId = self.call_as(HostCall::RegisterQueryMap { query_map }).await?;
        self.endpoint.listeners().on_subscription(id, callback);
        Ok(id)
    }

    /// Cancel a subscription. The local callback stays installed until the
    /// host has answered, so pushes already on the wire are still consumed.
    pub async fn unregister_query_map(&self, id: SubscriptionId) -> Result<bool, ChannelError> {
        let result = self.call_as(HostCall::UnregisterQueryMap { id }).await;
        self.endpoint.listeners().remove_subscription(id);
        result
    }

    pub async fn register_native_event<F>(
        &self,
        selector: Selector,
        events: Vec<String>,
        callback: F,
    ) -> Result<ListenerId, ChannelError>
    where
        F: Fn(NativeEventPush) + Send + Sync + 'static,
    {
        let id: ListenerId = self
            .call_as(HostCall::RegisterNativeEvent { selector, events })
            .await?;
        self.endpoint.listeners().on_native_event(id, callback);
        Ok(id)
    }

    pub async fn remove_native_event(&self, id: ListenerId) -> Result<bool, ChannelError> {
        self.endpoint.listeners().remove_native_event(id);
        self.call_as(HostCall::RemoveNativeEvent { id }).await
    }

    pub async fn click(&self, selector: Selector) -> Result<(), ChannelError> {
        self.call(HostCall::Click { selector }).await.map(drop)
    }

    pub async fn double_click(&self, selector: Selector) -> Result<(), ChannelError> {
        self.call(HostCall::DoubleClick { selector }).await.map(drop)
    }

    pub async fn type_text(
        &self,
        selector: Selector,
        text: impl Into<String>,
        append: bool,
    ) -> Result<(), ChannelError> {
        self.call(HostCall::TypeText {
            selector,
            text: text.into(),
            append,
        })
        .await
        .map(drop)
    }

    pub async fn select_option(
        &self,
        selector: Selector,
        value: impl Into<String>,
    ) -> Result<(), ChannelError> {
        self.call(HostCall::SelectOption {
            selector,
            value: value.into(),
        })
        .await
        .map(drop)
    }

    pub async fn drag_drop(&self, source: Selector, target: Selector) -> Result<(), ChannelError> {
        self.call(HostCall::DragDrop { source, target }).await.map(drop)
    }

    pub async fn screenshot(
        &self,
        selector: Option<Selector>,
    ) -> Result<ScreenshotData, ChannelError> {
        self.call_as(HostCall::Screenshot { selector }).await
    }

    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ChannelError> {
        self.call_as(HostCall::Fetch(request)).await
    }

    pub async fn read_clipboard(&self) -> Result<String, ChannelError> {
        self.call_as(HostCall::ReadClipboard).await
    }

    pub async fn write_clipboard(&self, text: impl Into<String>) -> Result<(), ChannelError> {
        self.call(HostCall::WriteClipboard { text: text.into() })
            .await
            .map(drop)
    }

    /// Returns the number of highlighted elements.
    pub async fn highlight(
        &self,
        selector: Selector,
        color: Option<String>,
    ) -> Result<usize, ChannelError> {
        self.call_as(HostCall::Highlight { selector, color }).await
    }

    pub async fn clear_highlights(&self) -> Result<(), ChannelError> {
        self.call(HostCall::ClearHighlights).await.map(drop)
    }

    pub async fn location(&self) -> Result<String, ChannelError> {
        self.call_as(HostCall::GetLocation).await
    }
}
