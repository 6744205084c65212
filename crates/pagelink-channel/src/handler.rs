//! Request handling seam.

use async_trait::async_trait;
use serde_json::Value;

/// Executes incoming requests.
///
/// The returned `Err` string becomes the `error` of the response; a handler
/// failure never takes the endpoint down.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, function: &str, args: Value) -> Result<Value, String>;
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for std::sync::Arc<T> {
    async fn handle(&self, function: &str, args: Value) -> Result<Value, String> {
        (**self).handle(function, args).await
    }
}
