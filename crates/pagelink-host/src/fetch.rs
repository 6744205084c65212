//! Outbound HTTP on behalf of the page.

use std::collections::BTreeMap;
use std::time::Duration;

use pagelink_config::FetchConfig;
use pagelink_dom::Document;
use pagelink_protocols::{FetchRequest, FetchResponse};
use reqwest::{Client, Method};
use tracing::{debug, warn};
use url::Url;

use crate::error::HostError;

/// A request resolved against the document: absolute URL, CSRF header
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFetch {
    pub url: Url,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// Resolve `request` in the context of `doc`.
///
/// Relative URLs resolve against the document location. When CSRF
/// forwarding is requested the named cookie is copied into the named
/// header; a missing cookie sends the request without it.
pub fn prepare(doc: &Document, request: FetchRequest) -> Result<PreparedFetch, HostError> {
    let url = match Url::parse(&request.url) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(doc.url())
            .and_then(|base| base.join(&request.url))
            .map_err(|e| HostError::InvalidArguments(format!("Invalid URL: {}", e)))?,
        Err(e) => return Err(HostError::InvalidArguments(format!("Invalid URL: {}", e))),
    };

    let method = Method::from_bytes(request.method.to_uppercase().as_bytes()).map_err(|_| {
        HostError::InvalidArguments(format!("Unsupported method: {}", request.method))
    })?;

    let mut headers = request.headers;
    if let Some(csrf) = request.csrf {
        match doc.cookie_value(&csrf.cookie) {
            Some(token) => {
                headers.insert(csrf.header, token);
            }
            None => warn!("CSRF cookie '{}' not set; sending without it", csrf.cookie),
        }
    }

    Ok(PreparedFetch {
        url,
        method,
        headers,
        body: request.body,
    })
}

/// Executes prepared requests. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, HostError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| HostError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Send the request. Non-success statuses are errors carrying the
    /// status and body; nothing is retried.
    pub async fn execute(&self, prepared: PreparedFetch) -> Result<FetchResponse, HostError> {
        debug!("fetch {} {}", prepared.method, prepared.url);
        let mut request = self.client.request(prepared.method, prepared.url);
        for (key, value) in &prepared.headers {
            request = request.header(key, value);
        }
        if let Some(body) = prepared.body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HostError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        let url = response.url().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| HostError::Network(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(HostError::Fetch {
                status: status.as_u16(),
                body,
            });
        }

        Ok(FetchResponse {
            status: status.as_u16(),
            headers,
            body,
            url,
        })
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
