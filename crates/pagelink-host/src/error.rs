//! Host errors.

use pagelink_dom::DomError;
use thiserror::Error;

/// Failure of one host call. Turned into the `error` of its response.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("No element matches '{0}'")]
    NoMatch(String),

    #[error("Element matched by '{pattern}' is not a {expected}")]
    WrongElement { pattern: String, expected: &'static str },

    #[error("No option with value '{0}'")]
    NoOption(String),

    #[error("Element matched by '{0}' has no layout box")]
    NoLayout(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Fetch failed with status {status}: {body}")]
    Fetch { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Host runtime stopped")]
    Stopped,
}
