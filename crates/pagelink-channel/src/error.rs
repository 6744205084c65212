//! Channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel disconnected")]
    Disconnected,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request '{function}' timed out after {timeout_ms}ms")]
    Timeout { function: String, timeout_ms: u64 },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("No handler for request '{0}'")]
    NoHandler(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ChannelError::Disconnected.to_string(), "Channel disconnected");
        assert_eq!(ChannelError::Cancelled.to_string(), "Request cancelled");
        let err = ChannelError::Timeout {
            function: "click".to_string(),
            timeout_ms: 500,
        };
        assert_eq!(err.to_string(), "Request 'click' timed out after 500ms");
        assert_eq!(
            ChannelError::Remote("No element matched".to_string()).to_string(),
            "Remote error: No element matched"
        );
        assert_eq!(
            ChannelError::NoHandler("getLocation".to_string()).to_string(),
            "No handler for request 'getLocation'"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<u32>("x").unwrap_err();
        let err: ChannelError = err.into();
        assert!(matches!(err, ChannelError::Serialization(_)));
    }
}
