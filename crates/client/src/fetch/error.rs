//! Network transport error types.

use std::sync::Arc;

/// Errors from the network transport.
///
/// A non-2xx status is not an error here; only failing to obtain a
/// response at all is.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Could not connect (offline, DNS failure, refused).
    #[error("connect failed: {0}")]
    Connect(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The body could not be read.
    #[error("failed to read body: {0}")]
    Body(String),

    /// The body exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: usize },

    /// Any other transport failure.
    #[error("network error: {0}")]
    Transport(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::Connect(err.to_string())
        } else if err.is_builder() {
            NetworkError::InvalidRequest(err.to_string())
        } else if err.is_body() || err.is_decode() {
            NetworkError::Body(err.to_string())
        } else {
            NetworkError::Transport(Arc::new(err))
        }
    }
}

impl From<NetworkError> for appshell_core::Error {
    fn from(err: NetworkError) -> Self {
        appshell_core::Error::NetworkFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(NetworkError::Timeout.to_string(), "request timeout");

        let err = NetworkError::TooLarge { size: 10, limit: 5 };
        assert!(err.to_string().contains("10 bytes exceeds 5"));
    }

    #[test]
    fn test_into_core_error() {
        let err: appshell_core::Error = NetworkError::Connect("offline".into()).into();
        assert!(matches!(err, appshell_core::Error::NetworkFailure(msg) if msg.contains("offline")));
    }
}
