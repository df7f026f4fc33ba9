//! Error types for the remote client

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No active game")]
    NoActiveGame,

    #[error("Missing API token")]
    MissingToken,

    #[error("Server returned invalid data: {0}")]
    InvalidData(String),

    #[error("Failed to decode server message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ClientError>,
    },

    #[error("Mock response not configured for: {0}")]
    NotConfigured(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed: connection problems,
    /// timeouts, rate limiting and server-side failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::RetriesExhausted { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let rate_limited = ClientError::Status {
            status: 429,
            body: String::new(),
        };
        let unavailable = ClientError::Status {
            status: 503,
            body: String::new(),
        };
        let not_found = ClientError::Status {
            status: 404,
            body: String::new(),
        };
        assert!(rate_limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(!not_found.is_transient());
        assert!(!ClientError::NoActiveGame.is_transient());
    }
}
