//! Error taxonomy of the session core.

use chess::{FenError, PgnError, UciError};
use chess_client::ClientError;
use thiserror::Error;

use crate::reconciler::ReconcileError;
use crate::store::StoreError;

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The rules engine refused a move. Always a caller bug, never a
    /// network failure.
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    /// The current mode or phase does not permit the operation.
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// Network or API failure that survived the retry budget.
    #[error("Remote service unavailable: {0}")]
    RemoteTransient(String),

    /// Remote failure that retrying cannot fix.
    #[error("Remote request failed: {0}")]
    RemoteFatal(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Index {index} out of range (history length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        if err.is_transient() {
            Self::RemoteTransient(err.to_string())
        } else {
            Self::RemoteFatal(err.to_string())
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::IllegalMove(e) => Self::IllegalMove(e.to_string()),
            StoreError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
        }
    }
}

impl From<ReconcileError> for SessionError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::IllegalRemoteMove { .. } => Self::IllegalMove(err.to_string()),
            _ => Self::Parse(err.to_string()),
        }
    }
}

impl From<UciError> for SessionError {
    fn from(err: UciError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<PgnError> for SessionError {
    fn from(err: PgnError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<FenError> for SessionError {
    fn from(err: FenError) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_split_by_transience() {
        let exhausted = ClientError::RetriesExhausted {
            attempts: 5,
            last: Box::new(ClientError::Status {
                status: 503,
                body: String::new(),
            }),
        };
        assert!(matches!(
            SessionError::from(exhausted),
            SessionError::RemoteTransient(_)
        ));
        assert!(matches!(
            SessionError::from(ClientError::NoActiveGame),
            SessionError::RemoteFatal(_)
        ));
    }
}
