use thiserror::Error;

use crate::domain::ItemId;

/// Failure of a remote store operation. Shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("record {0} does not exist")]
    NotFound(ItemId),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("subscription cancelled by server: {0}")]
    Cancelled(String),
}

impl RemoteError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}
