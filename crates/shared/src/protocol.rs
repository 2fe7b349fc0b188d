//! Payloads exchanged with the hosted realtime database.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body returned by `POST {collection}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub name: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Data of a `put` or `patch` server-sent event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPayload {
    pub path: String,
    #[serde(default)]
    pub data: Value,
}

/// Event kinds emitted by the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventKind {
    Put,
    Patch,
    KeepAlive,
    Cancel,
    AuthRevoked,
    Other(String),
}

impl StreamEventKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "put" => Self::Put,
            "patch" => Self::Patch,
            "keep-alive" => Self::KeepAlive,
            "cancel" => Self::Cancel,
            "auth_revoked" => Self::AuthRevoked,
            other => Self::Other(other.to_string()),
        }
    }
}
