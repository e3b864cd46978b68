//! Wire types for the public HTTP API.
//!
//! These mirror the schemas in `api/openapi.yaml`, which is embedded and
//! served verbatim at `GET /api/openapi.yaml`.
use serde::{Deserialize, Serialize};

/// The OpenAPI document describing this service
pub const OPENAPI_SPEC: &str = include_str!("../api/openapi.yaml");

/// A message/author pair, used for both the echo request and response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EchoMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: String,
}

impl EchoMessage {
    pub fn new(message: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            author: author.into(),
        }
    }

    /// Both fields carry content
    pub fn is_complete(&self) -> bool {
        !self.message.is_empty() && !self.author.is_empty()
    }
}

pub type EchoRequest = EchoMessage;
pub type EchoResponse = EchoMessage;

/// Body of `/healthz` and `/readyz`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn ready() -> Self {
        Self {
            status: "ready".to_string(),
        }
    }
}

/// Body of every non-2xx JSON response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }
}
