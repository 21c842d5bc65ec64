//! Message types exchanged with the browser extension.
//!
//! Inbound messages are untyped JSON objects carrying a `type` tag; they are
//! classified into [`Request`] without schema validation. Outbound messages
//! are [`Response`] values, serialized with the same `type` tag.

use serde::Serialize;
use serde_json::Value;

/// Endpoint used by `forward` when the message names none.
pub const DEFAULT_FORWARD_ENDPOINT: &str = "/visit";

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping {
        data: Value,
    },
    GetPort,
    Forward {
        endpoint: String,
        data: Value,
    },
    CheckStatus,
    /// Anything else. `kind` is the `type` tag as shown back to the peer.
    Unknown {
        kind: String,
    },
}

impl Request {
    /// Classify a decoded message by its `type` field.
    ///
    /// Missing optional fields take their defaults; unknown fields are ignored.
    pub fn classify(message: Value) -> Self {
        let Value::Object(mut fields) = message else {
            return Self::Unknown {
                kind: "null".to_string(),
            };
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            None | Some(Value::Null) => {
                return Self::Unknown {
                    kind: "null".to_string(),
                };
            }
            Some(other) => {
                return Self::Unknown {
                    kind: other.to_string(),
                };
            }
        };

        match kind.as_str() {
            "ping" => Self::Ping {
                data: fields.remove("data").unwrap_or(Value::Null),
            },
            "get_port" => Self::GetPort,
            "forward" => Self::Forward {
                endpoint: match fields.remove("endpoint") {
                    Some(Value::String(endpoint)) => endpoint,
                    _ => DEFAULT_FORWARD_ENDPOINT.to_string(),
                },
                data: fields
                    .remove("data")
                    .unwrap_or_else(|| Value::Object(Default::default())),
            },
            "check_status" => Self::CheckStatus,
            _ => Self::Unknown { kind },
        }
    }
}

/// Result of relaying a `forward` message to the companion process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Parsed response body; `Some(Value::Null)` when the body was empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ForwardResult {
    pub fn delivered(status: u16, data: Value) -> Self {
        Self {
            success: true,
            status: Some(status),
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Outbound message. Exactly one is written per decoded inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong { echo: Value },
    Port { port: u16 },
    ForwardResult(ForwardResult),
    Status { vscode_running: bool, port: u16 },
    Error { error: String },
}

impl Response {
    pub fn unknown_type(kind: &str) -> Self {
        Self::Error {
            error: format!("Unknown message type: {kind}"),
        }
    }
}
