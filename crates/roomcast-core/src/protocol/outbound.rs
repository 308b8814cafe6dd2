//! Outbound payload shapes and the history role tag.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Who produced a message recorded in the history store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Inbound, sent by the client.
    User,
    /// Outbound, fanned out by the gateway.
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// `{ "error": true, "message": ... }`
pub fn error_payload(message: &str) -> Value {
    json!({ "error": true, "message": message })
}

/// `{ "message": ... }`
pub fn message_payload(message: &str) -> Value {
    json!({ "message": message })
}
