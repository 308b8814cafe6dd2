//! Inbound action envelope (JSON).

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, RoomcastError};

/// Client -> gateway message.
///
/// Only `action` is interpreted by the dispatcher; `args` is handed to the
/// service registered for that action untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Action name (e.g., "message").
    pub action: String,
    /// Optional action arguments.
    #[serde(default)]
    pub args: Option<Value>,
}

impl Envelope {
    /// Interpret an already-decoded payload as an envelope.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let env: Envelope = serde_json::from_value(payload.clone())
            .map_err(|e| RoomcastError::BadRequest(format!("invalid envelope: {e}")))?;
        if env.action.is_empty() {
            return Err(RoomcastError::BadRequest("action must not be empty".into()));
        }
        Ok(env)
    }

    /// String argument lookup.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.as_ref()?.get(key)?.as_str()
    }
}
