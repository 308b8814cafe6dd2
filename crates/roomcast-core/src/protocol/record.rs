//! Persisted session record.
//!
//! The snapshot file is a JSON object keyed by session id; every value is one
//! `SessionRecord`. Connection handles are never part of it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomcastError};

/// Connection-less subset of a session that survives restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub sid: String,
    /// Seconds since the Unix epoch. Opaque to the gateway beyond ordering.
    pub last_active_ts: f64,
    pub is_alive: bool,
    pub uid: Option<String>,
}

impl SessionRecord {
    /// Structural check applied before a record is restored under `key`.
    pub fn validate(&self, key: &str) -> Result<()> {
        if self.sid.is_empty() {
            return Err(RoomcastError::BadRequest("record sid must not be empty".into()));
        }
        if self.sid != key {
            return Err(RoomcastError::BadRequest(format!(
                "record sid {} does not match key {key}",
                self.sid
            )));
        }
        if !self.last_active_ts.is_finite() || self.last_active_ts < 0.0 {
            return Err(RoomcastError::BadRequest("record last_active_ts out of range".into()));
        }
        if matches!(self.uid.as_deref(), Some("")) {
            return Err(RoomcastError::BadRequest("record uid must not be empty".into()));
        }
        Ok(())
    }
}
