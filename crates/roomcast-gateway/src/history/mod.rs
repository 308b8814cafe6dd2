//! Message history collaborator.
//!
//! The registry records every payload it delivers to a session here. The
//! in-memory store is the default; anything durable can implement
//! [`MessageHistory`] instead.

mod memory;

use async_trait::async_trait;

use roomcast_core::protocol::{Payload, Role};

pub use memory::{HistoryEntry, InMemoryHistory};

#[async_trait]
pub trait MessageHistory: Send + Sync {
    async fn record(&self, session_key: &str, role: Role, payload: &Payload);
}
