//! Protocol modules.
//!
//! - `envelope`: inbound action envelopes sent by clients.
//! - `outbound`: payload shapes the gateway fans out, plus the history role tag.
//! - `record`: the per-session record persisted in the snapshot file.
//!
//! Payloads are arbitrary structured JSON; only the envelope's `action` field is
//! interpreted by the gateway.

pub mod envelope;
pub mod outbound;
pub mod record;

/// Arbitrary structured message exchanged with a client.
pub type Payload = serde_json::Value;

pub use envelope::Envelope;
pub use outbound::{error_payload, message_payload, Role};
pub use record::SessionRecord;
