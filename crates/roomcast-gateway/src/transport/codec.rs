//! Decode-once codec for the transport layer.
//!
//! - Text frames => JSON payload
//! - Binary frames => rejected (payloads are JSON text only)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use roomcast_core::{
    error::{Result, RoomcastError},
    protocol::Payload,
};

#[derive(Debug)]
pub enum Inbound {
    Payload(Payload),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => {
            let payload: Payload = serde_json::from_str(&s)
                .map_err(|e| RoomcastError::BadRequest(format!("invalid payload json: {e}")))?;
            Ok(Inbound::Payload(payload))
        }
        Message::Binary(_) => Err(RoomcastError::BadRequest("binary frames are not supported".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(v) => Ok(Inbound::Pong(v)),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode(payload: &Payload) -> Result<Message> {
    let s = serde_json::to_string(payload)
        .map_err(|e| RoomcastError::Internal(format!("json encode failed: {e}")))?;
    Ok(Message::Text(s))
}
