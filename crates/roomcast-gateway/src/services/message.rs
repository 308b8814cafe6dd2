use async_trait::async_trait;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::Envelope;

use crate::dispatch::ActionService;
use crate::realtime::SessionCtx;

/// `{"action": "message", "args": {"content": ...}}`: echo the content to
/// every session of the sender's room.
#[derive(Default)]
pub struct MessageService;

impl MessageService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionService for MessageService {
    fn action(&self) -> &'static str {
        "message"
    }

    async fn handle(&self, ctx: SessionCtx, env: Envelope) -> Result<()> {
        let content = env
            .arg_str("content")
            .ok_or_else(|| RoomcastError::BadRequest("message requires args.content".into()))?;

        if !ctx.send_message(content).await {
            return Err(RoomcastError::UnknownSession(ctx.session_key().to_string()));
        }
        Ok(())
    }
}
