use std::sync::Arc;

use roomcast_core::protocol::Payload;

use super::SessionRegistry;

/// Per-message context passed to services (borrow tools instead of owning).
#[derive(Clone)]
pub struct SessionCtx {
    session: Arc<str>,
    registry: Arc<SessionRegistry>,
}

impl SessionCtx {
    pub fn new(session: impl Into<Arc<str>>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            session: session.into(),
            registry,
        }
    }

    pub fn session_key(&self) -> &str { &self.session }
    pub fn registry(&self) -> &SessionRegistry { &self.registry }

    pub fn user(&self) -> Option<String> {
        self.registry.rooms().user_for_session(&self.session)
    }

    /// Fan out to this session's related sessions.
    pub async fn send(&self, payload: Payload) -> bool {
        self.registry.send(&self.session, payload).await
    }

    pub async fn send_message(&self, message: &str) -> bool {
        self.registry.send_message(&self.session, message).await
    }

    pub async fn send_error(&self, message: &str) -> bool {
        self.registry.send_error(&self.session, message).await
    }
}
