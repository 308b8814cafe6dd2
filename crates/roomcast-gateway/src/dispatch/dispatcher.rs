use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::{Envelope, Payload, Role};

use crate::realtime::SessionCtx;

/// Application services keyed by envelope `action`.
#[async_trait]
pub trait ActionService: Send + Sync {
    fn action(&self) -> &'static str;
    async fn handle(&self, ctx: SessionCtx, env: Envelope) -> Result<()>;
}

/// Registry and dispatcher for action services.
#[derive(Default)]
pub struct Dispatcher {
    actions: DashMap<&'static str, Arc<dyn ActionService>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            actions: DashMap::new(),
        }
    }

    pub fn register(&self, svc: Arc<dyn ActionService>) {
        self.actions.insert(svc.action(), svc);
    }

    pub fn registered_actions(&self) -> Vec<&'static str> {
        self.actions.iter().map(|e| *e.key()).collect()
    }

    /// Record the inbound payload, then route it by `action`.
    pub async fn dispatch(&self, ctx: SessionCtx, payload: Payload) -> Result<()> {
        ctx.registry()
            .history()
            .record(ctx.session_key(), Role::User, &payload)
            .await;

        let env = Envelope::from_payload(&payload)?;
        let action = env.action.as_str();
        let handler = self
            .actions
            .get(action)
            .ok_or_else(|| RoomcastError::BadRequest(format!("unknown action: {action}")))?
            .value()
            .clone();
        handler.handle(ctx, env).await
    }

    /// `dispatch`, answering failures with an error payload instead of
    /// ending the receive loop.
    pub async fn dispatch_or_reply(&self, ctx: SessionCtx, payload: Payload) {
        if let Err(e) = self.dispatch(ctx.clone(), payload).await {
            tracing::warn!(sid = %ctx.session_key(), code = e.client_code().as_str(), error = %e, "dispatch failed");
            ctx.send_error(&e.to_string()).await;
        }
    }
}
