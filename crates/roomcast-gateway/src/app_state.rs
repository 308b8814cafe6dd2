//! Shared application state for roomcast gateway.
//!
//! Owns the session registry (bootstrapped from the snapshot) and the action
//! dispatcher with the built-in services registered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::history::InMemoryHistory;
use crate::realtime::SessionRegistry;
use crate::services::MessageService;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    draining: AtomicBool,
}

impl AppState {
    /// Bootstrap the registry from `sessions.cache_dir/snapshot_file` and
    /// register built-in services. Must run before accepting connections.
    pub fn new(cfg: GatewayConfig) -> Self {
        let history = Arc::new(InMemoryHistory::new());
        let registry = SessionRegistry::bootstrap(cfg.sessions.snapshot_path(), history);
        Self::with_registry(cfg, Arc::new(registry))
    }

    pub fn with_registry(cfg: GatewayConfig, registry: Arc<SessionRegistry>) -> Self {
        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(MessageService::new()));
        tracing::debug!(actions = ?dispatcher.registered_actions(), "services registered");

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                draining: AtomicBool::new(false),
            }),
            registry,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
