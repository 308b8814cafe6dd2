use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use roomcast_core::error::Result;
use roomcast_core::protocol::{Payload, SessionRecord};

/// Session side of one client connection.
///
/// The transport keeps the matching [`ConnectionPeer`]: it drains `outbound`
/// into the socket and feeds decoded frames into `inbound`.
pub struct Connection {
    tx: mpsc::Sender<Payload>,
    rx: mpsc::Receiver<Payload>,
}

/// Transport side of one client connection.
pub struct ConnectionPeer {
    /// Payloads the session wants written to the socket.
    pub outbound: mpsc::Receiver<Payload>,
    /// Decoded inbound frames for the session's receive loop.
    pub inbound: mpsc::Sender<Payload>,
}

impl Connection {
    /// Create both halves with `capacity` slots in each direction.
    pub fn pair(capacity: usize) -> (Connection, ConnectionPeer) {
        let (out_tx, out_rx) = mpsc::channel(capacity.max(1));
        let (in_tx, in_rx) = mpsc::channel(capacity.max(1));
        (
            Connection { tx: out_tx, rx: in_rx },
            ConnectionPeer { outbound: out_rx, inbound: in_tx },
        )
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no connection ever attached.
    Unattached,
    /// Connection attached and its receive loop has not ended.
    Live,
    /// Receive loop ended; session stays addressable.
    Dead,
    /// Rebuilt from a snapshot; no connection, carries historical metadata.
    Restored,
}

struct Inner {
    uid: Option<String>,
    tx: Option<mpsc::Sender<Payload>>,
    /// Inbound half, parked here until a receive loop claims it.
    rx: Option<mpsc::Receiver<Payload>>,
    generation: u64,
    is_alive: bool,
    last_active_ts: f64,
    restored: bool,
    was_alive: bool,
}

/// One logical client slot, stable across reconnects.
pub struct Session {
    id: String,
    inner: Mutex<Inner>,
}

pub(crate) fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

impl Session {
    /// New session with no connection.
    pub fn new(id: impl Into<String>, uid: Option<String>) -> Self {
        Self {
            id: id.into(),
            inner: Mutex::new(Inner {
                uid,
                tx: None,
                rx: None,
                generation: 0,
                is_alive: false,
                last_active_ts: now_ts(),
                restored: false,
                was_alive: false,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uid(&self) -> Option<String> {
        self.inner.lock().uid.clone()
    }

    pub fn set_uid(&self, uid: Option<String>) {
        self.inner.lock().uid = uid;
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lock().is_alive
    }

    pub fn last_active_ts(&self) -> f64 {
        self.inner.lock().last_active_ts
    }

    /// `is_alive` as read from the snapshot this session was restored from.
    pub fn was_alive(&self) -> bool {
        self.inner.lock().was_alive
    }

    pub fn state(&self) -> SessionState {
        let inner = self.inner.lock();
        match (inner.is_alive, inner.generation, inner.restored) {
            (true, _, _) => SessionState::Live,
            (false, 0, true) => SessionState::Restored,
            (false, 0, false) => SessionState::Unattached,
            (false, _, _) => SessionState::Dead,
        }
    }

    /// Bind `conn` and go LIVE. Any previous connection is dropped, which
    /// closes its outbound channel; it is never referenced again.
    ///
    /// Returns the new attach generation.
    pub fn attach(&self, conn: Connection) -> u64 {
        let mut inner = self.inner.lock();
        let replaced = inner.tx.is_some();
        inner.tx = Some(conn.tx);
        inner.rx = Some(conn.rx);
        inner.generation += 1;
        inner.is_alive = true;
        touch(&mut inner);
        tracing::info!(sid = %self.id, generation = inner.generation, replaced, "connection attached");
        inner.generation
    }

    /// Fire-and-forget delivery. Returns false when not alive or when the
    /// connection cannot take the payload right now.
    pub fn send(&self, payload: Payload) -> bool {
        let tx = {
            let mut inner = self.inner.lock();
            if !inner.is_alive {
                return false;
            }
            let Some(tx) = inner.tx.clone() else { return false };
            touch(&mut inner);
            tx
        };
        match tx.try_send(payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(sid = %self.id, error = %e, "send dropped");
                false
            }
        }
    }

    /// Drive the current connection's inbound side until it closes, calling
    /// `dispatch` per message. Returns immediately when no connection is
    /// attached or another loop already owns it.
    pub async fn receive_loop<F, Fut>(&self, dispatch: F)
    where
        F: FnMut(Payload) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.drive(None, dispatch).await
    }

    /// [`Session::receive_loop`] restricted to the connection attached as
    /// `generation`; returns immediately once a later attach replaced it.
    pub async fn receive_loop_for<F, Fut>(&self, generation: u64, dispatch: F)
    where
        F: FnMut(Payload) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.drive(Some(generation), dispatch).await
    }

    async fn drive<F, Fut>(&self, expected: Option<u64>, mut dispatch: F)
    where
        F: FnMut(Payload) -> Fut,
        Fut: Future<Output = ()>,
    {
        let claimed = {
            let mut inner = self.inner.lock();
            let generation = inner.generation;
            if expected.is_some_and(|g| g != generation) {
                None
            } else {
                inner.rx.take().map(|rx| (generation, rx))
            }
        };
        let Some((generation, mut rx)) = claimed else {
            tracing::debug!(sid = %self.id, expected, "no inbound side to drive");
            return;
        };

        while let Some(payload) = rx.recv().await {
            touch(&mut self.inner.lock());
            dispatch(payload).await;
        }

        let mut inner = self.inner.lock();
        // a newer attach owns liveness now
        if inner.generation == generation {
            inner.is_alive = false;
            inner.tx = None;
            tracing::info!(sid = %self.id, generation, "receive loop ended");
        } else {
            tracing::debug!(sid = %self.id, generation, current = inner.generation, "stale receive loop ended");
        }
    }

    /// Load persisted metadata into a connection-less session.
    pub fn restore_from_snapshot(&self, record: &SessionRecord) -> Result<()> {
        record.validate(&self.id)?;
        let mut inner = self.inner.lock();
        inner.last_active_ts = record.last_active_ts;
        inner.uid = record.uid.clone();
        inner.was_alive = record.is_alive;
        // nothing is attached after a restart
        inner.is_alive = false;
        inner.restored = true;
        Ok(())
    }

    pub fn snapshot(&self) -> SessionRecord {
        let inner = self.inner.lock();
        SessionRecord {
            sid: self.id.clone(),
            last_active_ts: inner.last_active_ts,
            is_alive: inner.is_alive,
            uid: inner.uid.clone(),
        }
    }
}

fn touch(inner: &mut Inner) {
    inner.last_active_ts = inner.last_active_ts.max(now_ts());
}
