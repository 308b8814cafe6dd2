use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use roomcast_core::protocol::{error_payload, message_payload, Payload, Role};

use crate::history::MessageHistory;

use super::room_index::RoomIndex;
use super::session::{Connection, Session};
use super::snapshot::{self, SnapshotError};

/// Session registry:
/// - `session_key -> Session`
/// - room index (`session_key <-> user_key`) for fan-out
///
/// One instance per process, handed to the transport by `Arc`. Sessions are
/// only removed by [`SessionRegistry::evict`]; disconnects leave them
/// addressable (and still room-indexed) until then.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    rooms: RoomIndex,
    history: Arc<dyn MessageHistory>,
    snapshot_path: PathBuf,
}

impl SessionRegistry {
    /// Empty registry. Nothing is read from `snapshot_path` until
    /// [`SessionRegistry::bootstrap`] is used instead.
    pub fn new(snapshot_path: impl Into<PathBuf>, history: Arc<dyn MessageHistory>) -> Self {
        Self {
            sessions: DashMap::new(),
            rooms: RoomIndex::new(),
            history,
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Registry rebuilt from the snapshot at `snapshot_path`, if any.
    pub fn bootstrap(snapshot_path: impl Into<PathBuf>, history: Arc<dyn MessageHistory>) -> Self {
        let registry = Self::new(snapshot_path, history);
        registry.restore();
        registry
    }

    fn restore(&self) -> usize {
        let path = self.snapshot_path.as_path();
        let snap = match snapshot::load(path) {
            Ok(snap) => snap,
            Err(SnapshotError::NotFound(_)) => {
                tracing::info!(path = %path.display(), "no session snapshot, starting empty");
                return 0;
            }
            Err(SnapshotError::Parse(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "session snapshot unreadable, starting empty");
                return 0;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "session snapshot load failed, starting empty");
                return 0;
            }
        };

        let mut restored = 0;
        for (key, record) in snap.records {
            let session = Session::new(key.as_str(), None);
            if let Err(e) = session.restore_from_snapshot(&record) {
                tracing::warn!(sid = %key, error = %e, "skipping invalid snapshot record");
                continue;
            }
            if let Some(uid) = record.uid.as_deref() {
                self.rooms.associate(&key, uid);
            }
            self.sessions.insert(key, Arc::new(session));
            restored += 1;
        }
        tracing::info!(restored, skipped = snap.skipped.len(), "sessions restored");
        restored
    }

    /// Register a new connection for `session_key`.
    ///
    /// Unknown key: create the session and attach; it is only room-indexed when
    /// `user_key` is given. Known key: reconnect (LIVE -> LIVE, DEAD -> LIVE),
    /// replacing the old connection, and associate `user_key` if supplied so a
    /// late-authenticated connection joins its room.
    ///
    /// Returns the attach generation; pass it to
    /// [`SessionRegistry::drive_attached`] to drive exactly this connection.
    pub fn add_or_attach(&self, session_key: &str, conn: Connection, user_key: Option<&str>) -> u64 {
        // The entry guard serializes attaches per key, so the session's uid
        // and its room index entry change together.
        match self.sessions.entry(session_key.to_string()) {
            Entry::Vacant(v) => {
                let session = Session::new(session_key, user_key.map(str::to_string));
                let generation = session.attach(conn);
                if let Some(uid) = user_key {
                    self.rooms.associate(session_key, uid);
                }
                v.insert(Arc::new(session));
                tracing::info!(sid = %session_key, uid = ?user_key, "session created");
                generation
            }
            Entry::Occupied(o) => {
                let session = o.get();
                let generation = session.attach(conn);
                if let Some(uid) = user_key {
                    session.set_uid(Some(uid.to_string()));
                    self.rooms.associate(session_key, uid);
                }
                generation
            }
        }
    }

    /// Fan `payload` out to every known session related to `session_key`.
    ///
    /// Returns false (and records nothing) when `session_key` is unknown.
    /// Delivery is best-effort per recipient; dead or full connections just
    /// miss the payload.
    pub async fn send(&self, session_key: &str, payload: Payload) -> bool {
        if !self.sessions.contains_key(session_key) {
            tracing::debug!(sid = %session_key, "send to unknown session");
            return false;
        }

        let targets: Vec<Arc<Session>> = self
            .rooms
            .related_sessions(session_key)
            .iter()
            .filter_map(|sid| self.get(sid))
            .collect();

        let mut delivered = 0usize;
        for session in &targets {
            self.history.record(session.id(), Role::Assistant, &payload).await;
            if session.send(payload.clone()) {
                delivered += 1;
            }
        }
        tracing::debug!(sid = %session_key, targets = targets.len(), delivered, "fan-out");
        true
    }

    pub async fn send_error(&self, session_key: &str, message: &str) -> bool {
        self.send(session_key, error_payload(message)).await
    }

    pub async fn send_message(&self, session_key: &str, message: &str) -> bool {
        self.send(session_key, message_payload(message)).await
    }

    /// Run the session's receive loop until its connection closes.
    /// Returns false without waiting when `session_key` is unknown.
    pub async fn drive_receive<F, Fut>(&self, session_key: &str, dispatch: F) -> bool
    where
        F: FnMut(Payload) -> Fut,
        Fut: Future<Output = ()>,
    {
        let Some(session) = self.get(session_key) else {
            tracing::debug!(sid = %session_key, "drive_receive on unknown session");
            return false;
        };
        session.receive_loop(dispatch).await;
        true
    }

    /// Like [`SessionRegistry::drive_receive`], but only for the connection
    /// attached as `generation`. Returns immediately when a later attach has
    /// already replaced it, leaving the newer inbound side for its own caller.
    pub async fn drive_attached<F, Fut>(&self, session_key: &str, generation: u64, dispatch: F) -> bool
    where
        F: FnMut(Payload) -> Fut,
        Fut: Future<Output = ()>,
    {
        let Some(session) = self.get(session_key) else {
            tracing::debug!(sid = %session_key, generation, "drive_attached on unknown session");
            return false;
        };
        session.receive_loop_for(generation, dispatch).await;
        true
    }

    /// Drop the session and its room membership.
    pub fn evict(&self, session_key: &str) -> bool {
        match self.sessions.entry(session_key.to_string()) {
            Entry::Occupied(o) => {
                self.rooms.dissociate(session_key);
                o.remove();
                tracing::info!(sid = %session_key, "session evicted");
                true
            }
            Entry::Vacant(_) => {
                self.rooms.dissociate(session_key);
                false
            }
        }
    }

    /// Persist every session's record. Logged here; callers may ignore the
    /// result since a failed save is not fatal.
    pub fn shutdown(&self) -> Result<usize, SnapshotError> {
        let records: BTreeMap<String, _> = self
            .sessions
            .iter()
            .map(|r| (r.key().clone(), r.value().snapshot()))
            .collect();
        let count = records.len();

        match snapshot::save(&self.snapshot_path, &records) {
            Ok(()) => {
                tracing::info!(path = %self.snapshot_path.display(), count, "sessions saved");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(path = %self.snapshot_path.display(), error = %e, "saving sessions failed");
                Err(e)
            }
        }
    }

    pub fn get(&self, session_key: &str) -> Option<Arc<Session>> {
        self.sessions.get(session_key).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, session_key: &str) -> bool {
        self.sessions.contains_key(session_key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    pub fn history(&self) -> &Arc<dyn MessageHistory> {
        &self.history
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistory;
    use serde_json::json;

    fn registry() -> (SessionRegistry, Arc<InMemoryHistory>) {
        let history = Arc::new(InMemoryHistory::new());
        let reg = SessionRegistry::new("unused/sessions.json", history.clone());
        (reg, history)
    }

    #[test]
    fn anonymous_first_connection_is_not_room_indexed() {
        let (reg, _) = registry();
        let (conn, _peer) = Connection::pair(4);
        reg.add_or_attach("s1", conn, None);

        assert!(reg.contains("s1"));
        assert_eq!(reg.rooms().user_for_session("s1"), None);
        assert_eq!(reg.rooms().user_count(), 0);
    }

    #[test]
    fn late_authentication_joins_room() {
        let (reg, _) = registry();
        let (first, _p1) = Connection::pair(4);
        reg.add_or_attach("s1", first, None);
        let (second, _p2) = Connection::pair(4);
        reg.add_or_attach("s1", second, Some("u1"));

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.rooms().sessions_for_user("u1"), vec!["s1".to_string()]);
        assert_eq!(reg.get("s1").unwrap().uid().as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn send_error_and_message_shapes() {
        let (reg, history) = registry();
        let (conn, mut peer) = Connection::pair(4);
        reg.add_or_attach("s1", conn, None);

        assert!(reg.send_error("s1", "nope").await);
        assert!(reg.send_message("s1", "yes").await);

        assert_eq!(peer.outbound.recv().await, Some(json!({"error": true, "message": "nope"})));
        assert_eq!(peer.outbound.recv().await, Some(json!({"message": "yes"})));
        assert_eq!(history.len("s1"), 2);
    }

    #[tokio::test]
    async fn dead_session_still_records_but_does_not_receive() {
        let (reg, history) = registry();
        let (c1, mut p1) = Connection::pair(4);
        let (c2, p2) = Connection::pair(4);
        reg.add_or_attach("s1", c1, Some("u1"));
        reg.add_or_attach("s2", c2, Some("u1"));

        drop(p2.inbound);
        assert!(reg.drive_receive("s2", |_| async {}).await);
        assert!(!reg.get("s2").unwrap().is_alive());

        assert!(reg.send_message("s1", "hello").await);
        assert_eq!(p1.outbound.recv().await, Some(json!({"message": "hello"})));
        assert_eq!(history.len("s1"), 1);
        assert_eq!(history.len("s2"), 1);
        // disconnect keeps the room membership
        assert_eq!(reg.rooms().sessions_for_user("u1").len(), 2);
    }

    #[tokio::test]
    async fn superseded_attach_leaves_newer_connection_unclaimed() {
        let (reg, _) = registry();
        let (c1, p1) = Connection::pair(4);
        let first = reg.add_or_attach("s1", c1, None);
        let (c2, p2) = Connection::pair(4);
        let second = reg.add_or_attach("s1", c2, None);
        assert!(second > first);

        // the first caller gives up without taking the second connection
        assert!(reg.drive_attached("s1", first, |_| async {}).await);
        assert!(reg.get("s1").unwrap().is_alive());

        drop(p1);
        p2.inbound.send(json!({"action": "message"})).await.unwrap();
        drop(p2.inbound);
        let mut seen = 0;
        assert!(
            reg.drive_attached("s1", second, |_| {
                seen += 1;
                async {}
            })
            .await
        );
        assert_eq!(seen, 1);
        assert!(!reg.get("s1").unwrap().is_alive());
    }

    #[tokio::test]
    async fn drive_receive_unknown_session_returns_immediately() {
        let (reg, _) = registry();
        assert!(!reg.drive_receive("ghost", |_| async {}).await);
    }

    #[test]
    fn evict_removes_session_and_membership() {
        let (reg, _) = registry();
        let (conn, _peer) = Connection::pair(4);
        reg.add_or_attach("s1", conn, Some("u1"));

        assert!(reg.evict("s1"));
        assert!(!reg.evict("s1"));
        assert!(reg.is_empty());
        assert!(reg.rooms().sessions_for_user("u1").is_empty());
    }
}
