use std::collections::HashMap;

use parking_lot::RwLock;

/// Room index: session_key -> user_key, user_key -> [session_key...].
///
/// Both directions live behind one lock so a reader never observes one side
/// updated and the other stale. `associate`/`dissociate` are the only mutators.
#[derive(Default)]
pub struct RoomIndex {
    inner: RwLock<Rooms>,
}

#[derive(Default)]
struct Rooms {
    session_to_user: HashMap<String, String>,
    /// Insertion order, most recently associated last. No duplicates.
    user_to_sessions: HashMap<String, Vec<String>>,
}

impl Rooms {
    fn detach(&mut self, session_key: &str) -> Option<String> {
        let user_key = self.session_to_user.remove(session_key)?;
        if let Some(list) = self.user_to_sessions.get_mut(&user_key) {
            list.retain(|s| s != session_key);
            if list.is_empty() {
                self.user_to_sessions.remove(&user_key);
            }
        }
        Some(user_key)
    }
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `user_key` the owner of `session_key`, leaving any previous room.
    ///
    /// Panics on an empty `user_key`: callers resolve identity before getting here.
    pub fn associate(&self, session_key: &str, user_key: &str) {
        assert!(!user_key.is_empty(), "associate: user id must not be empty");

        let mut rooms = self.inner.write();
        if let Some(prev) = rooms.detach(session_key) {
            if prev != user_key {
                tracing::debug!(sid = %session_key, from = %prev, to = %user_key, "session changed owner");
            }
        }
        rooms
            .session_to_user
            .insert(session_key.to_string(), user_key.to_string());
        let list = rooms.user_to_sessions.entry(user_key.to_string()).or_default();
        list.push(session_key.to_string());
        tracing::debug!(sid = %session_key, uid = %user_key, room_size = list.len(), "session associated");
    }

    /// Forget `session_key`. Unknown keys are a no-op.
    pub fn dissociate(&self, session_key: &str) {
        if let Some(user_key) = self.inner.write().detach(session_key) {
            tracing::debug!(sid = %session_key, uid = %user_key, "session dissociated");
        }
    }

    pub fn sessions_for_user(&self, user_key: &str) -> Vec<String> {
        self.inner
            .read()
            .user_to_sessions
            .get(user_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn user_for_session(&self, session_key: &str) -> Option<String> {
        self.inner.read().session_to_user.get(session_key).cloned()
    }

    /// Fan-out targets for `session_key`: its owner's room, or just itself when
    /// it has no owner (anonymous sessions degrade to unicast).
    pub fn related_sessions(&self, session_key: &str) -> Vec<String> {
        let rooms = self.inner.read();
        match rooms.session_to_user.get(session_key) {
            Some(user_key) => rooms
                .user_to_sessions
                .get(user_key)
                .cloned()
                .unwrap_or_default(),
            None => vec![session_key.to_string()],
        }
    }

    pub fn user_count(&self) -> usize {
        self.inner.read().user_to_sessions.len()
    }

    /// Check both directions agree. Used by tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        let rooms = self.inner.read();
        let forward = rooms.session_to_user.iter().all(|(sid, uid)| {
            rooms.user_to_sessions.iter().all(|(other, list)| {
                let n = list.iter().filter(|s| *s == sid).count();
                if other == uid { n == 1 } else { n == 0 }
            })
        });
        let backward = rooms.user_to_sessions.iter().all(|(uid, list)| {
            !list.is_empty()
                && list
                    .iter()
                    .all(|sid| rooms.session_to_user.get(sid) == Some(uid))
        });
        forward && backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unassociated_session_is_related_only_to_itself() {
        let rooms = RoomIndex::new();
        assert_eq!(rooms.related_sessions("s1"), vec!["s1".to_string()]);
        assert_eq!(rooms.user_for_session("s1"), None);
    }

    #[test]
    fn repeated_associate_is_idempotent() {
        let rooms = RoomIndex::new();
        rooms.associate("s1", "A");
        rooms.associate("s2", "A");
        rooms.associate("s1", "A");
        rooms.associate("s1", "A");

        let mut related = rooms.related_sessions("s2");
        related.sort();
        assert_eq!(related, vec!["s1".to_string(), "s2".to_string()]);
        // re-association moves s1 to the most-recent end
        assert_eq!(rooms.sessions_for_user("A"), vec!["s2".to_string(), "s1".to_string()]);
    }

    #[test]
    fn reassociate_moves_session_between_users() {
        let rooms = RoomIndex::new();
        rooms.associate("s1", "A");
        rooms.associate("s1", "B");

        assert!(rooms.sessions_for_user("A").is_empty());
        assert_eq!(rooms.sessions_for_user("B"), vec!["s1".to_string()]);
        assert_eq!(rooms.user_for_session("s1").as_deref(), Some("B"));
        assert_eq!(rooms.user_count(), 1);
    }

    #[test]
    fn dissociate_unknown_is_noop() {
        let rooms = RoomIndex::new();
        rooms.associate("s1", "A");
        rooms.dissociate("nope");
        assert_eq!(rooms.sessions_for_user("A"), vec!["s1".to_string()]);

        rooms.dissociate("s1");
        assert!(rooms.sessions_for_user("A").is_empty());
        assert_eq!(rooms.related_sessions("s1"), vec!["s1".to_string()]);
    }

    #[test]
    #[should_panic(expected = "user id must not be empty")]
    fn empty_user_id_fails_loudly() {
        RoomIndex::new().associate("s1", "");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Associate(u8, u8),
        Dissociate(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..8, 0u8..4).prop_map(|(s, u)| Op::Associate(s, u)),
            (0u8..8).prop_map(Op::Dissociate),
        ]
    }

    proptest! {
        #[test]
        fn both_directions_stay_consistent(ops in proptest::collection::vec(op(), 0..64)) {
            let rooms = RoomIndex::new();
            let mut model: HashMap<String, String> = HashMap::new();

            for op in ops {
                match op {
                    Op::Associate(s, u) => {
                        let (sid, uid) = (format!("s{s}"), format!("u{u}"));
                        rooms.associate(&sid, &uid);
                        model.insert(sid, uid);
                    }
                    Op::Dissociate(s) => {
                        let sid = format!("s{s}");
                        rooms.dissociate(&sid);
                        model.remove(&sid);
                    }
                }
                prop_assert!(rooms.is_consistent());
            }

            for s in 0u8..8 {
                let sid = format!("s{s}");
                prop_assert_eq!(rooms.user_for_session(&sid), model.get(&sid).cloned());

                let mut related = rooms.related_sessions(&sid);
                related.sort();
                let mut expected: Vec<String> = match model.get(&sid) {
                    Some(uid) => model
                        .iter()
                        .filter(|(_, owner)| *owner == uid)
                        .map(|(k, _)| k.clone())
                        .collect(),
                    None => vec![sid.clone()],
                };
                expected.sort();
                prop_assert_eq!(related, expected);
            }
        }
    }
}
