use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;

use roomcast_core::protocol::{Payload, Role};

use super::MessageHistory;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub payload: Payload,
}

/// Per-session message log kept in process memory.
#[derive(Default)]
pub struct InMemoryHistory {
    entries: DashMap<String, Vec<HistoryEntry>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self, session_key: &str) -> Vec<HistoryEntry> {
        self.entries
            .get(session_key)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn len(&self, session_key: &str) -> usize {
        self.entries.get(session_key).map(|r| r.len()).unwrap_or(0)
    }

    /// Total entries across every session.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|r| r.value().len()).sum()
    }

    pub fn clear(&self, session_key: &str) {
        self.entries.remove(session_key);
    }
}

#[async_trait]
impl MessageHistory for InMemoryHistory {
    async fn record(&self, session_key: &str, role: Role, payload: &Payload) {
        tracing::trace!(sid = %session_key, role = role.as_str(), "history recorded");
        self.entries
            .entry(session_key.to_string())
            .or_default()
            .push(HistoryEntry { role, payload: payload.clone() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_per_session_in_order() {
        let h = InMemoryHistory::new();
        h.record("s1", Role::User, &json!({"action": "message"})).await;
        h.record("s1", Role::Assistant, &json!({"message": "hi"})).await;
        h.record("s2", Role::Assistant, &json!({"message": "hi"})).await;

        let s1 = h.messages("s1");
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].role, Role::User);
        assert_eq!(s1[1].payload, json!({"message": "hi"}));
        assert_eq!(h.total(), 3);

        h.clear("s1");
        assert_eq!(h.len("s1"), 0);
        assert_eq!(h.len("s2"), 1);
    }
}
