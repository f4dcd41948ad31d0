//! In-memory store: useful for testing and ephemeral sessions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::error::StoreError;
use concierge_core::store::{HistoryStore, ProfileStore, SessionInfo, StoredMessage, UserProfile};
use tokio::sync::RwLock;

/// Keeps history and profiles in process memory.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    history: Arc<RwLock<HashMap<String, Vec<StoredMessage>>>>,
    users: Arc<RwLock<HashMap<String, UserProfile>>>,
    sessions: Arc<RwLock<HashMap<String, SessionInfo>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored messages across sessions.
    pub async fn message_count(&self) -> usize {
        self.history.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_recent(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        let history = self.history.read().await;
        Ok(history
            .get(session_id)
            .map(|messages| crate::most_recent(messages, limit))
            .unwrap_or_default())
    }

    async fn append(&self, message: StoredMessage) -> Result<(), StoreError> {
        self.history
            .write()
            .await
            .entry(message.session_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionInfo>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn put_user(&self, user: UserProfile) -> Result<(), StoreError> {
        self.users.write().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn put_session(&self, session: SessionInfo) -> Result<(), StoreError> {
        self.sessions.write().await.insert(session.id.clone(), session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_recent_is_bounded_and_chronological() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .append(StoredMessage::new("s1", "user", format!("m{i}")))
                .await
                .unwrap();
        }
        store.append(StoredMessage::new("s2", "user", "other")).await.unwrap();

        let recent = store.load_recent("s1", 3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert_eq!(store.message_count().await, 6);
    }

    #[tokio::test]
    async fn unknown_session_has_no_history() {
        let store = InMemoryStore::new();
        assert!(store.load_recent("missing", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profiles_roundtrip() {
        let store = InMemoryStore::new();
        store
            .put_user(UserProfile {
                id: "u1".into(),
                email: "ana@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .put_session(SessionInfo {
                id: "s1".into(),
                user_id: Some("u1".into()),
                provider_id: Some("p1".into()),
            })
            .await
            .unwrap();

        assert_eq!(store.get_user("u1").await.unwrap().unwrap().email, "ana@example.com");
        assert!(store.get_user("nobody").await.unwrap().is_none());
        assert_eq!(
            store.get_session("s1").await.unwrap().unwrap().provider_id.as_deref(),
            Some("p1")
        );
    }
}
