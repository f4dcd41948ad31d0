//! Situational context for the prompt: who is asking, and about whom.

use std::sync::Arc;

use concierge_core::Error;
use concierge_core::store::ProfileStore;
use tracing::{debug, warn};

/// Builds the `## Current User Context` block from the profile store.
///
/// Best-effort: an unknown user or any store failure yields an empty string.
#[derive(Clone)]
pub struct ContextBuilder {
    profiles: Arc<dyn ProfileStore>,
}

impl ContextBuilder {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    pub async fn build(&self, user_id: &str, session_id: &str) -> String {
        match self.try_build(user_id, session_id).await {
            Ok(context) => context,
            Err(e) => {
                warn!(user_id, session_id, error = %e, "Proceeding without user context");
                String::new()
            }
        }
    }

    async fn try_build(&self, user_id: &str, session_id: &str) -> Result<String, Error> {
        let unavailable = |e: concierge_core::StoreError| Error::ContextUnavailable(e.to_string());

        let Some(user) = self.profiles.get_user(user_id).await.map_err(unavailable)? else {
            debug!(user_id, "No profile for user");
            return Ok(String::new());
        };
        let session = self.profiles.get_session(session_id).await.map_err(unavailable)?;

        let mut context = String::from("\n## Current User Context\n");
        context.push_str(&format!("- User: {}\n", user.display_name()));
        context.push_str(&format!(
            "- Role: {}\n",
            user.role.as_deref().filter(|r| !r.is_empty()).unwrap_or("client")
        ));

        if let Some(provider_id) = session.and_then(|s| s.provider_id)
            && let Some(provider) = self.profiles.get_user(&provider_id).await.map_err(unavailable)?
            && let Some(business) = provider.business_name.filter(|n| !n.is_empty())
        {
            context.push_str(&format!("- Inquiring about: {business}\n"));
        }

        if let Some(location) = &user.location {
            context.push_str(&format!(
                "- Location: {}\n",
                location.city.as_deref().unwrap_or("Unknown")
            ));
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_core::StoreError;
    use concierge_core::store::{Location, SessionInfo, UserProfile};
    use concierge_store::InMemoryStore;

    async fn store_with_client() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .put_user(UserProfile {
                id: "u1".into(),
                email: "ana@example.com".into(),
                location: Some(Location::default()),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .put_user(UserProfile {
                id: "p1".into(),
                email: "salon@example.com".into(),
                business_name: Some("Glow Salon".into()),
                role: Some("provider".into()),
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
        store
    }

    #[tokio::test]
    async fn full_context_block() {
        let builder = ContextBuilder::new(Arc::new(store_with_client().await));
        let context = builder.build("u1", "s1").await;
        assert_eq!(
            context,
            "\n## Current User Context\n\
             - User: ana@example.com\n\
             - Role: client\n\
             - Inquiring about: Glow Salon\n\
             - Location: Unknown\n"
        );
    }

    #[tokio::test]
    async fn session_without_provider_omits_inquiry() {
        let builder = ContextBuilder::new(Arc::new(store_with_client().await));
        let context = builder.build("p1", "missing-session").await;
        assert!(context.contains("- User: Glow Salon"));
        assert!(context.contains("- Role: provider"));
        assert!(!context.contains("Inquiring about"));
        assert!(!context.contains("Location"));
    }

    #[tokio::test]
    async fn provider_without_business_name_omits_inquiry() {
        let store = store_with_client().await;
        store
            .put_user(UserProfile {
                id: "p1".into(),
                email: "salon@example.com".into(),
                role: Some("provider".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let builder = ContextBuilder::new(Arc::new(store));
        let context = builder.build("u1", "s1").await;
        assert!(context.contains("- User: ana@example.com"));
        assert!(!context.contains("Inquiring about"));
        assert!(!context.contains("salon@example.com"));
    }

    #[tokio::test]
    async fn unknown_user_yields_empty_context() {
        let builder = ContextBuilder::new(Arc::new(InMemoryStore::new()));
        assert_eq!(builder.build("nobody", "s1").await, "");
    }

    struct BrokenProfiles;

    #[async_trait]
    impl ProfileStore for BrokenProfiles {
        async fn get_user(&self, _user_id: &str) -> Result<Option<UserProfile>, StoreError> {
            Err(StoreError::Storage("connection refused".into()))
        }
        async fn get_session(&self, _session_id: &str) -> Result<Option<SessionInfo>, StoreError> {
            Err(StoreError::Storage("connection refused".into()))
        }
        async fn put_user(&self, _user: UserProfile) -> Result<(), StoreError> {
            Ok(())
        }
        async fn put_session(&self, _session: SessionInfo) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_failure_yields_empty_context() {
        let builder = ContextBuilder::new(Arc::new(BrokenProfiles));
        assert_eq!(builder.build("u1", "s1").await, "");
    }
}
