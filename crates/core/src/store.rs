//! Store traits: the persisted collaborators of a turn.
//!
//! The orchestrator reads conversation history and user/session facts
//! through these traits only. Writing replies back is the caller's job
//! (the gateway or the CLI), never the orchestrator's.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::tool::ToolCallRecord;

/// A persisted chat message row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,

    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Free-form role string as written by the caller ("user", "assistant", ...)
    pub role: String,

    #[serde(default)]
    pub content: String,

    /// Audit trail attached to assistant replies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,

    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(session_id: impl Into<String>, role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            user_id: None,
            role: role.into(),
            content: content.into(),
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

/// Where a user is based.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A user record (clients and providers share the same shape).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,

    /// "client", "provider", ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Industries a provider serves
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub industries: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl UserProfile {
    /// Business name when set, otherwise the email.
    pub fn display_name(&self) -> &str {
        self.business_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}

/// A chat session, optionally scoped to one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// The provider the user is inquiring about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

/// Chat history persistence.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "file", "memory").
    fn name(&self) -> &str;

    /// The most recent `limit` messages of a session, oldest first.
    async fn load_recent(&self, session_id: &str, limit: usize) -> std::result::Result<Vec<StoredMessage>, StoreError>;

    /// Append one message to its session.
    async fn append(&self, message: StoredMessage) -> std::result::Result<(), StoreError>;
}

/// Lookup of users and sessions by id. Missing records are `Ok(None)`.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, StoreError>;

    async fn get_session(&self, session_id: &str) -> std::result::Result<Option<SessionInfo>, StoreError>;

    async fn put_user(&self, user: UserProfile) -> std::result::Result<(), StoreError>;

    async fn put_session(&self, session: SessionInfo) -> std::result::Result<(), StoreError>;
}
