//! Message and conversation domain types.
//!
//! These are the canonical value objects that flow through a turn:
//! stored chat rows are normalized into [`Message`]s, the provider adapter
//! translates them to and from the vendor format, and the orchestrator only
//! ever inspects [`ContentPart`]s.

use serde::{Deserialize, Serialize};

use crate::store::StoredMessage;

/// Default number of stored messages loaded into a turn.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Placeholder for empty turns; providers reject empty content.
pub const EMPTY_TEXT_PLACEHOLDER: &str = " ";

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The generative model
    Model,
    /// A tool result fed back to the model
    Tool,
}

impl Role {
    /// Map a stored role string onto the canonical roles.
    ///
    /// Only `"user"` is a user turn; everything else was said by the model.
    pub fn from_stored(role: &str) -> Self {
        if role == "user" { Role::User } else { Role::Model }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A model's request to run a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    pub input: serde_json::Value,
}

/// The output of a tool, addressed back to the model by tool name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub name: String,
    pub output: serde_json::Value,
}

/// One semantic unit within a message. Exactly one variant per part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentPart {
    Text(String),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl ContentPart {
    pub fn text(value: impl Into<String>) -> Self {
        ContentPart::Text(value.into())
    }

    pub fn tool_request(name: impl Into<String>, input: serde_json::Value) -> Self {
        ContentPart::ToolRequest(ToolRequest {
            name: name.into(),
            input,
        })
    }

    pub fn tool_response(name: impl Into<String>, output: serde_json::Value) -> Self {
        ContentPart::ToolResponse(ToolResponse {
            name: name.into(),
            output,
        })
    }

    /// A part carrying nothing a provider would accept.
    pub fn is_empty(&self) -> bool {
        matches!(self, ContentPart::Text(text) if text.is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// Ordered content parts; never empty once normalized
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self { role, content }.normalized()
    }

    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// Create a new model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![ContentPart::text(text)])
    }

    /// Replace empty parts (and an empty part list) with the placeholder text.
    ///
    /// Idempotent: normalizing a normalized message changes nothing.
    pub fn normalized(mut self) -> Self {
        if self.content.is_empty() {
            self.content.push(ContentPart::text(EMPTY_TEXT_PLACEHOLDER));
        }
        for part in &mut self.content {
            if part.is_empty() {
                *part = ContentPart::text(EMPTY_TEXT_PLACEHOLDER);
            }
        }
        self
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentPart::as_text).collect()
    }

    /// Tool requests in emission order.
    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolRequest(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Chronological, bounded conversation history for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Map stored rows into canonical messages.
    ///
    /// Any role other than `"user"` becomes [`Role::Model`]; blank content is
    /// coerced to the placeholder text so no message is ever empty.
    pub fn normalize(raw: &[StoredMessage]) -> Self {
        let messages = raw
            .iter()
            .map(|stored| {
                Message::new(
                    Role::from_stored(&stored.role),
                    vec![ContentPart::text(stored.content.clone())],
                )
            })
            .collect();
        Self { messages }
    }

    /// Keep only the most recent `limit` messages, preserving order.
    pub fn truncate_to_recent(mut self, limit: usize) -> Self {
        if self.messages.len() > limit {
            let excess = self.messages.len() - limit;
            self.messages.drain(..excess);
        }
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl From<Vec<Message>> for ConversationHistory {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}
