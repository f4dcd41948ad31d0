//! Provider trait: the abstraction over generative model backends.
//!
//! A Provider takes a prompt plus prior conversation and an optional tool
//! catalog, and returns one model message in canonical form. Translation to
//! and from the vendor wire format lives entirely inside the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ConversationHistory, Message, ToolRequest};
use crate::tool::ToolDeclaration;

/// Sampling parameters for a single model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: None,
        }
    }
}

/// One model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "gemini-2.0-flash")
    pub model: String,

    /// Sent as the final user turn after the history
    pub prompt: String,

    /// Prior conversation, oldest first
    #[serde(default)]
    pub history: ConversationHistory,

    /// Tools the model may request; empty means tool calling is off
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,

    #[serde(default)]
    pub config: GenerationConfig,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            history: ConversationHistory::default(),
            tools: Vec::new(),
            config: GenerationConfig::default(),
        }
    }

    pub fn with_history(mut self, history: ConversationHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ProviderResponse {
    /// Concatenated text parts; empty when the model only requested tools.
    pub fn text(&self) -> String {
        self.message.text()
    }

    /// Tool requests in the order the model emitted them.
    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        self.message.tool_requests()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The orchestrator calls `generate()` without knowing which vendor sits
/// behind it. Implementations must not retry internally.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Run one generation and return the model's message.
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
