//! The turn orchestrator.
//!
//! One user message is answered with at most two model round-trips:
//!
//! ```text
//! BUILD_CONTEXT → GENERATE_1 ─(no tool requests)──────────────────────→ DONE
//!                            └→ EXECUTE_TOOLS → GENERATE_2 → SANITIZE → DONE
//! any failure ──────────────────────────────────────────────────────→ FAILED
//! ```
//!
//! FAILED still produces a [`TurnResult`]: an apology text and no tool calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use concierge_config::AppConfig;
use concierge_core::message::{ConversationHistory, ToolRequest};
use concierge_core::provider::{GenerateRequest, GenerationConfig, Provider};
use concierge_core::store::HistoryStore;
use concierge_core::tool::{ToolCallRecord, ToolRegistry};
use concierge_core::{Error, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::context::ContextBuilder;
use crate::sanitize::sanitize;

/// The receptionist instruction prepended to every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI receptionist.
When you receive tool outputs, use them to answer the user's question naturally.
CRITICAL: DO NOT output raw JSON, 'tool_outputs' blocks, or debug information in your final response.
Only provide the natural language answer. The system will handle showing the data cards to the user.";

/// Returned when tools ran but the final text came back empty.
pub const FALLBACK_TEXT: &str = "I've found some results for you:";

/// States of one turn, used as a structured log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    BuildContext,
    Generate1,
    ExecuteTools,
    Generate2,
    Sanitize,
    Done,
    Failed,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnPhase::BuildContext => "BUILD_CONTEXT",
            TurnPhase::Generate1 => "GENERATE_1",
            TurnPhase::ExecuteTools => "EXECUTE_TOOLS",
            TurnPhase::Generate2 => "GENERATE_2",
            TurnPhase::Sanitize => "SANITIZE",
            TurnPhase::Done => "DONE",
            TurnPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// The answer to one user message plus its tool-call audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl TurnResult {
    /// The user-facing answer for a failed turn.
    pub fn apology(error: &Error) -> Self {
        Self {
            text: format!("I apologize, but I encountered an error: {error}. Please try again."),
            tool_calls: Vec::new(),
        }
    }
}

/// First-generation prompt: instruction, context, then the user's message.
pub fn build_prompt(system_prompt: &str, context: &str, message: &str) -> String {
    format!("{system_prompt}\n\n{context}\n\nUser: {message}")
}

/// Second-generation prompt: the first prompt with every tool output folded in.
pub fn build_followup_prompt(prompt: &str, records: &[ToolCallRecord]) -> String {
    let outputs = records
        .iter()
        .map(|r| format!("Tool '{}' returned: {}", r.name, r.output))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "{prompt}\n\nSystem: I have executed the tools. Here are the results:\n{outputs}\n\nPlease provide a helpful response to the user based ONLY on these results."
    )
}

/// Drives a single tool-calling turn.
///
/// Holds only shared, read-only collaborators; concurrent turns for
/// different sessions can share one orchestrator.
pub struct TurnOrchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    history: Arc<dyn HistoryStore>,
    context: ContextBuilder,
    model: String,
    generation: GenerationConfig,
    system_prompt: String,
    history_limit: usize,
    turn_timeout: Option<Duration>,
    concurrent_tools: bool,
}

impl TurnOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        history: Arc<dyn HistoryStore>,
        context: ContextBuilder,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            history,
            context,
            model: model.into(),
            generation: GenerationConfig::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            history_limit: concierge_core::message::DEFAULT_HISTORY_LIMIT,
            turn_timeout: None,
            concurrent_tools: false,
        }
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation = config;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Deadline for the whole turn; expiry takes the FAILED path.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    /// Run a turn's tool calls concurrently when all are side-effect free.
    pub fn with_concurrent_tools(mut self, enabled: bool) -> Self {
        self.concurrent_tools = enabled;
        self
    }

    /// Apply generation and agent settings from the loaded configuration.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.generation = GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        };
        self.history_limit = config.agent.history_limit;
        self.concurrent_tools = config.agent.concurrent_side_effect_free_tools;
        self.turn_timeout = match config.agent.turn_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        if let Some(prompt) = config.agent.system_prompt_override.as_deref().filter(|p| !p.trim().is_empty()) {
            self.system_prompt = prompt.to_string();
        }
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer one user message. Never fails.
    pub async fn run_turn(&self, user_id: &str, session_id: &str, message: &str) -> TurnResult {
        info!(user_id, session_id, "Turn started");
        let pipeline = self.run_pipeline(user_id, session_id, message);

        let outcome = match self.turn_timeout {
            Some(limit) => tokio::time::timeout(limit, pipeline).await.unwrap_or_else(|_| {
                Err(Error::ModelCallFailed(ProviderError::Timeout(format!(
                    "turn exceeded {}ms",
                    limit.as_millis()
                ))))
            }),
            None => pipeline.await,
        };

        match outcome {
            Ok(result) => {
                info!(
                    phase = %TurnPhase::Done,
                    session_id,
                    tool_calls = result.tool_calls.len(),
                    "Turn finished"
                );
                result
            }
            Err(e) => {
                error!(phase = %TurnPhase::Failed, session_id, error = %e, "Turn failed");
                TurnResult::apology(&e)
            }
        }
    }

    async fn run_pipeline(&self, user_id: &str, session_id: &str, message: &str) -> Result<TurnResult, Error> {
        debug!(phase = %TurnPhase::BuildContext, session_id);
        let history = self.load_history(session_id).await;
        let context = self.context.build(user_id, session_id).await;
        let prompt = build_prompt(&self.system_prompt, &context, message);

        debug!(phase = %TurnPhase::Generate1, history_len = history.len());
        let first = self
            .provider
            .generate(
                GenerateRequest::new(&self.model, prompt.clone())
                    .with_history(history.clone())
                    .with_tools(self.tools.declarations())
                    .with_config(self.generation.clone()),
            )
            .await?;

        let requests = first.tool_requests();
        if requests.is_empty() {
            return Ok(TurnResult {
                text: sanitize(&first.text()),
                tool_calls: Vec::new(),
            });
        }

        debug!(phase = %TurnPhase::ExecuteTools, count = requests.len());
        let records = self.execute_tools(requests).await;

        debug!(phase = %TurnPhase::Generate2);
        let second = self
            .provider
            .generate(
                GenerateRequest::new(&self.model, build_followup_prompt(&prompt, &records))
                    .with_history(history)
                    .with_config(self.generation.clone()),
            )
            .await?;

        let ignored = second.tool_requests();
        if !ignored.is_empty() {
            info!(
                count = ignored.len(),
                "Ignoring tool requests from the second generation"
            );
        }

        debug!(phase = %TurnPhase::Sanitize);
        let mut text = sanitize(&second.text());
        if text.trim().is_empty() {
            text = FALLBACK_TEXT.to_string();
        }

        Ok(TurnResult {
            text,
            tool_calls: records,
        })
    }

    /// Recent history for the session; a store failure means no history.
    async fn load_history(&self, session_id: &str) -> ConversationHistory {
        match self.history.load_recent(session_id, self.history_limit).await {
            Ok(stored) => ConversationHistory::normalize(&stored).truncate_to_recent(self.history_limit),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to load history, continuing without it");
                ConversationHistory::default()
            }
        }
    }

    /// Execute requested tools. Records are always in emission order.
    async fn execute_tools(&self, requests: Vec<ToolRequest>) -> Vec<ToolCallRecord> {
        let concurrent = self.concurrent_tools
            && requests.len() > 1
            && requests.iter().all(|r| self.tools.is_side_effect_free(&r.name));

        if concurrent {
            debug!(count = requests.len(), "Running side-effect-free tools concurrently");
            return futures::future::join_all(requests.into_iter().map(|r| self.invoke(r))).await;
        }

        let mut records = Vec::with_capacity(requests.len());
        for request in requests {
            records.push(self.invoke(request).await);
        }
        records
    }

    async fn invoke(&self, request: ToolRequest) -> ToolCallRecord {
        let start = Instant::now();
        let output = self.tools.invoke(&request.name, request.input.clone()).await;
        let record = ToolCallRecord::new(request.name, request.input, output, start.elapsed());
        debug!(
            tool = %record.name,
            duration_ms = record.duration_ms,
            failed = record.is_error(),
            "Tool call finished"
        );
        record
    }
}
