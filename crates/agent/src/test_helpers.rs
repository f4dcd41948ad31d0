//! Shared test helpers for orchestrator tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use concierge_core::error::{ProviderError, ToolError};
use concierge_core::message::{ContentPart, Message, Role};
use concierge_core::provider::{GenerateRequest, Provider, ProviderResponse, Usage};
use concierge_core::tool::{Tool, ToolRegistry};
use serde_json::{Value, json};

/// A mock provider that replays scripted results in order and records
/// every request it receives.
pub struct ScriptedProvider {
    script: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(ProviderError::InvalidResponse("script exhausted".into()));
        }
        script.remove(0)
    }
}

fn response(message: Message) -> ProviderResponse {
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "test-model".into(),
    }
}

/// A plain text answer.
pub fn text_response(text: &str) -> ProviderResponse {
    response(Message::model(text))
}

/// An answer that only requests tools.
pub fn tool_response(calls: Vec<(&str, Value)>) -> ProviderResponse {
    let parts = calls
        .into_iter()
        .map(|(name, input)| ContentPart::tool_request(name, input))
        .collect();
    response(Message::new(Role::Model, parts))
}

/// Availability stub that always offers a single 09:00 slot.
struct StubAvailability;

#[async_trait]
impl Tool for StubAvailability {
    fn name(&self) -> &str {
        "checkAvailability"
    }
    fn description(&self) -> &str {
        "Check available time slots"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "providerId": { "type": "string" },
                "date": { "type": "string" }
            },
            "required": ["providerId", "date"]
        })
    }
    fn side_effect_free(&self) -> bool {
        true
    }
    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        Ok(json!({
            "date": input["date"],
            "slots": ["09:00"],
            "providerName": "Acme"
        }))
    }
}

struct Exploding;

#[async_trait]
impl Tool for Exploding {
    fn name(&self) -> &str {
        "explode"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        Err(ToolError::Handler("boom".into()))
    }
}

/// Records its name into a shared log once its delay has elapsed.
struct Sleeper {
    name: String,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Tool for Sleeper {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Sleeps, then reports"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }
    fn side_effect_free(&self) -> bool {
        true
    }
    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.lock().unwrap().push(self.name.clone());
        Ok(json!({"tool": self.name}))
    }
}

pub fn availability_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(StubAvailability)).unwrap();
    registry
}

pub fn failing_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(Exploding)).unwrap();
    registry
}

/// Side-effect-free tools that finish after `(name, delay_ms)`, plus the
/// completion log they share.
pub fn ordered_registry(tools: &[(&str, u64)]) -> (ToolRegistry, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    for (name, delay_ms) in tools {
        registry
            .register(Box::new(Sleeper {
                name: name.to_string(),
                delay: Duration::from_millis(*delay_ms),
                log: log.clone(),
            }))
            .unwrap();
    }
    (registry, log)
}
