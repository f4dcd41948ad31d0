//! Tool trait: the abstraction over things the model may ask to run.
//!
//! Tools are registered once at startup in a [`ToolRegistry`]. The registry
//! is the error boundary of tool execution: whatever goes wrong inside a
//! call comes back as a JSON `{"error": ...}` value for the model to read.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ToolError;

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclaration {
    /// Unique tool name (e.g., "searchProviders")
    pub name: String,

    /// Natural-language description sent to the model
    pub description: String,

    /// JSON Schema of the input object
    pub input_schema: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,

    /// Safe to run concurrently with other side-effect-free calls
    #[serde(default)]
    pub side_effect_free: bool,
}

/// One executed tool call, as recorded in a turn's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub name: String,
    pub input: Value,
    pub output: Value,
    #[serde(default)]
    pub duration_ms: u64,
}

impl ToolCallRecord {
    pub fn new(name: impl Into<String>, input: Value, output: Value, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Whether the output is a structured error value.
    pub fn is_error(&self) -> bool {
        self.output.get("error").is_some()
    }
}

/// The core Tool trait.
///
/// Each tool (searchProviders, checkAvailability, bookAppointment, ...)
/// implements this trait and is made available to the orchestrator through
/// the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's input.
    fn parameters_schema(&self) -> Value;

    fn output_schema(&self) -> Option<Value> {
        None
    }

    /// Whether calling this tool leaves the world unchanged.
    fn side_effect_free(&self) -> bool {
        false
    }

    /// Execute the tool with already-validated input.
    async fn execute(&self, input: Value) -> std::result::Result<Value, ToolError>;

    /// Convert this tool into a declaration for the model.
    fn to_declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
            output_schema: self.output_schema(),
            side_effect_free: self.side_effect_free(),
        }
    }
}

/// A registry of available tools, in registration order.
///
/// Populated once during startup and read-only afterwards; share it behind
/// an `Arc` across concurrent turns.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::AlreadyRegistered(tool.name().to_string()));
        }
        debug!(tool = tool.name(), "Registered tool");
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// All declarations, in registration order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.to_declaration()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Unknown tools count as having side effects.
    pub fn is_side_effect_free(&self, name: &str) -> bool {
        self.get(name).is_some_and(|t| t.side_effect_free())
    }

    /// Look up, validate and execute, surfacing failures as errors.
    pub async fn try_invoke(&self, name: &str, input: Value) -> std::result::Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        validate_input(&tool.parameters_schema(), &input).map_err(|reason| ToolError::InvalidInput {
            tool_name: name.to_string(),
            reason,
        })?;

        tool.execute(input).await
    }

    /// Execute a tool call. Never fails: errors become `{"error": message}`.
    pub async fn invoke(&self, name: &str, input: Value) -> Value {
        match self.try_invoke(name, input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                serde_json::json!({ "error": e.to_string() })
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `input` against the subset of JSON Schema tool declarations use:
/// top-level object type, `required`, primitive property `type`, and `enum`.
///
/// Numeric types also accept numeric strings; tools coerce them when reading.
fn validate_input(schema: &Value, input: &Value) -> std::result::Result<(), String> {
    if schema.get("type").and_then(Value::as_str) == Some("object") && !input.is_object() {
        return Err(format!("expected an object, got {}", json_type_name(input)));
    }
    let Some(object) = input.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if object.get(key).is_none_or(Value::is_null) {
                return Err(format!("missing required field '{key}'"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in object {
        let Some(property) = properties.get(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(expected) = property.get("type").and_then(Value::as_str)
            && !type_matches(expected, value)
        {
            return Err(format!(
                "field '{key}' should be {expected}, got {}",
                json_type_name(value)
            ));
        }
        if let Some(allowed) = property.get("enum").and_then(Value::as_array)
            && !allowed.contains(value)
        {
            return Err(format!("field '{key}' must be one of {}", Value::Array(allowed.clone())));
        }
    }
    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number() || numeric_str(value).is_some_and(|s| s.parse::<f64>().is_ok()),
        "integer" => {
            value.is_i64() || value.is_u64() || numeric_str(value).is_some_and(|s| s.parse::<i64>().is_ok())
        }
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn numeric_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
