//! Google Gemini provider implementation.
//!
//! Uses the `generateContent` REST endpoint directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - Roles `user` / `model` / `function`
//! - Native function calling with `functionCall` / `functionResponse` parts
//! - Tool schemas sanitized for the API's JSON Schema dialect

use async_trait::async_trait;
use concierge_core::error::ProviderError;
use concierge_core::message::{ContentPart, ConversationHistory, Message, Role, EMPTY_TEXT_PLACEHOLDER};
use concierge_core::provider::*;
use concierge_core::tool::ToolDeclaration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Schema keywords the API rejects at the top level of a declaration.
const UNSUPPORTED_SCHEMA_KEYS: [&str; 2] = ["additionalProperties", "$schema"];

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Register under a different provider name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Build the full request body for one generation.
    fn build_body(request: &GenerateRequest) -> GeminiRequest {
        let mut contents = to_provider_history(&request.history);
        let prompt = Message::user(request.prompt.clone());
        contents.push(to_provider_content(&prompt));

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(to_provider_tools(&request.tools))
        };

        GeminiRequest {
            contents,
            tools,
            generation_config: GeminiGenerationConfig {
                temperature: request.config.temperature,
                max_output_tokens: request.config.max_output_tokens,
            },
        }
    }
}

/// Map canonical history onto Gemini `contents`.
///
/// A message made only of tool responses is sent with role `function`;
/// otherwise users stay `user` and everything else becomes `model`.
pub fn to_provider_history(history: &ConversationHistory) -> Vec<GeminiContent> {
    history.iter().map(to_provider_content).collect()
}

fn to_provider_content(message: &Message) -> GeminiContent {
    let all_tool_responses = !message.content.is_empty()
        && message
            .content
            .iter()
            .all(|part| matches!(part, ContentPart::ToolResponse(_)));

    let role = if all_tool_responses || message.role == Role::Tool {
        "function"
    } else if message.role == Role::User {
        "user"
    } else {
        "model"
    };

    let mut parts: Vec<GeminiPart> = message.content.iter().map(to_provider_part).collect();
    if parts.is_empty() {
        parts.push(GeminiPart::text(EMPTY_TEXT_PLACEHOLDER));
    }

    GeminiContent {
        role: Some(role.to_string()),
        parts,
    }
}

fn to_provider_part(part: &ContentPart) -> GeminiPart {
    match part {
        ContentPart::Text(text) if text.is_empty() => GeminiPart::text(EMPTY_TEXT_PLACEHOLDER),
        ContentPart::Text(text) => GeminiPart::text(text.clone()),
        ContentPart::ToolRequest(request) => GeminiPart {
            function_call: Some(GeminiFunctionCall {
                name: request.name.clone(),
                args: request.input.clone(),
            }),
            ..Default::default()
        },
        ContentPart::ToolResponse(response) => GeminiPart {
            function_response: Some(GeminiFunctionResponse {
                name: response.name.clone(),
                response: serde_json::json!({
                    "name": response.name,
                    "content": response.output,
                }),
            }),
            ..Default::default()
        },
    }
}

/// Wrap declarations in a single `functionDeclarations` tool.
pub fn to_provider_tools(tools: &[ToolDeclaration]) -> Vec<GeminiTool> {
    vec![GeminiTool {
        function_declarations: tools
            .iter()
            .map(|t| GeminiFunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: strip_unsupported_schema_keys(&t.input_schema),
            })
            .collect(),
    }]
}

/// Remove top-level keys the API rejects. Nested schemas are left as-is.
pub fn strip_unsupported_schema_keys(schema: &serde_json::Value) -> serde_json::Value {
    let mut schema = schema.clone();
    if let Some(object) = schema.as_object_mut() {
        for key in UNSUPPORTED_SCHEMA_KEYS {
            object.remove(key);
        }
    }
    schema
}

/// Convert a parsed API response into canonical form.
pub fn from_provider_response(
    resp: GeminiResponse,
    requested_model: &str,
) -> std::result::Result<ProviderResponse, ProviderError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("response contained no candidates".into()))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let mut content = Vec::with_capacity(parts.len());
    for part in parts {
        if let Some(call) = part.function_call {
            content.push(ContentPart::tool_request(call.name, normalize_args(call.args)));
        } else if let Some(response) = part.function_response {
            content.push(ContentPart::tool_response(response.name, response.response));
        } else if let Some(text) = part.text {
            content.push(ContentPart::text(text));
        }
    }
    if content.is_empty() {
        debug!(
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
            "Candidate carried no usable parts"
        );
    }

    let usage = resp.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    Ok(ProviderResponse {
        message: Message {
            role: Role::Model,
            content,
        },
        usage,
        model: resp.model_version.unwrap_or_else(|| requested_model.to_string()),
    })
}

/// Function calls without arguments arrive with `args` missing or null.
fn normalize_args(args: serde_json::Value) -> serde_json::Value {
    if args.is_null() {
        serde_json::json!({})
    } else {
        args
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed("Invalid Gemini API key".into()),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl concierge_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "No API key set for Gemini (set CONCIERGE_API_KEY or GEMINI_API_KEY)".into(),
            ));
        }

        let url = self.endpoint(&request.model);
        let body = Self::build_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            history_len = request.history.len(),
            tools = request.tools.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(status_error(status, error_body));
        }

        let api_resp: GeminiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Gemini response: {e}"))
        })?;

        from_provider_response(api_resp, &request.model)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionResponse {
    pub name: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::Provider;
    use serde_json::json;

    fn declaration(schema: serde_json::Value) -> ToolDeclaration {
        ToolDeclaration {
            name: "searchProviders".into(),
            description: "Search for providers".into(),
            input_schema: schema,
            output_schema: None,
            side_effect_free: true,
        }
    }

    #[test]
    fn constructor() {
        let provider = GeminiProvider::new("key");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = GeminiProvider::new("key").with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(provider.base_url, "http://localhost:9999/v1beta");
        assert_eq!(
            provider.endpoint("gemini-2.0-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn history_roles_are_mapped() {
        let history = ConversationHistory::new(vec![
            Message::user("Hi"),
            Message::model("Hello!"),
            Message::new(
                Role::Model,
                vec![ContentPart::tool_response("checkAvailability", json!({"slots": []}))],
            ),
        ]);
        let contents = to_provider_history(&history);
        let roles: Vec<&str> = contents.iter().filter_map(|c| c.role.as_deref()).collect();
        assert_eq!(roles, vec!["user", "model", "function"]);
    }

    #[test]
    fn tool_parts_use_function_shapes() {
        let message = Message::new(
            Role::Model,
            vec![ContentPart::tool_request("checkAvailability", json!({"providerId": "p1"}))],
        );
        let content = to_provider_content(&message);
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["parts"][0]["functionCall"]["name"], "checkAvailability");
        assert_eq!(json["parts"][0]["functionCall"]["args"]["providerId"], "p1");

        let message = Message::new(
            Role::Tool,
            vec![ContentPart::tool_response("checkAvailability", json!({"slots": ["09:00"]}))],
        );
        let json = serde_json::to_value(to_provider_content(&message)).unwrap();
        let response = &json["parts"][0]["functionResponse"];
        assert_eq!(response["name"], "checkAvailability");
        assert_eq!(response["response"]["name"], "checkAvailability");
        assert_eq!(response["response"]["content"]["slots"][0], "09:00");
    }

    #[test]
    fn empty_text_becomes_single_space() {
        let message = Message {
            role: Role::User,
            content: vec![ContentPart::text("")],
        };
        let content = to_provider_content(&message);
        assert_eq!(content.parts[0].text.as_deref(), Some(" "));

        let message = Message {
            role: Role::Model,
            content: vec![],
        };
        let content = to_provider_content(&message);
        assert_eq!(content.parts.len(), 1);
        assert_eq!(content.parts[0].text.as_deref(), Some(" "));
    }

    #[test]
    fn prompt_is_final_user_turn() {
        let request = GenerateRequest::new("gemini-2.0-flash", "What's open tomorrow?")
            .with_history(vec![Message::user("earlier"), Message::model("reply")].into());
        let body = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "What's open tomorrow?");
        assert!(body.get("tools").is_none());
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn tools_are_wrapped_in_one_declaration_block() {
        let request = GenerateRequest::new("m", "p").with_tools(vec![
            declaration(json!({"type": "object"})),
            declaration(json!({"type": "object"})),
        ]);
        let body = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["functionDeclarations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn only_top_level_schema_keys_are_stripped() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "filters": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {}
                }
            }
        });
        let tools = to_provider_tools(&[declaration(schema)]);
        let params = &tools[0].function_declarations[0].parameters;
        assert!(params.get("$schema").is_none());
        assert!(params.get("additionalProperties").is_none());
        assert_eq!(params["properties"]["filters"]["additionalProperties"], false);
    }

    #[test]
    fn response_parts_become_content_parts() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Let me look. "},
                        {"functionCall": {"name": "searchProviders", "args": {"query": "dentist"}}},
                        {"functionCall": {"name": "checkAvailability"}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15},
            "modelVersion": "gemini-2.0-flash-001"
        }))
        .unwrap();

        let response = from_provider_response(resp, "gemini-2.0-flash").unwrap();
        assert_eq!(response.text(), "Let me look. ");
        let requests = response.tool_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].name, "searchProviders");
        assert_eq!(requests[0].input["query"], "dentist");
        assert_eq!(requests[1].input, json!({}));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
        assert_eq!(response.model, "gemini-2.0-flash-001");
    }

    #[test]
    fn empty_candidate_yields_empty_text() {
        let blocked: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": []}, "finishReason": "SAFETY"}]
        }))
        .unwrap();
        let response = from_provider_response(blocked, "m").unwrap();
        assert_eq!(response.text(), "");
        assert!(response.tool_requests().is_empty());

        let no_content: GeminiResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert_eq!(from_provider_response(no_content, "m").unwrap().text(), "");

        let empty_text: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": ""}]}}]
        }))
        .unwrap();
        assert_eq!(from_provider_response(empty_text, "m").unwrap().text(), "");
    }

    #[test]
    fn missing_candidates_is_invalid_response() {
        let resp: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        let err = from_provider_response(resp, "m").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(status_error(429, String::new()), ProviderError::RateLimited { .. }));
        assert!(matches!(status_error(401, String::new()), ProviderError::AuthenticationFailed(_)));
        assert!(matches!(status_error(403, String::new()), ProviderError::AuthenticationFailed(_)));
        assert!(matches!(
            status_error(500, "oops".into()),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = GeminiProvider::new("");
        let err = provider
            .generate(GenerateRequest::new("gemini-2.0-flash", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
