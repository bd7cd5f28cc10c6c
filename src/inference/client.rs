//! OpenAI-compatible model backend.
//!
//! Both supported provider kinds (OpenRouter and Ollama) expose the Chat
//! Completions API, so one client type serves them, parameterized by the
//! stored provider config. Each `complete` is a single non-streaming call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use uuid::Uuid;

use super::backend::ModelBackend;
use super::config::{ProviderConfig, ProviderKind};
use super::errors::InferenceError;
use super::types::{
    ChatCompletionRequest, ChatMessage, CompletionRequest, CompletionResponse,
    FunctionCallResponse, FunctionDefinition, Message, Role, TokenUsage, ToolArguments, ToolCall,
    ToolCallResponse, ToolDeclaration, ToolDefinition,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout. Hosted models with tool catalogs can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Application name reported to OpenRouter for its dashboard.
const OPENROUTER_APP_TITLE: &str = "goalcoach";

// ─── OpenAiCompatibleBackend ─────────────────────────────────────────────────

/// A backend speaking the OpenAI Chat Completions protocol.
pub struct OpenAiCompatibleBackend {
    http: HttpClient,
    name: String,
    kind: ProviderKind,
    base_url: String,
    api_key: String,
    default_model: String,
    active: bool,
}

impl OpenAiCompatibleBackend {
    /// Build a backend from a stored provider config.
    ///
    /// Does NOT check connectivity. Fails only for unknown provider kinds or
    /// if the HTTP client cannot be constructed.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, InferenceError> {
        let kind = config
            .kind()
            .ok_or_else(|| InferenceError::UnsupportedProvider {
                kind: config.provider.clone(),
            })?;
        let base_url = config
            .effective_base_url()
            .unwrap_or_else(|| kind.default_base_url().to_string());

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            name: config.name.clone(),
            kind,
            base_url,
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
            active: config.is_active,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Translate a provider-agnostic request into the wire body.
    fn build_request_body(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let model = request
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        let tools = to_wire_tools(&request.tools);
        let tool_choice = tools.as_ref().map(|_| "auto".to_string());

        ChatCompletionRequest {
            model,
            messages: to_wire_messages(&request.system_prompt, &request.messages),
            tools,
            tool_choice,
            stream: false,
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.active
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(request);

        tracing::debug!(
            provider = %self.name,
            url = %url,
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion"
        );

        let mut builder = self.http.post(&url).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        if self.kind == ProviderKind::OpenRouter {
            builder = builder.header("X-Title", OPENROUTER_APP_TITLE);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    duration_secs: REQUEST_TIMEOUT.as_secs(),
                }
            } else {
                InferenceError::ConnectionFailed {
                    endpoint: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| InferenceError::ResponseParse {
                reason: format!("failed to read response body: {e}"),
            })?;

        let parsed = parse_completion_response(&body_text)?;
        tracing::info!(
            provider = %self.name,
            model = %parsed.model,
            total_tokens = parsed.usage.total_tokens,
            tool_calls = parsed.tool_calls.len(),
            finish_reason = parsed.finish_reason.as_deref().unwrap_or(""),
            "chat completion finished"
        );
        Ok(parsed)
    }
}

// ─── Request Translation ─────────────────────────────────────────────────────

/// System message first, then the role-tagged turns in order.
fn to_wire_messages(system_prompt: &str, messages: &[Message]) -> Vec<ChatMessage> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    wire.push(ChatMessage {
        role: Role::System,
        content: Some(system_prompt.to_string()),
        tool_call_id: None,
        tool_calls: None,
    });

    for message in messages {
        let tool_calls = (!message.tool_calls.is_empty())
            .then(|| message.tool_calls.iter().map(to_wire_tool_call).collect());
        wire.push(ChatMessage {
            role: message.role,
            content: Some(message.content.clone()),
            tool_call_id: message.tool_call_id.clone(),
            tool_calls,
        });
    }
    wire
}

fn to_wire_tool_call(call: &ToolCall) -> ToolCallResponse {
    ToolCallResponse {
        id: call.id.clone(),
        r#type: "function".to_string(),
        function: FunctionCallResponse {
            name: call.name.clone(),
            arguments: serde_json::Value::Object(call.arguments.clone()).to_string(),
        },
    }
}

fn to_wire_tools(tools: &[ToolDeclaration]) -> Option<Vec<ToolDefinition>> {
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|tool| ToolDefinition {
                r#type: "function".to_string(),
                function: FunctionDefinition {
                    name: tool.name.to_string(),
                    description: tool.description.to_string(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect(),
    )
}

// ─── Response Parsing ────────────────────────────────────────────────────────

/// Parse a non-streaming chat completion body.
///
/// Tool calls whose argument string is not a JSON object are logged and
/// skipped; the remaining calls and the content are still returned.
pub(crate) fn parse_completion_response(body: &str) -> Result<CompletionResponse, InferenceError> {
    #[derive(Deserialize)]
    struct WireResponse {
        #[serde(default)]
        model: String,
        choices: Vec<WireChoice>,
        #[serde(default)]
        usage: Option<WireUsage>,
    }

    #[derive(Deserialize)]
    struct WireChoice {
        message: WireMessage,
        finish_reason: Option<String>,
    }

    #[derive(Deserialize)]
    struct WireMessage {
        content: Option<String>,
        tool_calls: Option<Vec<WireToolCall>>,
    }

    #[derive(Deserialize)]
    struct WireToolCall {
        id: Option<String>,
        function: WireFunction,
    }

    #[derive(Deserialize)]
    struct WireFunction {
        name: String,
        #[serde(default)]
        arguments: String,
    }

    #[derive(Deserialize)]
    struct WireUsage {
        #[serde(default)]
        prompt_tokens: u32,
        #[serde(default)]
        completion_tokens: u32,
        #[serde(default)]
        total_tokens: u32,
    }

    let resp: WireResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ResponseParse {
            reason: format!("invalid completion body: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::ResponseParse {
            reason: "empty choices array".into(),
        })?;

    let mut tool_calls = Vec::new();
    for tc in choice.message.tool_calls.unwrap_or_default() {
        match decode_arguments(&tc.function.arguments) {
            Ok(arguments) => tool_calls.push(ToolCall {
                id: tc.id.unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                name: tc.function.name,
                arguments,
            }),
            Err(reason) => {
                tracing::warn!(
                    tool = %tc.function.name,
                    raw = %tc.function.arguments,
                    reason = %reason,
                    "skipping tool call with undecodable arguments"
                );
            }
        }
    }

    let usage = resp
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        model: resp.model,
        usage,
        finish_reason: choice.finish_reason,
    })
}

/// Decode a raw argument string into a parameter map.
///
/// An empty string means "no arguments".
fn decode_arguments(raw: &str) -> Result<ToolArguments, String> {
    if raw.trim().is_empty() {
        return Ok(ToolArguments::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::{ParamType, ToolParam};
    use chrono::Utc;

    fn config(provider: &str) -> ProviderConfig {
        let now = Utc::now();
        ProviderConfig {
            id: 1,
            name: "cloud".into(),
            provider: provider.into(),
            base_url: String::new(),
            api_key: "sk-test".into(),
            default_model: "openai/gpt-4o-mini".into(),
            is_default: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    const NOTE: ToolDeclaration = ToolDeclaration {
        name: "take_note",
        description: "Write something down",
        params: &[ToolParam {
            name: "text",
            param_type: ParamType::String,
            description: "What to write",
            required: true,
            enum_values: &[],
        }],
    };

    #[test]
    fn test_from_config_rejects_unknown_kind() {
        let err = OpenAiCompatibleBackend::from_config(&config("anthropic"))
            .err()
            .unwrap();
        assert!(matches!(err, InferenceError::UnsupportedProvider { kind } if kind == "anthropic"));
    }

    #[test]
    fn test_from_config_uses_kind_default_url() {
        let backend = OpenAiCompatibleBackend::from_config(&config("openrouter")).unwrap();
        assert_eq!(backend.base_url(), "https://openrouter.ai/api/v1");
        assert_eq!(backend.kind(), ProviderKind::OpenRouter);
        assert!(backend.is_available());
    }

    #[test]
    fn test_inactive_config_reports_unavailable() {
        let mut cfg = config("ollama");
        cfg.is_active = false;
        let backend = OpenAiCompatibleBackend::from_config(&cfg).unwrap();
        assert!(!backend.is_available());
    }

    #[test]
    fn test_request_puts_system_prompt_first() {
        let backend = OpenAiCompatibleBackend::from_config(&config("openrouter")).unwrap();
        let request = CompletionRequest {
            system_prompt: "You are a coach.".into(),
            messages: vec![Message::user("hi"), Message::assistant("hello")],
            tools: vec![],
            model: None,
        };

        let body = backend.build_request_body(&request);
        assert_eq!(body.messages.len(), 3);
        assert_eq!(body.messages[0].role, Role::System);
        assert_eq!(body.messages[0].content.as_deref(), Some("You are a coach."));
        assert_eq!(body.messages[2].role, Role::Assistant);
        assert!(body.tools.is_none());
        assert!(body.tool_choice.is_none());
    }

    #[test]
    fn test_request_model_override_wins() {
        let backend = OpenAiCompatibleBackend::from_config(&config("openrouter")).unwrap();
        let mut request = CompletionRequest::default();
        assert_eq!(backend.build_request_body(&request).model, "openai/gpt-4o-mini");

        request.model = Some("anthropic/claude-3.5-haiku".into());
        assert_eq!(
            backend.build_request_body(&request).model,
            "anthropic/claude-3.5-haiku"
        );
    }

    #[test]
    fn test_request_serializes_tools_and_tool_turns() {
        let backend = OpenAiCompatibleBackend::from_config(&config("openrouter")).unwrap();
        let mut args = ToolArguments::new();
        args.insert("text".into(), serde_json::json!("buy milk"));
        let call = ToolCall {
            id: "call_1".into(),
            name: "take_note".into(),
            arguments: args,
        };
        let request = CompletionRequest {
            system_prompt: "sys".into(),
            messages: vec![
                Message::user("note this"),
                Message::assistant_with_tool_calls("", vec![call]),
                Message::tool_result("call_1", r#"{"ok":true}"#),
            ],
            tools: vec![NOTE],
            model: None,
        };

        let json = serde_json::to_value(backend.build_request_body(&request)).unwrap();
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "take_note");
        assert_eq!(
            json["tools"][0]["function"]["parameters"]["required"],
            serde_json::json!(["text"])
        );

        let assistant = &json["messages"][2];
        assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
        let raw_args = assistant["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        let decoded: serde_json::Value = serde_json::from_str(raw_args).unwrap();
        assert_eq!(decoded["text"], "buy milk");

        let tool = &json["messages"][3];
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
    }

    #[test]
    fn test_parse_response_with_content_and_usage() {
        let body = r#"{
            "model": "openai/gpt-4o-mini",
            "choices": [{"message": {"content": "Let's plan."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let resp = parse_completion_response(body).unwrap();
        assert_eq!(resp.content, "Let's plan.");
        assert_eq!(resp.model, "openai/gpt-4o-mini");
        assert_eq!(resp.usage.total_tokens, 15);
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert!(resp.tool_calls.is_empty());
    }

    #[test]
    fn test_parse_response_skips_undecodable_arguments() {
        let body = r#"{
            "model": "m",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "a", "type": "function", "function": {"name": "create_task", "arguments": "{\"title\": \"Read ch. 1\"}"}},
                        {"id": "b", "type": "function", "function": {"name": "create_task", "arguments": "{not json"}},
                        {"id": "c", "type": "function", "function": {"name": "create_task", "arguments": "[1, 2]"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let resp = parse_completion_response(body).unwrap();
        assert_eq!(resp.content, "");
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].id, "a");
        assert_eq!(resp.tool_calls[0].arguments["title"], "Read ch. 1");
    }

    #[test]
    fn test_parse_response_empty_arguments_and_missing_id() {
        let body = r#"{
            "choices": [{
                "message": {"tool_calls": [{"function": {"name": "present_task", "arguments": ""}}]},
                "finish_reason": "tool_calls"
            }]
        }"#;
        let resp = parse_completion_response(body).unwrap();
        assert_eq!(resp.tool_calls.len(), 1);
        assert!(resp.tool_calls[0].id.starts_with("call_"));
        assert!(resp.tool_calls[0].arguments.is_empty());
        assert_eq!(resp.usage, TokenUsage::default());
    }

    #[test]
    fn test_parse_response_empty_choices_is_error() {
        let err = parse_completion_response(r#"{"model": "m", "choices": []}"#).unwrap_err();
        assert!(matches!(err, InferenceError::ResponseParse { .. }));
    }

    #[test]
    fn test_parse_response_invalid_body_is_error() {
        let err = parse_completion_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, InferenceError::ResponseParse { .. }));
    }
}
