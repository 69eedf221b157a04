//! OpenAI-compatible chat-completions client.
//!
//! Implements the `DecisionMaker` trait against the chat-completions wire
//! format (https://api.openai.com/v1/chat/completions), which most hosted
//! gateways also speak. Authenticates with a bearer API key.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    AiError, Decision, DecisionKind, DecisionMaker, Message, Role, TokenUsage, ToolCall,
    ToolDefinition,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Chat-completions client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Create config from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, AiError> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::ApiError("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Point the client at an OpenAI-compatible gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Chat-completions API client.
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the JSON request body for the chat-completions API.
    fn build_request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let mut msgs = Vec::new();
        for msg in messages {
            match msg.role {
                Role::System => msgs.push(serde_json::json!({
                    "role": "system",
                    "content": msg.content,
                })),
                Role::User => msgs.push(serde_json::json!({
                    "role": "user",
                    "content": msg.content,
                })),
                Role::Assistant => {
                    let mut entry = serde_json::json!({
                        "role": "assistant",
                        "content": msg.content,
                    });
                    if !msg.tool_calls.is_empty() {
                        // The protocol wants arguments re-encoded as a JSON string
                        let calls: Vec<_> = msg
                            .tool_calls
                            .iter()
                            .map(|call| {
                                serde_json::json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": call.arguments.to_string(),
                                    }
                                })
                            })
                            .collect();
                        entry["tool_calls"] = serde_json::json!(calls);
                    }
                    msgs.push(entry);
                }
                Role::Tool => msgs.push(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": msg.tool_call_id,
                    "content": msg.content,
                })),
            }
        }

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": msgs,
        });

        if !tools.is_empty() {
            let tool_defs: Vec<_> = tools
                .iter()
                .map(|tool| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = serde_json::json!(tool_defs);
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    /// Parse a chat-completions response into a decision.
    fn parse_response(&self, json: serde_json::Value) -> Result<Decision, AiError> {
        let message = json["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .map(|choice| &choice["message"])
            .ok_or_else(|| AiError::ParseError("no choices in response".into()))?;

        let content = message["content"].as_str().unwrap_or_default().to_string();

        let requests: Vec<ToolCall> = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        let arguments_text = call["function"]["arguments"].as_str().unwrap_or("{}");
                        let arguments =
                            serde_json::from_str(arguments_text).unwrap_or_else(|e| {
                                warn!("tool call arguments are not valid JSON: {e}");
                                serde_json::json!({})
                            });
                        ToolCall {
                            id: call["id"].as_str().unwrap_or("").to_string(),
                            name: call["function"]["name"].as_str().unwrap_or("").to_string(),
                            arguments,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = TokenUsage {
            input_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0),
        };

        let kind = if requests.is_empty() {
            DecisionKind::FinalAnswer { content }
        } else {
            DecisionKind::ToolRequests { content, requests }
        };

        Ok(Decision { kind, usage })
    }
}

#[async_trait]
impl DecisionMaker for OpenAiClient {
    async fn decide(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Decision, AiError> {
        let body = self.build_request_body(messages, tools);

        debug!(model = %self.config.model, "chat-completions request");

        let response = self
            .http
            .post(&self.config.base_url)
            .header("authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::ApiError(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::ParseError(e.to_string()))?;

        self.parse_response(json)
    }
}
