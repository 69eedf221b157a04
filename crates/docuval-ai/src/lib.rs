//! Validation agent engine for docuval.
//!
//! Provides:
//! - The conversation data model (messages, tool invocation requests)
//! - The `DecisionMaker` boundary to the remote model
//! - An OpenAI-compatible chat-completions client
//! - Deterministic validation checks over static reference data
//! - The bounded tool-calling `Session` loop
//! - Document classification and routing
//! - Token usage accounting

pub mod checks;
pub mod openai;
pub mod registry;
pub mod session;
pub mod usage;
pub mod workflow;

use async_trait::async_trait;

pub use checks::{invoice_registry, receipt_registry, ReferenceData};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use registry::{CheckResult, DispatchError, ToolRegistry};
pub use session::{Session, SessionOutcome, SessionState};
pub use usage::UsageLedger;
pub use workflow::{DocumentKind, DocumentWorkflow, WorkflowOutcome};

/// The remote decision-maker boundary.
///
/// One operation: given the conversation so far and the callable tools,
/// produce either tool invocation requests or a final answer. Implemented
/// by the OpenAI client in production and by scripted stubs in tests.
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn decide(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Decision, AiError>;
}

/// One round's output from the decision-maker.
#[derive(Debug, Clone)]
pub struct Decision {
    pub kind: DecisionKind,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub enum DecisionKind {
    /// The model wants one or more tools invoked before it can answer.
    /// `content` carries any text the model emitted alongside the requests.
    ToolRequests {
        content: String,
        requests: Vec<ToolCall>,
    },
    /// The model produced its final answer; the session is done.
    FinalAnswer { content: String },
}

/// A single conversation message.
///
/// Assistant messages may carry tool invocation requests; tool-result
/// messages carry the id and name of the request they answer so the
/// remote side can correlate them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A callable tool as advertised to the decision-maker.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema typed parameters.
    pub parameters: serde_json::Value,
}

/// A tool invocation request produced by the decision-maker.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Timeout")]
    Timeout,
}
