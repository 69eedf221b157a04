//! Tool registry: a fixed mapping from function name to a deterministic
//! handler over the injected reference data.
//!
//! Handlers return a business [`CheckResult`] (a failed validation is a
//! normal result, not an error) or an argument-shape error the session
//! surfaces back to the decision-maker so it can self-correct.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ToolCall, ToolDefinition};

/// The result payload every validation function produces.
///
/// Serialized as `{"valid": <bool>, "message": <string>}` into the
/// tool-result message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub valid: bool,
    pub message: String,
}

impl CheckResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }

    /// JSON text for the tool-result message content.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"valid":false,"message":"result serialization failed"}"#.to_string()
        })
    }
}

/// Why a single tool invocation could not be dispatched.
///
/// Fatal for the invocation, never for the session: the error text becomes
/// that tool's result content and the loop continues.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },
}

impl DispatchError {
    /// JSON text for the tool-result message content, shaped distinctly
    /// from a business result so the model can tell the two apart.
    pub fn to_payload(&self) -> String {
        serde_json::json!({ "error": self.to_string() }).to_string()
    }
}

/// Handler signature: pure function of the request arguments.
/// `Err` carries the malformed-arguments reason.
pub type CheckHandler = Box<dyn Fn(&serde_json::Value) -> Result<CheckResult, String> + Send + Sync>;

/// Immutable name → handler mapping plus the tool definitions advertised
/// to the decision-maker. Built once at session construction.
#[derive(Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, CheckHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. The definition's name keys the handler.
    pub fn register(&mut self, definition: ToolDefinition, handler: CheckHandler) {
        self.handlers.insert(definition.name.clone(), handler);
        self.definitions.push(definition);
    }

    /// Tool definitions in registration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Look up and invoke the handler for one request.
    pub fn dispatch(&self, call: &ToolCall) -> Result<CheckResult, DispatchError> {
        let handler = self
            .handlers
            .get(&call.name)
            .ok_or_else(|| DispatchError::UnknownFunction(call.name.clone()))?;

        handler(&call.arguments).map_err(|reason| DispatchError::InvalidArguments {
            name: call.name.clone(),
            reason,
        })
    }
}

/// Extract a required string argument from a request's argument object.
pub(crate) fn require_str<'a>(
    arguments: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, String> {
    arguments
        .get(key)
        .ok_or_else(|| format!("missing required field '{key}'"))?
        .as_str()
        .ok_or_else(|| format!("field '{key}' must be a string"))
}
