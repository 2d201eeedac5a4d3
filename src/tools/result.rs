//! Result mapping: handler outcomes into MCP `CallToolResult` envelopes.
//!
//! Handlers return typed errors; this is the one place they are turned into
//! caller-facing text. Payloads pass through unmodified.

use crate::backend::BackendResponse;
use crate::types::Result;
use serde_json::{json, Value};

/// Successful tool payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Structured backend response.
    Json(Value),
    /// Raw text (dashboard YAML), never re-encoded as JSON.
    Text(String),
    /// Backend succeeded without a body.
    Empty,
}

impl From<BackendResponse> for ToolOutput {
    fn from(response: BackendResponse) -> Self {
        match response {
            BackendResponse::Json(v) => ToolOutput::Json(v),
            BackendResponse::Text(t) => ToolOutput::Text(t),
            BackendResponse::Empty => ToolOutput::Empty,
        }
    }
}

/// Outcome of one tool call. Exactly one variant is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(ToolOutput),
    Failure { message: String, is_user_error: bool },
}

impl ToolResult {
    /// Map a handler outcome, keeping the error's own message.
    pub fn from_outcome(outcome: Result<ToolOutput>) -> Self {
        match outcome {
            Ok(output) => ToolResult::Success(output),
            Err(err) => ToolResult::Failure {
                message: err.to_string(),
                is_user_error: err.is_user_error(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Failure { .. })
    }

    /// Render as an MCP `CallToolResult` object.
    pub fn to_call_result(&self) -> Value {
        match self {
            ToolResult::Success(ToolOutput::Json(payload)) => {
                let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
                let mut result = json!({
                    "content": [text_block(text)],
                    "isError": false,
                });
                // structuredContent must be an object per the MCP schema.
                if payload.is_object() {
                    result["structuredContent"] = payload.clone();
                }
                result
            }
            ToolResult::Success(ToolOutput::Text(text)) => json!({
                "content": [text_block(text.clone())],
                "isError": false,
            }),
            ToolResult::Success(ToolOutput::Empty) => json!({
                "content": [],
                "isError": false,
            }),
            ToolResult::Failure { message, .. } => json!({
                "content": [text_block(message.clone())],
                "isError": true,
            }),
        }
    }
}

fn text_block(text: String) -> Value {
    json!({ "type": "text", "text": text })
}
