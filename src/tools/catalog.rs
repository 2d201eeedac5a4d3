//! Tool registry: descriptors, capability hints and name-keyed dispatch.
//!
//! The registry is built once at startup and never mutated afterwards.
//! Registration order is preserved for listing; names are unique and a
//! duplicate registration is a fatal startup error.

use crate::tools::handler::ToolHandler;
use crate::tools::result::ToolResult;
use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

// =============================================================================
// Capability hints
// =============================================================================

/// Behavioural hints surfaced to callers. Metadata only: nothing enforces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHints {
    pub read_only: bool,
    pub idempotent: bool,
    pub destructive: bool,
    pub open_world: bool,
}

impl ToolHints {
    /// Query against the remote backend.
    pub const READ: Self = Self {
        read_only: true,
        idempotent: true,
        destructive: false,
        open_world: true,
    };

    /// Creates a new remote resource on every call.
    pub const CREATE: Self = Self {
        read_only: false,
        idempotent: false,
        destructive: false,
        open_world: true,
    };

    /// Overwrites or removes an existing remote resource.
    pub const DESTRUCTIVE: Self = Self {
        read_only: false,
        idempotent: true,
        destructive: true,
        open_world: true,
    };
}

// =============================================================================
// Tool descriptor
// =============================================================================

/// Immutable metadata for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub hints: ToolHints,
    /// JSON Schema of the argument object.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Render as an entry of an MCP `tools/list` response.
    pub fn to_mcp_tool(&self) -> Value {
        json!({
            "name": self.name,
            "title": self.title,
            "description": self.description,
            "inputSchema": self.input_schema,
            "annotations": {
                "title": self.title,
                "readOnlyHint": self.hints.read_only,
                "destructiveHint": self.hints.destructive,
                "idempotentHint": self.hints.idempotent,
                "openWorldHint": self.hints.open_world,
            },
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Descriptor bound to its handler.
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

/// Ordered, name-unique set of tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails on an empty or already-registered name.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Result<()> {
        if descriptor.name.is_empty() {
            return Err(Error::config("tool name cannot be empty"));
        }
        if self.index.contains_key(&descriptor.name) {
            return Err(Error::DuplicateTool(descriptor.name));
        }
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { descriptor, handler });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.descriptor.name.as_str()).collect()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    /// Dispatch a call by name.
    ///
    /// An unknown name is a protocol error. Everything the handler raises is
    /// recovered into a [`ToolResult`].
    pub async fn call(&self, name: &str, arguments: Value, cancel: CancellationToken) -> Result<ToolResult> {
        let tool = self.get(name).ok_or_else(|| Error::unknown_tool(name))?;

        let outcome = tool
            .handler
            .call(arguments, cancel)
            .instrument(tracing::info_span!("tool_call", tool = name))
            .await;
        if let Err(e) = &outcome {
            tracing::warn!(tool = name, user_error = e.is_user_error(), "tool call failed: {}", e);
        }
        Ok(ToolResult::from_outcome(outcome))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
