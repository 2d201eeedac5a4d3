//! JSON-RPC method routing for the MCP surface.
//!
//! Pure request/response logic; the server owns I/O, concurrency and
//! cancellation bookkeeping.

use crate::tools::ToolRegistry;
use crate::types::{rpc_code, Error};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

pub const SERVER_NAME: &str = "uptrace-mcp";

const INSTRUCTIONS: &str = "Uptrace is an open-source observability platform for distributed tracing, \
    metrics, and logs. For comprehensive documentation optimized for LLMs, see https://uptrace.dev/llms.txt";

// =============================================================================
// JSON-RPC envelopes
// =============================================================================

/// Protocol-level error returned in a JSON-RPC `error` member.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(rpc_code::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(rpc_code::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(rpc_code::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(rpc_code::INVALID_PARAMS, message)
    }
}

impl From<Error> for RpcError {
    fn from(err: Error) -> Self {
        Self::new(err.to_rpc_code(), err.to_string())
    }
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

pub fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message,
        },
    })
}

/// Shape of one inbound JSON-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Request { id: Value, method: String, params: Value },
    Notification { method: String, params: Value },
    /// A response to a request we never send; dropped.
    Response,
    /// Not a valid JSON-RPC message; carries the error response to send.
    Invalid(Value),
}

impl Incoming {
    pub fn classify(message: Value) -> Self {
        let Value::Object(mut obj) = message else {
            return Incoming::Invalid(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        let id = obj.remove("id");
        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Incoming::Invalid(error_response(
                id.unwrap_or(Value::Null),
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let method = match obj.remove("method") {
            Some(Value::String(m)) => m,
            Some(_) => {
                return Incoming::Invalid(error_response(
                    id.unwrap_or(Value::Null),
                    RpcError::invalid_request("method must be a string"),
                ))
            }
            None if obj.contains_key("result") || obj.contains_key("error") => return Incoming::Response,
            None => {
                return Incoming::Invalid(error_response(
                    id.unwrap_or(Value::Null),
                    RpcError::invalid_request("missing method"),
                ))
            }
        };
        let params = obj.remove("params").unwrap_or(Value::Null);

        match id {
            Some(id) => Incoming::Request { id, method, params },
            None => Incoming::Notification { method, params },
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Method router over a fixed tool registry.
#[derive(Debug)]
pub struct McpRouter {
    registry: Arc<ToolRegistry>,
}

impl McpRouter {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer every method except `tools/call`, which the server runs as a task.
    pub fn handle_sync(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize(params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list()),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        json!({
            "protocolVersion": negotiate_version(requested),
            "capabilities": {
                "tools": { "listChanged": false },
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "title": "Uptrace",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "instructions": INSTRUCTIONS,
        })
    }

    fn tools_list(&self) -> Value {
        let tools: Vec<Value> = self.registry.descriptors().map(|d| d.to_mcp_tool()).collect();
        json!({ "tools": tools })
    }

    /// Run `tools/call`. Tool failures come back as `isError` results; only
    /// malformed params and unknown tools are protocol errors.
    pub async fn call_tool(&self, params: Value, cancel: CancellationToken) -> Result<Value, RpcError> {
        let (name, arguments) = parse_call_params(params)?;
        let result = self.registry.call(&name, arguments, cancel).await?;
        Ok(result.to_call_result())
    }
}

/// Echo a supported client version, otherwise offer the newest one.
pub fn negotiate_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|r| SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|v| *v == r))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

fn parse_call_params(params: Value) -> Result<(String, Value), RpcError> {
    let Value::Object(mut params) = params else {
        return Err(RpcError::invalid_params("tools/call params must be an object"));
    };
    let name = match params.remove("name") {
        Some(Value::String(name)) => name,
        _ => return Err(RpcError::invalid_params("tools/call requires string field 'name'")),
    };
    let arguments = match params.remove("arguments") {
        Some(Value::Object(map)) => Value::Object(map),
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(_) => return Err(RpcError::invalid_params("tools/call 'arguments' must be an object")),
    };
    Ok((name, arguments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolDescriptor, ToolHandler, ToolHints, ToolOutput};
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl ToolHandler for Fixed {
        async fn call(&self, arguments: Value, _cancel: CancellationToken) -> crate::Result<ToolOutput> {
            Ok(ToolOutput::Json(json!({ "echo": arguments })))
        }
    }

    fn router() -> McpRouter {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor {
                    name: "list_monitors".to_string(),
                    title: "List monitors".to_string(),
                    description: "List monitors.".to_string(),
                    hints: ToolHints::READ,
                    input_schema: json!({"type": "object", "properties": {}}),
                },
                Arc::new(Fixed),
            )
            .unwrap();
        McpRouter::new(Arc::new(registry))
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            Incoming::classify(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})),
            Incoming::Request { method, .. } if method == "ping"
        ));
        assert!(matches!(
            Incoming::classify(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
            Incoming::Notification { .. }
        ));
        assert_eq!(
            Incoming::classify(json!({"jsonrpc": "2.0", "id": 4, "result": {}})),
            Incoming::Response
        );

        let Incoming::Invalid(resp) = Incoming::classify(json!({"id": 2, "method": "ping"})) else {
            panic!("expected invalid");
        };
        assert_eq!(resp["id"], 2);
        assert_eq!(resp["error"]["code"], rpc_code::INVALID_REQUEST);

        assert!(matches!(Incoming::classify(json!("ping")), Incoming::Invalid(_)));
    }

    #[test]
    fn test_negotiate_version() {
        assert_eq!(negotiate_version(Some("2024-11-05")), "2024-11-05");
        assert_eq!(negotiate_version(Some("1999-01-01")), SUPPORTED_PROTOCOL_VERSIONS[0]);
        assert_eq!(negotiate_version(None), SUPPORTED_PROTOCOL_VERSIONS[0]);
    }

    #[test]
    fn test_initialize_and_list() {
        let r = router();
        let init = r
            .handle_sync("initialize", &json!({"protocolVersion": "2025-03-26"}))
            .unwrap();
        assert_eq!(init["protocolVersion"], "2025-03-26");
        assert_eq!(init["serverInfo"]["name"], SERVER_NAME);
        assert!(init["instructions"].as_str().unwrap().contains("llms.txt"));

        let list = r.handle_sync("tools/list", &Value::Null).unwrap();
        assert_eq!(list["tools"][0]["name"], "list_monitors");
        assert_eq!(list["tools"][0]["annotations"]["readOnlyHint"], true);

        let err = r.handle_sync("resources/list", &Value::Null).unwrap_err();
        assert_eq!(err.code, rpc_code::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_call_tool() {
        let r = router();
        let result = r
            .call_tool(json!({"name": "list_monitors"}), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["echo"], json!({}));
    }

    #[tokio::test]
    async fn test_call_tool_protocol_errors() {
        let r = router();
        let unknown = r
            .call_tool(json!({"name": "greet"}), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(unknown.code, rpc_code::INVALID_PARAMS);
        assert!(unknown.message.contains("greet"));

        let bad_args = r
            .call_tool(json!({"name": "list_monitors", "arguments": [1]}), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(bad_args.code, rpc_code::INVALID_PARAMS);

        let no_name = r.call_tool(json!({}), CancellationToken::new()).await.unwrap_err();
        assert_eq!(no_name.code, rpc_code::INVALID_PARAMS);
    }
}
