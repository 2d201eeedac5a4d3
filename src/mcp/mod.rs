//! MCP transport: JSON-RPC 2.0 over newline-delimited stdio.
//!
//! The only surface the server exposes: `initialize`, `ping`, `tools/list`
//! and `tools/call`, plus the `initialized` and `cancelled` notifications.

pub mod codec;
pub mod router;
pub mod server;

pub use router::{McpRouter, RpcError, SUPPORTED_PROTOCOL_VERSIONS};
pub use server::McpServer;
