//! Tool infrastructure: defaults, normalization, dispatch, result mapping.
//!
//! A tool call flows registry → handler → normalizer → backend → mapper. The
//! registry owns descriptors and handlers; every handler is the same
//! composition over a per-operation normalizer.

pub mod catalog;
pub mod defaults;
pub mod handler;
pub mod ops;
pub mod request;
pub mod result;

pub use catalog::{RegisteredTool, ToolDescriptor, ToolHints, ToolRegistry};
pub use defaults::{DefaultPolicy, TimeRange};
pub use handler::{parse_arguments, Operation, OperationHandler, ToolContext, ToolHandler};
pub use ops::build_registry;
pub use request::{ApiCall, Endpoint, HttpMethod, NormalizedRequest, RequestBody, ResponseKind};
pub use result::{ToolOutput, ToolResult};
