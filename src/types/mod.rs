//! Core types for the Uptrace MCP server.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (ProjectId, DashboardId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for logging, defaults and the Uptrace API

mod config;
mod errors;
mod ids;

pub use config::{
    Config, DefaultsConfig, LogFormat, LoggingConfig, UptraceConfig, API_TOKEN_ENV, LIMIT_CEILING,
    MAX_TIME_WINDOW,
};
pub use errors::{rpc_code, BackendError, Error, Result, ValidationError, ValidationKind};
pub use ids::{DashboardId, ProjectId};
