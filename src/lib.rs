//! # Uptrace MCP
//!
//! Model Context Protocol server exposing the Uptrace observability API as
//! named tools:
//! - Spans, span groups, traces, timeseries and latency quantiles
//! - Dashboards (CRUD, YAML import/export, tags, templates)
//! - Monitors and metric exploration
//!
//! ## Architecture
//!
//! Every tool call takes the same path:
//! ```text
//!   tools/call ─→ ToolRegistry ─→ OperationHandler<O>
//!                                   │  O::normalize(input, DefaultPolicy)
//!                                   ▼
//!                             NormalizedRequest ─→ Backend (UptraceClient)
//!                                                     │
//!   CallToolResult ←─ ToolResult::from_outcome ←──────┘
//! ```
//! The registry is immutable once built; handlers share the policy and the
//! backend by `Arc`, so concurrent calls need no locking.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod mcp;
pub mod tools;
pub mod types;
pub mod validation;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
