//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. Three classes exist:
//! - caller input problems ([`ValidationError`]), detected before any backend call
//! - backend call failures ([`BackendError`])
//! - startup/programming errors (`Error::Config`, `Error::DuplicateTool`)

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// JSON-RPC error codes used at the protocol boundary.
pub mod rpc_code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Main error enum for the Uptrace MCP server.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller input failed a required-field or shape precondition.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The outbound Uptrace call failed.
    #[error("backend request failed: {0}")]
    Backend(#[from] BackendError),

    /// Malformed or unusable configuration (fatal at startup).
    #[error("configuration error: {0}")]
    Config(String),

    /// Two tools registered under the same name (fatal at startup).
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// Call addressed to a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure was caused by the caller's input rather than by the
    /// backend or the server itself.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Convert to a JSON-RPC error code.
    pub fn to_rpc_code(&self) -> i64 {
        match self {
            Error::Validation(_) | Error::UnknownTool(_) => rpc_code::INVALID_PARAMS,
            Error::Serialization(_) => rpc_code::PARSE_ERROR,
            Error::Backend(_)
            | Error::Config(_)
            | Error::DuplicateTool(_)
            | Error::Io(_) => rpc_code::INTERNAL_ERROR,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }
}

// =============================================================================
// Validation errors
// =============================================================================

/// What was wrong with a caller-supplied field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// A required value was absent (or set to its zero/empty sentinel).
    Missing,
    /// A value was present but has the wrong shape.
    Malformed,
}

/// Caller input failed a precondition. Always raised before any backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.render())]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub field: String,
    pub message: String,
    /// Corrective example payload shown to the caller.
    pub example: Option<&'static str>,
}

impl ValidationError {
    pub fn missing(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ValidationKind::Missing,
            field: field.into(),
            message: message.into(),
            example: None,
        }
    }

    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ValidationKind::Malformed,
            field: field.into(),
            message: message.into(),
            example: None,
        }
    }

    pub fn with_example(mut self, example: &'static str) -> Self {
        self.example = Some(example);
        self
    }

    fn render(&self) -> String {
        let label = match self.kind {
            ValidationKind::Missing => "missing required field",
            ValidationKind::Malformed => "malformed field",
        };
        let mut text = format!("invalid arguments: {} '{}': {}", label, self.field, self.message);
        if let Some(example) = self.example {
            text.push_str("\n\nExample:\n");
            text.push_str(example);
        }
        text
    }
}

// =============================================================================
// Backend errors
// =============================================================================

/// Failure of the single outbound Uptrace call.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection, TLS, timeout or other transport-level failure.
    #[error("request to {url} failed: {detail}")]
    Transport {
        url: String,
        /// Failure kind followed by the full cause chain.
        detail: String,
        #[source]
        source: reqwest::Error,
    },

    /// Uptrace answered with a non-success status.
    #[error("{method} {path} returned HTTP {status}: {message}")]
    Status {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    /// The response body did not decode as the expected payload.
    #[error("malformed response from {path}: {message}")]
    Decode { path: String, message: String },

    /// The caller cancelled the call before the backend answered.
    #[error("request cancelled")]
    Cancelled,

    /// The request URL could not be built from the base URL and path.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Wrap a reqwest failure, keeping every cause in the message.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let kind = if source.is_timeout() {
            "timed out"
        } else if source.is_connect() {
            "connection failed"
        } else if source.is_body() || source.is_decode() {
            "error reading response body"
        } else if source.is_redirect() {
            "too many redirects"
        } else {
            "error sending request"
        };
        let mut detail = kind.to_string();
        let mut seen: Vec<String> = Vec::new();
        let mut cause = std::error::Error::source(&source);
        while let Some(err) = cause {
            let text = err.to_string();
            if !seen.contains(&text) {
                detail.push_str(": ");
                detail.push_str(&text);
                seen.push(text);
            }
            cause = err.source();
        }
        BackendError::Transport {
            url: url.into(),
            detail,
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_includes_example() {
        let err = ValidationError::missing("body", "YAML dashboard definition is required")
            .with_example("schema: v2");
        let text = err.to_string();
        assert!(text.starts_with("invalid arguments: missing required field 'body'"));
        assert!(text.ends_with("Example:\nschema: v2"));
    }

    #[test]
    fn test_validation_and_backend_read_differently() {
        let validation: Error = ValidationError::missing("dashboard_id", "dashboard id is required").into();
        let backend: Error = BackendError::Status {
            method: "GET".to_string(),
            path: "/api/v1/metrics/1/dashboards/7".to_string(),
            status: 404,
            message: "dashboard not found".to_string(),
        }
        .into();

        assert!(validation.is_user_error());
        assert!(!backend.is_user_error());
        assert!(backend.to_string().starts_with("backend request failed:"));
        assert!(backend.to_string().contains("dashboard not found"));
        assert_ne!(validation.to_rpc_code(), backend.to_rpc_code());
    }
}
