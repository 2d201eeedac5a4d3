//! Observability utilities.

use crate::types::{LogFormat, LoggingConfig};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment override for the log format (`json` or `text`).
pub const LOG_FORMAT_ENV: &str = "UPTRACE_MCP_LOG_FORMAT";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber once for the process.
///
/// Logs always go to stderr: stdout carries the protocol. `RUST_LOG`
/// overrides the configured level, `UPTRACE_MCP_LOG_FORMAT` the format.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let result = match resolve_format(config.format, std::env::var(LOG_FORMAT_ENV).ok().as_deref()) {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Text => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };

        if let Err(err) = result {
            eprintln!("tracing init skipped: {err}");
        }
    });
}

fn resolve_format(configured: LogFormat, env: Option<&str>) -> LogFormat {
    match env {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
        _ => configured,
    }
}
