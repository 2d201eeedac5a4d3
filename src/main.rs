//! Uptrace MCP server - stdio entry point.
//!
//! Loads the YAML configuration, builds the tool registry over the Uptrace
//! API client and serves MCP on stdin/stdout until EOF or Ctrl-C.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use uptrace_mcp::backend::UptraceClient;
use uptrace_mcp::mcp::McpServer;
use uptrace_mcp::tools::{build_registry, DefaultPolicy, ToolContext};
use uptrace_mcp::Config;

#[derive(Debug, Parser)]
#[command(name = "uptrace-mcp", version, about = "MCP server for the Uptrace observability API")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "UPTRACE_MCP_CONFIG")]
    config: PathBuf,

    /// Log every JSON-RPC message (stderr, debug level).
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    if cli.debug && std::env::var_os("RUST_LOG").is_none() {
        config.logging.level = "debug".to_string();
    }

    // Initialize observability
    uptrace_mcp::observability::init_tracing(&config.logging);

    let client = UptraceClient::new(&config.uptrace)?;
    let policy = DefaultPolicy::from_config(&config)?;
    let registry = build_registry(ToolContext::new(policy, Arc::new(client)))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api_url = %config.uptrace.api_url,
        project_id = config.uptrace.project_id,
        tools = registry.len(),
        "Uptrace MCP server starting"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received");
                shutdown.cancel();
            }
        }
    });

    McpServer::new(registry)
        .with_debug(cli.debug)
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
        .await?;

    Ok(())
}
