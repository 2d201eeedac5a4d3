//! Stdio MCP server: read loop, per-call tasks and a single writer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mcp::codec::{read_frame, write_frame, Frame, DEFAULT_MAX_LINE_BYTES};
use crate::mcp::router::{error_response, success_response, Incoming, McpRouter, RpcError};
use crate::tools::ToolRegistry;
use crate::types::Result;

/// Depth of the outbound response queue.
const OUTBOUND_QUEUE: usize = 64;

/// Cancellation tokens of in-flight `tools/call` requests, keyed by the
/// serialized request id.
type InFlight = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// MCP server over a line-delimited byte stream.
#[derive(Debug, Clone)]
pub struct McpServer {
    router: Arc<McpRouter>,
    max_line_bytes: usize,
    debug: bool,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            router: Arc::new(McpRouter::new(Arc::new(registry))),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            debug: false,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Log every inbound and outbound message at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Serve until EOF on `reader` or until `shutdown` fires.
    ///
    /// On EOF, in-flight calls run to completion and their responses are
    /// flushed. On shutdown they are cancelled first.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Value>(OUTBOUND_QUEUE);
        let writer_task = tokio::spawn(write_loop(writer, rx, self.debug));

        let session = Session {
            router: self.router.clone(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            root: shutdown.child_token(),
        };
        tracing::info!(tools = self.router.registry().len(), "MCP server ready on stdio");

        let mut buf = Vec::new();
        let read_result = loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("MCP server shutting down");
                    break Ok(());
                }
                frame = read_frame(&mut reader, &mut buf, self.max_line_bytes) => frame,
            };

            let message = match frame {
                Ok(Some(Frame::Message(message))) => message,
                Ok(Some(Frame::Malformed(e))) => {
                    tracing::debug!("Unparsable message: {}", e);
                    let _ = tx.send(error_response(Value::Null, RpcError::parse_error(e))).await;
                    continue;
                }
                Ok(None) => {
                    tracing::info!("stdin closed, draining in-flight calls");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };
            if self.debug {
                tracing::debug!(direction = "recv", message = %message, "jsonrpc");
            }

            session.dispatch(message, &tx).await;
        };

        drop(tx);
        match writer_task.await {
            Ok(Err(e)) => tracing::warn!("Writer stopped: {}", e),
            Err(e) => tracing::error!("Writer task failed: {}", e),
            Ok(Ok(())) => {}
        }
        read_result.map_err(Into::into)
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<Value>,
    debug: bool,
) -> std::io::Result<()> {
    while let Some(message) = rx.recv().await {
        if debug {
            tracing::debug!(direction = "send", message = %message, "jsonrpc");
        }
        write_frame(&mut writer, &message).await?;
    }
    Ok(())
}

/// Response that is either already known or being produced by a task.
enum Pending {
    Ready(Value),
    Running(JoinHandle<Option<Value>>),
}

impl Pending {
    async fn resolve(self) -> Option<Value> {
        match self {
            Pending::Ready(value) => Some(value),
            Pending::Running(handle) => match handle.await {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!("tools/call task failed: {}", e);
                    None
                }
            },
        }
    }
}

struct Session {
    router: Arc<McpRouter>,
    in_flight: InFlight,
    root: CancellationToken,
}

impl Session {
    async fn dispatch(&self, message: Value, tx: &mpsc::Sender<Value>) {
        match message {
            Value::Array(batch) if batch.is_empty() => {
                let _ = tx
                    .send(error_response(Value::Null, RpcError::invalid_request("Batch request must not be empty")))
                    .await;
            }
            Value::Array(batch) => {
                let pending: Vec<Pending> = batch.into_iter().filter_map(|m| self.start(m)).collect();
                if pending.is_empty() {
                    return;
                }
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut responses = Vec::with_capacity(pending.len());
                    for p in pending {
                        if let Some(response) = p.resolve().await {
                            responses.push(response);
                        }
                    }
                    if !responses.is_empty() {
                        let _ = tx.send(Value::Array(responses)).await;
                    }
                });
            }
            message => match self.start(message) {
                Some(Pending::Ready(response)) => {
                    let _ = tx.send(response).await;
                }
                Some(running) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some(response) = running.resolve().await {
                            let _ = tx.send(response).await;
                        }
                    });
                }
                None => {}
            },
        }
    }

    /// Begin handling one message. Notifications and stray responses yield `None`.
    fn start(&self, message: Value) -> Option<Pending> {
        match Incoming::classify(message) {
            Incoming::Invalid(response) => Some(Pending::Ready(response)),
            Incoming::Response => None,
            Incoming::Notification { method, params } => {
                self.notify(&method, &params);
                None
            }
            Incoming::Request { id, method, params } if method == "tools/call" => {
                Some(self.spawn_call(id, params))
            }
            Incoming::Request { id, method, params } => Some(Pending::Ready(
                match self.router.handle_sync(&method, &params) {
                    Ok(result) => success_response(id, result),
                    Err(e) => error_response(id, e),
                },
            )),
        }
    }

    fn notify(&self, method: &str, params: &Value) {
        match method {
            "notifications/cancelled" => {
                let Some(request_id) = params.get("requestId") else {
                    return;
                };
                let token = lock(&self.in_flight).get(&request_id.to_string()).cloned();
                match token {
                    Some(token) => {
                        tracing::info!(request_id = %request_id, "cancelling tool call");
                        token.cancel();
                    }
                    None => tracing::debug!(request_id = %request_id, "cancel for unknown or finished request"),
                }
            }
            "notifications/initialized" => tracing::debug!("client initialized"),
            other => tracing::debug!(method = other, "ignoring notification"),
        }
    }

    /// Spawn a `tools/call`. An id that is still in flight is rejected.
    fn spawn_call(&self, id: Value, params: Value) -> Pending {
        let key = id.to_string();
        let cancel = self.root.child_token();
        {
            let mut in_flight = lock(&self.in_flight);
            if in_flight.contains_key(&key) {
                tracing::warn!(request_id = %id, "duplicate id for in-flight tool call");
                return Pending::Ready(error_response(
                    id,
                    RpcError::invalid_request(format!("request id {} is already in flight", key)),
                ));
            }
            in_flight.insert(key.clone(), cancel.clone());
        }

        let router = self.router.clone();
        let in_flight = self.in_flight.clone();
        let root = self.root.clone();
        Pending::Running(tokio::spawn(async move {
            let result = router.call_tool(params, cancel.clone()).await;
            lock(&in_flight).remove(&key);

            // The client asked for cancellation and expects no response.
            if cancel.is_cancelled() && !root.is_cancelled() {
                return None;
            }
            Some(match result {
                Ok(result) => success_response(id, result),
                Err(e) => error_response(id, e),
            })
        }))
    }
}

fn lock(in_flight: &InFlight) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolDescriptor, ToolHandler, ToolHints, ToolOutput};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    /// Waits for cancellation, or answers immediately when `fast` is set.
    struct Slow;

    #[async_trait]
    impl ToolHandler for Slow {
        async fn call(&self, arguments: Value, cancel: CancellationToken) -> crate::Result<ToolOutput> {
            if arguments.get("fast").is_some() {
                return Ok(ToolOutput::Text("fast".to_string()));
            }
            cancel.cancelled().await;
            Err(crate::types::BackendError::Cancelled.into())
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor {
                    name: "slow".to_string(),
                    title: "Slow".to_string(),
                    description: "Blocks until cancelled.".to_string(),
                    hints: ToolHints::READ,
                    input_schema: json!({"type": "object"}),
                },
                Arc::new(Slow),
            )
            .unwrap();
        McpServer::new(registry)
    }

    #[tokio::test]
    async fn test_cancelled_call_gets_no_response() {
        let (client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, mut client_write) = tokio::io::split(client);
        let shutdown = CancellationToken::new();

        let srv = server();
        let serve = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { srv.serve(BufReader::new(server_read), server_write, shutdown).await }
        });

        let msgs = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "slow"}}),
            json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 1}}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "slow", "arguments": {"fast": true}}}),
        ];
        for m in &msgs {
            client_write.write_all(format!("{}\n", m).as_bytes()).await.unwrap();
        }

        let mut lines = BufReader::new(client_read).lines();
        let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first["id"], 2);
        assert_eq!(first["result"]["content"][0]["text"], "fast");

        client_write.shutdown().await.unwrap();
        drop(client_write);
        serve.await.unwrap().unwrap();
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_id_is_rejected() {
        let (client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, mut client_write) = tokio::io::split(client);
        let shutdown = CancellationToken::new();

        let srv = server();
        let serve = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { srv.serve(BufReader::new(server_read), server_write, shutdown).await }
        });

        let call = json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "slow"}});
        client_write.write_all(format!("{}\n{}\n", call, call).as_bytes()).await.unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let rejected: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(rejected["id"], 5);
        assert_eq!(rejected["error"]["code"], -32600);

        // The first call still owns the id and is cancellable by it.
        let cancel = json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 5}});
        client_write.write_all(format!("{}\n", cancel).as_bytes()).await.unwrap();
        client_write.shutdown().await.unwrap();
        drop(client_write);
        serve.await.unwrap().unwrap();
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_calls() {
        let (client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, mut client_write) = tokio::io::split(client);
        let shutdown = CancellationToken::new();

        let srv = server();
        let serve = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { srv.serve(BufReader::new(server_read), server_write, shutdown).await }
        });

        let call = json!({"jsonrpc": "2.0", "id": "a", "method": "tools/call", "params": {"name": "slow"}});
        client_write.write_all(format!("{}\n", call).as_bytes()).await.unwrap();
        let ping = json!({"jsonrpc": "2.0", "id": "p", "method": "ping"});
        client_write.write_all(format!("{}\n", ping).as_bytes()).await.unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let pong: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(pong["id"], "p");

        shutdown.cancel();
        serve.await.unwrap().unwrap();

        let cancelled: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(cancelled["id"], "a");
        assert_eq!(cancelled["result"]["isError"], true);
    }
}
