//! MCP session: stdio transport with initialize handshake and request/response.
//!
//! Spawns the server process and frames JSON-RPC messages one per line. A reader
//! task routes responses to waiting callers by request id, so several device
//! investigations can call tools through one session at the same time.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::protocol::{
    initialize_params, reply_to_server_request, RpcMessage, RpcNotification, RpcRequest,
};

pub(crate) const INIT_TIMEOUT: Duration = Duration::from_secs(20);
pub(crate) const CALL_TIMEOUT: Duration = Duration::from_secs(30);

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<RpcMessage>>>>;

/// MCP session over stdio.
///
/// **Interaction**: Created by `McpToolSource::stdio`; used for `tools/list`
/// and `tools/call`. The child is killed when the session is dropped.
pub struct McpSession {
    stdin: Arc<AsyncMutex<ChildStdin>>,
    pending: Pending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    _child: Child,
}

impl McpSession {
    /// Spawns `command args` with extra `env` and completes the initialize handshake.
    ///
    /// When `stderr_verbose` is false, child stderr is discarded.
    pub async fn new(
        command: impl Into<String>,
        args: Vec<String>,
        env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        stderr_verbose: bool,
    ) -> Result<Self, McpSessionError> {
        let command = command.into();
        let mut cmd = Command::new(&command);
        cmd.args(&args)
            .envs(env.into_iter().map(|(k, v)| (k.into(), v.into())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if stderr_verbose {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        let mut child = cmd.spawn().map_err(McpSessionError::Spawn)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpSessionError::Transport("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpSessionError::Transport("child stdout unavailable".into()))?;
        debug!(command = %command, args = ?args, "mcp stdio server spawned");

        let stdin = Arc::new(AsyncMutex::new(stdin));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(stdout, Arc::clone(&stdin), Arc::clone(&pending)));

        let session = Self {
            stdin,
            pending,
            next_id: AtomicU64::new(1),
            reader,
            _child: child,
        };
        session.initialize().await?;
        Ok(session)
    }

    /// Sends `initialize`, waits for the result, then `notifications/initialized`.
    async fn initialize(&self) -> Result<(), McpSessionError> {
        let result = self
            .request("initialize", initialize_params(), INIT_TIMEOUT)
            .await
            .map_err(|e| McpSessionError::Initialize(e.to_string()))?;
        if let Some(err) = result.error {
            return Err(McpSessionError::Initialize(err.message));
        }
        let notification = RpcNotification::new("notifications/initialized", serde_json::json!({}));
        let line = serde_json::to_value(&notification)
            .map_err(|e| McpSessionError::Transport(e.to_string()))?;
        write_line(&self.stdin, &line).await
    }

    /// Sends one request and waits up to `timeout` for the response with the same id.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<RpcMessage, McpSessionError> {
        let id = format!("sp-oncall-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|e| McpSessionError::Transport(e.to_string()))?
            .insert(id.clone(), tx);

        let request = serde_json::to_value(RpcRequest::new(&id, method, params))
            .map_err(|e| McpSessionError::Transport(e.to_string()))?;
        trace!(id = %id, method, "mcp stdio request");
        if let Err(e) = write_line(&self.stdin, &request).await {
            self.forget(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_)) => Err(McpSessionError::Transport(format!(
                "server closed before answering {}",
                method
            ))),
            Err(_) => {
                self.forget(&id);
                Err(McpSessionError::Timeout(method.to_string()))
            }
        }
    }

    fn forget(&self, id: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(id);
        }
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn write_line(stdin: &AsyncMutex<ChildStdin>, message: &Value) -> Result<(), McpSessionError> {
    let mut line = message.to_string();
    line.push('\n');
    let mut stdin = stdin.lock().await;
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|e| McpSessionError::Transport(e.to_string()))?;
    stdin
        .flush()
        .await
        .map_err(|e| McpSessionError::Transport(e.to_string()))
}

/// Reads server lines until EOF: answers server requests, routes responses.
async fn read_loop(stdout: ChildStdout, stdin: Arc<AsyncMutex<ChildStdin>>, pending: Pending) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "mcp stdio read failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let msg: RpcMessage = match serde_json::from_str(line) {
            Ok(m) => m,
            Err(e) => {
                trace!(error = %e, "ignoring non JSON-RPC line from mcp server");
                continue;
            }
        };
        if msg.is_request() {
            debug!(method = ?msg.method, "mcp server request");
            let reply = reply_to_server_request(&msg);
            if let Err(e) = write_line(&stdin, &reply).await {
                warn!(error = %e, "failed to answer mcp server request");
            }
        } else if msg.is_response() {
            let Some(id) = msg.id_str() else { continue };
            let waiter = pending.lock().ok().and_then(|mut p| p.remove(&id));
            match waiter {
                Some(tx) => {
                    let _ = tx.send(msg);
                }
                None => trace!(id = %id, "mcp response with no waiter"),
            }
        }
    }
    // Dropping the senders wakes every waiter with a closed-channel error.
    if let Ok(mut p) = pending.lock() {
        p.clear();
    }
}

/// Errors from McpSession operations.
#[derive(Debug, thiserror::Error)]
pub enum McpSessionError {
    #[error("spawn: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("transport: {0}")]
    Transport(String),
    #[error("timeout waiting for {0}")]
    Timeout(String),
    #[error("initialize: {0}")]
    Initialize(String),
}
