//! MCP session over Streamable HTTP: POST JSON-RPC to a URL, parse JSON or SSE response.
//!
//! POSTs a single JSON-RPC message with `Accept: application/json, text/event-stream`
//! and echoes the `Mcp-Session-Id` header the server hands out at initialize.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::protocol::{initialize_params, RpcMessage, RpcNotification, RpcRequest, PROTOCOL_VERSION};
use super::session::{CALL_TIMEOUT, INIT_TIMEOUT};
use crate::tool_source::ToolSourceError;

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Returns the first JSON-RPC response (has result or error) in an HTTP body.
///
/// `text/event-stream` bodies are split into events; every `data:` line of an
/// event is joined before parsing. Other bodies are parsed as one JSON object.
fn parse_json_rpc_from_body(body: &str, is_sse: bool) -> Result<RpcMessage, ToolSourceError> {
    if !is_sse {
        return serde_json::from_str(body)
            .map_err(|e| ToolSourceError::Transport(format!("response json: {}", e)));
    }
    let mut data = String::new();
    let try_event = |data: &str| {
        serde_json::from_str::<RpcMessage>(data)
            .ok()
            .filter(|m| m.is_response())
    };
    for line in body.lines() {
        if let Some(chunk) = line.strip_prefix("data:") {
            let chunk = chunk.strip_prefix(' ').unwrap_or(chunk);
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(chunk);
        } else if line.trim().is_empty() && !data.is_empty() {
            if let Some(msg) = try_event(&data) {
                return Ok(msg);
            }
            data.clear();
        }
    }
    try_event(&data).ok_or_else(|| {
        ToolSourceError::Transport("SSE stream: no JSON-RPC response (result/error) found".into())
    })
}

/// MCP session over Streamable HTTP.
///
/// **Interaction**: Created by `McpToolSource::http`; async reqwest throughout so
/// it is safe to use from any tokio task.
pub struct McpHttpSession {
    client: Client,
    url: String,
    /// Extra headers (e.g. API keys) sent on every request.
    headers: Vec<(String, String)>,
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl McpHttpSession {
    /// Creates a new HTTP MCP session and completes the initialize handshake.
    pub async fn new(
        url: impl Into<String>,
        headers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Result<Self, ToolSourceError> {
        let client = Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let session = Self {
            client,
            url: url.into(),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
        };
        session.initialize().await?;
        Ok(session)
    }

    async fn initialize(&self) -> Result<(), ToolSourceError> {
        let result = self
            .request_with_timeout("initialize", initialize_params(), INIT_TIMEOUT)
            .await?;
        if let Some(err) = result.error {
            return Err(ToolSourceError::Transport(format!("initialize: {}", err.message)));
        }
        let body = serde_json::to_vec(&RpcNotification::new("notifications/initialized", json!({})))
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let resp = self
            .post(body, INIT_TIMEOUT)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let status = resp.status();
        if status != reqwest::StatusCode::ACCEPTED && !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "notifications/initialized HTTP {}: {}",
                status,
                if text.is_empty() { "no body" } else { &text }
            )));
        }
        debug!(url = %self.url, "mcp http session initialized");
        Ok(())
    }

    fn post(&self, body: Vec<u8>, timeout: Duration) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header("MCP-Protocol-Version", PROTOCOL_VERSION)
            .body(body);
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Ok(guard) = self.session_id.lock() {
            if let Some(ref sid) = *guard {
                req = req.header(SESSION_HEADER, sid.as_str());
            }
        }
        req
    }

    /// Sends a JSON-RPC request and returns the parsed response (one POST, one response).
    pub async fn request(&self, method: &str, params: Value) -> Result<RpcMessage, ToolSourceError> {
        self.request_with_timeout(method, params, CALL_TIMEOUT).await
    }

    async fn request_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<RpcMessage, ToolSourceError> {
        let id = format!("sp-oncall-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let body = serde_json::to_vec(&RpcRequest::new(&id, method, params))
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        trace!(id = %id, method, "mcp http request");
        let resp = self
            .post(body, timeout)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;

        if let Some(sid) = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut guard) = self.session_id.lock() {
                *guard = Some(sid.to_string());
            }
        }
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "{} HTTP {}: {}",
                method,
                status,
                if text.is_empty() { "no body" } else { &text }
            )));
        }
        let is_sse = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|s| s.contains("text/event-stream"));
        let text = resp
            .text()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("{} response body: {}", method, e)))?;
        parse_json_rpc_from_body(&text, is_sse)
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|g| g.clone())
    }
}
