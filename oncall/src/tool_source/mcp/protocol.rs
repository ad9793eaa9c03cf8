//! Minimal JSON-RPC 2.0 message types for the MCP client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// MCP protocol version sent in `initialize` and the HTTP header.
pub(crate) const PROTOCOL_VERSION: &str = "2025-11-25";

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    params: Value,
}

impl<'a> RpcRequest<'a> {
    pub(crate) fn new(id: &'a str, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RpcNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
}

impl<'a> RpcNotification<'a> {
    pub(crate) fn new(method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Any message read from a server: a response, a server request or a notification.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcMessage {
    pub fn is_response(&self) -> bool {
        self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }

    /// Server-to-client request (has both id and method).
    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    /// Request id as text; numeric ids are rendered as digits.
    pub fn id_str(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// `initialize` params advertising a tools-only client.
pub(crate) fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "roots": { "listChanged": false } },
        "clientInfo": {
            "name": "sp-oncall",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Reply to a server request: empty roots for `roots/list`, method-not-found otherwise.
pub(crate) fn reply_to_server_request(request: &RpcMessage) -> Value {
    let id = request.id.clone().unwrap_or(Value::Null);
    match request.method.as_deref() {
        Some("roots/list") => json!({"jsonrpc": "2.0", "id": id, "result": {"roots": []}}),
        Some("ping") => json!({"jsonrpc": "2.0", "id": id, "result": {}}),
        _ => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": "method not found"}
        }),
    }
}
