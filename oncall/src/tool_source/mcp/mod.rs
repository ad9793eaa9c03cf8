//! MCP ToolSource: connects to an MCP server via stdio or Streamable HTTP, implements ToolSource.
//!
//! Uses `McpSession` (stdio) or `McpHttpSession` (HTTP); maps MCP tools/list and
//! tools/call to `ToolSpec` and `ToolCallContent`.

mod config;
mod multi;
mod protocol;
mod session;
mod session_http;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

pub use config::{
    find_mcp_config, load_mcp_config, McpConfig, McpConfigError, McpServerConfig,
    MCP_CONFIG_FILE,
};
pub use multi::MultiServerToolSource;
pub use protocol::{RpcError, RpcMessage};
pub use session::{McpSession, McpSessionError};
pub use session_http::McpHttpSession;

use session::CALL_TIMEOUT;

/// Transport kind: stdio (spawned process) or HTTP (POST to URL).
enum McpSessionKind {
    Stdio(McpSession),
    Http(McpHttpSession),
}

/// Tool source backed by one MCP server over stdio or HTTP.
///
/// **Interaction**: Implements `ToolSource`; usually wrapped by
/// `MultiServerToolSource` built from `mcp_config.json`.
pub struct McpToolSource {
    session: McpSessionKind,
}

impl From<McpSessionError> for ToolSourceError {
    fn from(e: McpSessionError) -> Self {
        ToolSourceError::Transport(e.to_string())
    }
}

impl McpToolSource {
    /// Spawns the MCP server and completes the initialize handshake.
    ///
    /// `env` is added to the inherited environment; when `stderr_verbose` is false
    /// child stderr is discarded.
    pub async fn stdio(
        command: impl Into<String>,
        args: Vec<String>,
        env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        stderr_verbose: bool,
    ) -> Result<Self, McpSessionError> {
        let session = McpSession::new(command, args, env, stderr_verbose).await?;
        Ok(Self {
            session: McpSessionKind::Stdio(session),
        })
    }

    /// MCP tool source over Streamable HTTP (no subprocess).
    /// `headers` are sent on every request (e.g. API keys).
    pub async fn http(
        url: impl Into<String>,
        headers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Result<Self, ToolSourceError> {
        let session = McpHttpSession::new(url, headers).await?;
        Ok(Self {
            session: McpSessionKind::Http(session),
        })
    }

    /// Connects according to one `mcp_config.json` entry.
    pub async fn connect(
        server: &McpServerConfig,
        stderr_verbose: bool,
    ) -> Result<Self, ToolSourceError> {
        match server {
            McpServerConfig::Stdio { command, args, env } => Ok(Self::stdio(
                command.clone(),
                args.clone(),
                env.clone(),
                stderr_verbose,
            )
            .await?),
            McpServerConfig::Http { url, headers, .. } => {
                Self::http(url.clone(), headers.clone()).await
            }
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<RpcMessage, ToolSourceError> {
        match &self.session {
            McpSessionKind::Stdio(s) => Ok(s.request(method, params, CALL_TIMEOUT).await?),
            McpSessionKind::Http(h) => h.request(method, params).await,
        }
    }
}

/// Parses a `tools/list` JSON-RPC result into `Vec<ToolSpec>`.
fn parse_list_tools_result(result: RpcMessage) -> Result<Vec<ToolSpec>, ToolSourceError> {
    if let Some(err) = result.error {
        return Err(ToolSourceError::JsonRpc(err.message));
    }
    let tools_value = result
        .result
        .and_then(|r| r.get("tools").cloned())
        .ok_or_else(|| ToolSourceError::Transport("no tools in response".into()))?;
    let tools_array = tools_value
        .as_array()
        .ok_or_else(|| ToolSourceError::Transport("tools not an array".into()))?;
    let mut specs = Vec::with_capacity(tools_array.len());
    for t in tools_array {
        let obj = t
            .as_object()
            .ok_or_else(|| ToolSourceError::Transport("tool item not an object".into()))?;
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let description = obj
            .get("description")
            .and_then(|v| v.as_str())
            .map(String::from);
        let input_schema = obj
            .get("inputSchema")
            .cloned()
            .unwrap_or(Value::Object(serde_json::Map::new()));
        specs.push(ToolSpec {
            name,
            description,
            input_schema,
        });
    }
    Ok(specs)
}

/// Parses a `tools/call` JSON-RPC result into `ToolCallContent`.
///
/// Text blocks are joined; `structuredContent` is used when there is no text.
/// `isError` results become `ToolSourceError::Tool` carrying the server's text.
fn parse_call_tool_result(result: RpcMessage) -> Result<ToolCallContent, ToolSourceError> {
    if let Some(err) = result.error {
        return Err(ToolSourceError::JsonRpc(err.message));
    }
    let result_value = result
        .result
        .ok_or_else(|| ToolSourceError::Transport("no result in tools/call response".into()))?;

    let text_parts: Vec<&str> = result_value
        .get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|v| v.as_str()))
                .collect()
        })
        .unwrap_or_default();
    let mut text = text_parts.join("\n").trim().to_string();
    if text.is_empty() {
        if let Some(structured) = result_value.get("structuredContent") {
            text = structured.to_string();
        }
    }

    if result_value
        .get("isError")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        if text.is_empty() {
            text = "tool returned error".to_string();
        }
        return Err(ToolSourceError::Tool(text));
    }
    if text.is_empty() {
        return Err(ToolSourceError::Transport(
            "no text or structuredContent in tools/call response".into(),
        ));
    }
    Ok(ToolCallContent { text })
}

#[async_trait]
impl ToolSource for McpToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let result = self
            .request("tools/list", Value::Object(serde_json::Map::new()))
            .await?;
        parse_list_tools_result(result)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", params).await?;
        parse_call_tool_result(result)
    }
}
