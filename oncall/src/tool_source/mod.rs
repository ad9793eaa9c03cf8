//! Tool source abstraction: list tools and call a tool.
//!
//! The ReAct tool agent depends on `ToolSource` instead of a concrete client;
//! implementations are `McpToolSource` (one MCP server), `MultiServerToolSource`
//! (every server in `mcp_config.json`) and `MockToolSource` (tests).

mod mcp;
mod mock;

pub use mcp::{
    find_mcp_config, load_mcp_config, McpConfig, McpConfigError, McpHttpSession,
    McpServerConfig, McpSession, McpSessionError, McpToolSource, MultiServerToolSource,
    MCP_CONFIG_FILE,
};
pub use mock::MockToolSource;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool specification, aligned with MCP `tools/list` result item.
///
/// **Interaction**: Returned by `ToolSource::list_tools()`; bound to the agent
/// model via `ChatOpenAI::with_tools`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    /// Tool name (used in MCP tools/call).
    pub name: String,
    /// Human-readable description for the LLM.
    pub description: Option<String>,
    /// JSON Schema for arguments (MCP inputSchema).
    pub input_schema: Value,
}

/// Result of a single tool call; aligns with MCP `tools/call` content.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    /// Result text (MCP result.content[].text joined, or structuredContent as JSON).
    pub text: String,
}

/// Errors from listing or calling tools.
///
/// **Interaction**: ActNode turns call errors into error results for the model
/// instead of failing the run.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("MCP/transport error: {0}")]
    Transport(String),
    #[error("JSON-RPC error: {0}")]
    JsonRpc(String),
    /// The server ran the tool and reported `isError`.
    #[error("tool error: {0}")]
    Tool(String),
}

/// Tool source: list tools and call a tool.
///
/// **Interaction**: `list_tools` feeds the agent model's tool binding; ActNode
/// uses `call_tool(name, args)`. Shared across concurrent device investigations,
/// so implementations must tolerate parallel calls.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// List available tools (MCP tools/list).
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Call a tool by name with JSON arguments (MCP tools/call).
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of each ToolSourceError variant contains expected keywords.
    #[test]
    fn tool_source_error_display_all_variants() {
        let s = ToolSourceError::NotFound("x".into()).to_string();
        assert!(s.to_lowercase().contains("not found"), "{}", s);
        let s = ToolSourceError::InvalidInput("bad".into()).to_string();
        assert!(s.to_lowercase().contains("invalid"), "{}", s);
        let s = ToolSourceError::Transport("net".into()).to_string();
        assert!(s.to_lowercase().contains("transport"), "{}", s);
        let s = ToolSourceError::JsonRpc("rpc".into()).to_string();
        assert!(s.contains("JSON-RPC"), "{}", s);
        let s = ToolSourceError::Tool("FEATURE_NOT_FOUND".into()).to_string();
        assert!(s.contains("FEATURE_NOT_FOUND"), "{}", s);
    }
}
