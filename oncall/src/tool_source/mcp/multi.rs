//! Aggregates several MCP servers behind one `ToolSource`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::config::{load_mcp_config, McpConfig};
use super::McpToolSource;
use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

/// Tools of every configured server; calls are routed by tool name.
///
/// Tool lists are fetched once at connect time. When two servers expose the same
/// tool name, the server whose name sorts first keeps it.
pub struct MultiServerToolSource {
    servers: Vec<(String, Arc<dyn ToolSource>)>,
    tools: Vec<ToolSpec>,
    routes: HashMap<String, usize>,
}

impl MultiServerToolSource {
    /// Builds from already connected sources, listing each one's tools.
    pub async fn from_sources(
        sources: Vec<(String, Arc<dyn ToolSource>)>,
    ) -> Result<Self, ToolSourceError> {
        let mut tools = Vec::new();
        let mut routes = HashMap::new();
        for (idx, (server, source)) in sources.iter().enumerate() {
            let listed = source.list_tools().await?;
            info!(server = %server, tools = listed.len(), "mcp server tools listed");
            for spec in listed {
                if routes.contains_key(&spec.name) {
                    warn!(server = %server, tool = %spec.name, "duplicate tool name ignored");
                    continue;
                }
                routes.insert(spec.name.clone(), idx);
                tools.push(spec);
            }
        }
        Ok(Self {
            servers: sources,
            tools,
            routes,
        })
    }

    /// Connects to every server in `config`; any failing server fails the whole connect.
    pub async fn connect(config: &McpConfig, stderr_verbose: bool) -> Result<Self, ToolSourceError> {
        let mut sources: Vec<(String, Arc<dyn ToolSource>)> = Vec::new();
        for (name, server) in &config.servers {
            let source = McpToolSource::connect(server, stderr_verbose)
                .await
                .map_err(|e| ToolSourceError::Transport(format!("{}: {}", name, e)))?;
            sources.push((name.clone(), Arc::new(source)));
        }
        Self::from_sources(sources).await
    }

    /// Loads `path` and connects to every server in it.
    pub async fn from_config_file(path: &Path, stderr_verbose: bool) -> Result<Self, ToolSourceError> {
        let config =
            load_mcp_config(path).map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        Self::connect(&config, stderr_verbose).await
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|(n, _)| n.as_str()).collect()
    }
}

#[async_trait]
impl ToolSource for MultiServerToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let idx = self
            .routes
            .get(name)
            .ok_or_else(|| ToolSourceError::NotFound(name.to_string()))?;
        let (_, source) = self
            .servers
            .get(*idx)
            .ok_or_else(|| ToolSourceError::NotFound(name.to_string()))?;
        source.call_tool(name, arguments).await
    }
}
