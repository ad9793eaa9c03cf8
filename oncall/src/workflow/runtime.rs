//! Shared handles for one process: models, MCP tools and settings.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::error::AgentError;
use crate::llm::{load_chat_model, ChatOpenAI, LlmClient};
use crate::settings::Settings;
use crate::tool_source::{
    find_mcp_config, McpConfigError, MultiServerToolSource, ToolSource, ToolSourceError,
};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("mcp config: {0}")]
    McpConfig(#[from] McpConfigError),
    #[error("mcp tools: {0}")]
    Tools(#[from] ToolSourceError),
    #[error("model: {0}")]
    Model(#[from] AgentError),
    #[error("working directory: {0}")]
    Cwd(#[from] std::io::Error),
}

/// Handles every node shares.
///
/// `agent_llm` has the MCP tools bound and drives the tool agent; `llm` is the
/// same model without tools for planning, assessment, reports and structured
/// conversion.
#[derive(Clone)]
pub struct OncallRuntime {
    pub agent_llm: Arc<dyn LlmClient>,
    pub llm: Arc<dyn LlmClient>,
    pub tools: Arc<dyn ToolSource>,
    pub settings: Settings,
}

impl OncallRuntime {
    pub fn new(
        agent_llm: Arc<dyn LlmClient>,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
        settings: Settings,
    ) -> Self {
        Self {
            agent_llm,
            llm,
            tools,
            settings,
        }
    }

    /// Finds `mcp_config.json` from the working directory upwards, connects to
    /// every server in it and builds both model clients.
    pub async fn connect(settings: Settings) -> Result<Self, RuntimeError> {
        let cwd = std::env::current_dir()?;
        let tools = Arc::new(connect_tools(&settings, &cwd).await?);
        let specs = tools.list_tools().await?;
        info!(
            servers = ?tools.server_names(),
            tools = specs.len(),
            model = %settings.model,
            "on-call runtime connected"
        );

        let llm = with_temperature(load_chat_model(&settings.model)?, &settings);
        let agent_llm = llm.clone().with_tools(specs);
        Ok(Self::new(
            Arc::new(agent_llm),
            Arc::new(llm),
            tools,
            settings,
        ))
    }
}

/// Connects the MCP servers named in the settings' config file.
pub async fn connect_tools(
    settings: &Settings,
    start: &Path,
) -> Result<MultiServerToolSource, RuntimeError> {
    let path = find_mcp_config(&settings.mcp_config.to_string_lossy(), start)?;
    info!(path = %path.display(), "loading mcp config");
    Ok(MultiServerToolSource::from_config_file(&path, settings.mcp_stderr_verbose).await?)
}

fn with_temperature(llm: ChatOpenAI, settings: &Settings) -> ChatOpenAI {
    match settings.temperature {
        Some(t) => llm.with_temperature(t),
        None => llm,
    }
}
