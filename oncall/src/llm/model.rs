//! `provider/model` names and client construction.

use std::fmt;
use std::str::FromStr;

use async_openai::config::OpenAIConfig;

use crate::error::AgentError;

use super::ChatOpenAI;

/// Model used when nothing is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-5-nano";

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Chat-completions provider. Both speak the OpenAI wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// `OPENAI_API_KEY`, optional `OPENAI_BASE_URL`.
    OpenAi,
    /// `OLLAMA_BASE_URL` (default `http://localhost:11434/v1`), no key required.
    Ollama,
}

/// Parsed `provider/model` name, e.g. `openai/gpt-4o-mini` or `ollama/qwen3:8b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelName {
    pub provider: Provider,
    pub model: String,
}

impl FromStr for ModelName {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s.trim().split_once('/').ok_or_else(|| {
            AgentError::ExecutionFailed(format!(
                "model must be provider/model (e.g. {}), got: {}",
                DEFAULT_MODEL, s
            ))
        })?;
        let provider = match provider.to_lowercase().as_str() {
            "openai" => Provider::OpenAi,
            "ollama" => Provider::Ollama,
            other => {
                return Err(AgentError::ExecutionFailed(format!(
                    "unsupported model provider: {} (use openai or ollama)",
                    other
                )))
            }
        };
        if model.is_empty() {
            return Err(AgentError::ExecutionFailed(format!(
                "missing model name in: {}",
                s
            )));
        }
        Ok(Self {
            provider,
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provider = match self.provider {
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
        };
        write!(f, "{}/{}", provider, self.model)
    }
}

impl ModelName {
    /// OpenAI-compatible client config for this provider, read from the environment.
    pub fn client_config(&self) -> OpenAIConfig {
        match self.provider {
            Provider::OpenAi => {
                let config = match std::env::var("OPENAI_API_KEY") {
                    Ok(key) if !key.is_empty() => OpenAIConfig::new().with_api_key(key),
                    _ => OpenAIConfig::new(),
                };
                config.with_api_base(
                    std::env::var("OPENAI_BASE_URL")
                        .ok()
                        .filter(|b| !b.is_empty())
                        .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                )
            }
            Provider::Ollama => OpenAIConfig::new().with_api_key("ollama").with_api_base(
                std::env::var("OLLAMA_BASE_URL")
                    .ok()
                    .filter(|b| !b.is_empty())
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            ),
        }
    }
}

/// Builds a chat client from a fully specified `provider/model` name.
pub fn load_chat_model(name: &str) -> Result<ChatOpenAI, AgentError> {
    let parsed: ModelName = name.parse()?;
    tracing::debug!(model = %parsed, "Loading chat model");
    Ok(ChatOpenAI::with_config(parsed.client_config(), parsed.model))
}
