//! LLM client abstraction.
//!
//! Workflow nodes call [`LlmClient::invoke`] directly for free-text answers and
//! [`invoke_structured`] for typed outputs; the ReAct think step calls a client
//! that has the MCP tools bound. [`load_chat_model`] builds a client from a
//! `provider/model` name.

mod mock;
mod model;
mod openai;
mod structured;

pub use mock::{MockLlm, MockReply};
pub use model::{load_chat_model, ModelName, Provider, DEFAULT_MODEL};
pub use openai::ChatOpenAI;
pub use structured::{extract_json_object, invoke_structured, JsonSchemaHint};

use async_trait::async_trait;

use crate::error::AgentError;
use crate::message::Message;
use crate::state::ToolCall;

/// Tool choice mode for chat completions: when tools are present, controls whether
/// the model may choose (auto), must not use (none), or must use (required).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    /// Model can pick between message or tool calls. Default when tools are present.
    #[default]
    Auto,
    None,
    Required,
}

impl std::str::FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            _ => Err(format!(
                "unknown tool_choice: {} (use auto, none, or required)",
                s
            )),
        }
    }
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Sums two usages; used to accumulate over the tool agent's turns.
    pub fn add(&self, other: &LlmUsage) -> LlmUsage {
        LlmUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

/// Response from an LLM completion: assistant message text and optional tool calls.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Assistant message content (plain text).
    pub content: String,
    /// Tool calls from this turn; empty means the agent loop ends.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage for this call, when the provider reports it.
    pub usage: Option<LlmUsage>,
}

/// LLM client: given messages, returns assistant text and optional tool_calls.
///
/// Implementations: [`ChatOpenAI`] (OpenAI-compatible API, also used for Ollama)
/// and [`MockLlm`] (deterministic replies for tests).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLlm {
        content: String,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, AgentError> {
            Ok(LlmResponse {
                content: self.content.clone(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn tool_choice_mode_from_str_parses_known_values() {
        assert_eq!("auto".parse::<ToolChoiceMode>().unwrap(), ToolChoiceMode::Auto);
        assert_eq!("NONE".parse::<ToolChoiceMode>().unwrap(), ToolChoiceMode::None);
        assert_eq!(
            "required".parse::<ToolChoiceMode>().unwrap(),
            ToolChoiceMode::Required
        );
        assert!("sometimes".parse::<ToolChoiceMode>().is_err());
    }

    /// **Scenario**: A trait object dispatches to the implementation.
    #[tokio::test]
    async fn llm_client_trait_object_invokes_impl() {
        let llm: Box<dyn LlmClient> = Box::new(StubLlm {
            content: "ok".into(),
        });
        let out = llm.invoke(&[Message::user("hi")]).await.unwrap();
        assert_eq!(out.content, "ok");
        assert!(out.tool_calls.is_empty());
    }

    #[test]
    fn usage_add_sums_fields() {
        let a = LlmUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        };
        let b = a.add(&a);
        assert_eq!(b.total_tokens, 6);
        assert_eq!(b.prompt_tokens, 2);
    }
}
