//! OpenAI Chat Completions client implementing `LlmClient`.
//!
//! Talks to any OpenAI-compatible endpoint (OpenAI itself, Ollama's `/v1`).
//! With tools set, the response may carry `tool_calls` for the ReAct act step.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, LlmUsage};
use crate::message::Message;
use crate::state::ToolCall;
use crate::tool_source::{ToolSource, ToolSourceError, ToolSpec};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCalls, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage, ChatCompletionTool,
        ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, FunctionObject, ToolChoiceOptions,
    },
    Client,
};

use super::ToolChoiceMode;

/// OpenAI-compatible chat client.
///
/// Built by `load_chat_model` from a `provider/model` name, or directly with
/// `with_config`. `with_tools` binds the MCP tool list for the agent model.
#[derive(Clone)]
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    tools: Option<Vec<ToolSpec>>,
    temperature: Option<f32>,
    tool_choice: Option<ToolChoiceMode>,
}

impl ChatOpenAI {
    /// Client with default config (API key from `OPENAI_API_KEY`).
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), model)
    }

    /// Client with custom config (API key, base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            tools: None,
            temperature: None,
            tool_choice: None,
        }
    }

    /// Client with the tools currently offered by `tool_source`.
    ///
    /// Use the same source for the act step so the model and execution see the same tools.
    pub async fn new_with_tool_source(
        config: OpenAIConfig,
        model: impl Into<String>,
        tool_source: &dyn ToolSource,
    ) -> Result<Self, ToolSourceError> {
        let tools = tool_source.list_tools().await?;
        Ok(Self::with_config(config, model).with_tools(tools))
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set temperature (0 to 2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Overrides the tool choice (default `auto` when tools are present).
    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = Some(mode);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_to_request(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System(s) => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(s.as_str()),
                ),
                Message::User(s) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(s.as_str()),
                ),
                Message::Assistant(s) => {
                    ChatCompletionRequestMessage::Assistant((s.as_str()).into())
                }
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: &[Message],
    ) -> Result<CreateChatCompletionRequest, AgentError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages));

        if let Some(tools) = self.tools.as_ref().filter(|t| !t.is_empty()) {
            let chat_tools: Vec<ChatCompletionTools> = tools
                .iter()
                .map(|t| {
                    ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: Some(t.input_schema.clone()),
                            ..Default::default()
                        },
                    })
                })
                .collect();
            args.tools(chat_tools);
            let opt = match self.tool_choice.unwrap_or_default() {
                ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
                ToolChoiceMode::None => ToolChoiceOptions::None,
                ToolChoiceMode::Required => ToolChoiceOptions::Required,
            };
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(opt));
        }
        if let Some(t) = self.temperature {
            args.temperature(t);
        }

        args.build().map_err(|e| {
            AgentError::ExecutionFailed(format!("OpenAI request build failed: {}", e))
        })
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let request = self.build_request(messages)?;

        debug!(
            trace_id = %trace_id,
            model = %self.model,
            message_count = messages.len(),
            tools_count = self.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            temperature = ?self.temperature,
            "chat completion create"
        );
        if let Ok(js) = serde_json::to_string(&request) {
            trace!(trace_id = %trace_id, request = %js, "chat completion request body");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("OpenAI API error: {}", e)))?;

        if let Ok(js) = serde_json::to_string(&response) {
            trace!(trace_id = %trace_id, response = %js, "chat completion response body");
        }

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AgentError::ExecutionFailed("OpenAI returned no choices".to_string())
        })?;
        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(ToolCall {
                    name: f.function.name,
                    arguments: f.function.arguments,
                    id: Some(f.id),
                }),
                _ => None,
            })
            .collect();
        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            content,
            tool_calls,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> OpenAIConfig {
        OpenAIConfig::new()
            .with_api_key("test-key")
            .with_api_base("https://127.0.0.1:1")
    }

    /// **Scenario**: Tools are sent with tool_choice auto unless overridden.
    #[test]
    fn build_request_includes_tools_with_auto_choice() {
        let client = ChatOpenAI::with_config(unreachable_config(), "gpt-4o-mini")
            .with_tools(vec![ToolSpec {
                name: "get_devices".into(),
                description: Some("List inventory".into()),
                input_schema: serde_json::json!({"type": "object"}),
            }])
            .with_temperature(0.0);
        let request = client.build_request(&[Message::user("hi")]).unwrap();
        let js = serde_json::to_value(&request).unwrap();
        assert_eq!(js["tools"][0]["function"]["name"], "get_devices");
        assert_eq!(js["tool_choice"], "auto");
        assert_eq!(js["messages"].as_array().map(|m| m.len()), Some(1));
    }

    /// **Scenario**: Without tools, neither tools nor tool_choice is sent.
    #[test]
    fn build_request_without_tools_omits_tool_fields() {
        let client = ChatOpenAI::with_config(unreachable_config(), "gpt-4o-mini")
            .with_tool_choice(ToolChoiceMode::Required);
        let request = client
            .build_request(&[Message::system("s"), Message::user("u")])
            .unwrap();
        let js = serde_json::to_value(&request).unwrap();
        assert!(js.get("tools").map_or(true, |t| t.is_null()));
        assert!(js.get("tool_choice").map_or(true, |t| t.is_null()));
    }

    /// **Scenario**: invoke() against an unreachable API base returns an error (no real key needed).
    #[tokio::test]
    async fn invoke_with_unreachable_base_returns_error() {
        let client = ChatOpenAI::with_config(unreachable_config(), "gpt-4o-mini");
        let result = client.invoke(&[Message::user("Hello")]).await;
        assert!(result.is_err(), "invoke against unreachable base should return Err");
    }

    #[tokio::test]
    #[ignore = "Requires OPENAI_API_KEY; run with: cargo test -p oncall invoke_with_real_api -- --ignored"]
    async fn invoke_with_real_api_returns_ok() {
        std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set for this test");
        let client = ChatOpenAI::new("gpt-4o-mini");
        let response = client
            .invoke(&[Message::user("Say exactly: ok")])
            .await
            .expect("invoke with real API should succeed");
        assert!(!response.content.is_empty() || !response.tool_calls.is_empty());
    }
}
