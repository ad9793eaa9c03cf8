//! Think node: read messages, call LLM, write assistant message and optional tool_calls.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::ReActState;

/// Think node: one ReAct step that produces an assistant message and optional tool_calls.
///
/// **Interaction**: Implements `Node<ReActState>`; the LLM is expected to have the
/// MCP tools bound (`ChatOpenAI::with_tools`).
pub struct ThinkNode {
    llm: Arc<dyn LlmClient>,
}

impl ThinkNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node<ReActState> for ThinkNode {
    fn id(&self) -> &str {
        "think"
    }

    /// Calls the LLM, appends its reply and sets `tool_calls`; usage is accumulated.
    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let response = self.llm.invoke(&state.messages).await?;
        debug!(
            turn = state.turn_count,
            tool_calls = response.tool_calls.len(),
            content_len = response.content.len(),
            "think"
        );
        let total_usage = match (&state.total_usage, &response.usage) {
            (Some(t), Some(u)) => Some(t.add(u)),
            (None, Some(u)) => Some(u.clone()),
            (t, None) => t.clone(),
        };
        let mut messages = state.messages;
        messages.push(Message::Assistant(response.content));
        let new_state = ReActState {
            messages,
            tool_calls: response.tool_calls,
            usage: response.usage,
            total_usage,
            ..state
        };
        Ok((new_state, Next::Continue))
    }
}
