//! Tool agent runner: think → act → observe over the MCP tools, and extraction
//! of what the agent said and did.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::AgentError;
use crate::graph::{CompiledStateGraph, RetryPolicy, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::{ExecutedToolCall, ReActState, ToolExchange};
use crate::tool_source::ToolSource;

use super::act_node::{parse_tool_arguments, ActNode};
use super::observe_node::{ObserveNode, MAX_REACT_TURNS};
use super::think_node::ThinkNode;
use super::tools_condition;

/// Failed model calls inside the tool agent are re-run this many times.
pub const TOOL_AGENT_RETRIES: usize = 2;

/// Backoff for the tool agent's steps: 200ms, then 400ms.
pub fn tool_agent_retry_policy() -> RetryPolicy {
    RetryPolicy::exponential(
        TOOL_AGENT_RETRIES,
        Duration::from_millis(200),
        Duration::from_secs(2),
    )
}

/// Builds the ReAct graph: think routes to act or END; act → observe; observe loops.
///
/// A step that errors (an LLM call timing out, say) is re-run per
/// [`tool_agent_retry_policy`] before the agent gives up.
pub fn build_react_graph(
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
) -> Result<CompiledStateGraph<ReActState>, AgentError> {
    let mut graph = StateGraph::<ReActState>::new()
        .with_recursion_limit(3 * MAX_REACT_TURNS as usize + 2)
        .with_retry_policy(tool_agent_retry_policy());
    graph
        .add_node("think", Arc::new(ThinkNode::new(llm)))
        .add_node("act", Arc::new(ActNode::new(tools)))
        .add_node("observe", Arc::new(ObserveNode))
        .add_edge(START, "think")
        .add_edge("act", "observe");
    let path_map: HashMap<String, String> = [
        ("tools".to_string(), "act".to_string()),
        (END.to_string(), END.to_string()),
    ]
    .into_iter()
    .collect();
    graph.add_conditional_edges(
        "think",
        Arc::new(|state: &ReActState| tools_condition(state).as_str().to_string()),
        Some(path_map),
    );
    graph
        .compile()
        .map_err(|e| AgentError::ExecutionFailed(format!("tool agent graph: {}", e)))
}

/// Runs one tool-using agent session: system prompt plus one user message.
///
/// Returns the final ReAct state; use [`extract_response_content`] to read it.
pub async fn run_tool_agent(
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
    system_prompt: &str,
    user_content: &str,
) -> Result<ReActState, AgentError> {
    let graph = build_react_graph(llm, tools)?;
    let state = graph
        .invoke(ReActState::new(system_prompt, user_content))
        .await?;
    info!(
        turns = state.turn_count,
        tool_calls = state.tool_history.len(),
        total_tokens = state.total_usage.as_ref().map(|u| u.total_tokens),
        "tool agent finished"
    );
    Ok(state)
}

/// Content of the last assistant message in the agent's conversation.
///
/// Errors when there are no messages at all or none from the assistant.
pub fn last_assistant_message(state: &ReActState) -> Result<String, AgentError> {
    if state.messages.is_empty() {
        return Err(AgentError::ExecutionFailed(
            "Invalid tool agent response: no messages".to_string(),
        ));
    }
    state.last_assistant_reply().ok_or_else(|| {
        AgentError::ExecutionFailed("No assistant message found in tool agent response".to_string())
    })
}

/// Converts one exchange into an executed tool call.
///
/// Non-JSON result text is kept as `{"raw_content": text}`; params carry the
/// call id and the parsed arguments.
pub fn to_executed_tool_call(exchange: &ToolExchange) -> ExecutedToolCall {
    let mut params = Map::new();
    params.insert(
        "tool_call_id".to_string(),
        exchange.call.id.clone().map_or(Value::Null, Value::String),
    );
    params.insert(
        "arguments".to_string(),
        parse_tool_arguments(&exchange.call.arguments),
    );

    let content = &exchange.result.content;
    let (result, error) = if exchange.result.is_error {
        (None, Some(content.clone()))
    } else {
        let parsed = serde_json::from_str::<Value>(content).unwrap_or_else(|_| {
            debug!(tool = %exchange.call.name, "tool result is not JSON, keeping raw text");
            json!({ "raw_content": content })
        });
        (Some(parsed), None)
    };

    ExecutedToolCall {
        function: exchange.call.name.clone(),
        params,
        result,
        error,
    }
}

/// Final analysis text plus every tool call the agent made, in order.
pub fn extract_response_content(
    state: &ReActState,
) -> Result<(String, Vec<ExecutedToolCall>), AgentError> {
    let analysis = last_assistant_message(state)?;
    let calls = state.tool_history.iter().map(to_executed_tool_call).collect();
    Ok((analysis, calls))
}

/// True when `message` carries a tool result fed back by the observe step.
pub fn is_tool_observation(message: &Message) -> bool {
    matches!(message, Message::User(s) if s.starts_with(super::observe_node::OBSERVATION_PREFIX) && s.contains(" returned: "))
}
