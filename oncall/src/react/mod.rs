//! MCP tool agent: think → act → observe over a `ToolSource`.
//!
//! - **[`ThinkNode`]**: calls the tool-bound LLM; may output tool calls.
//! - **[`ActNode`]**: executes `tool_calls` via [`ToolSource`](crate::tool_source::ToolSource);
//!   failures become error results.
//! - **[`ObserveNode`]**: feeds results back as user messages; loops to think
//!   until the model stops calling tools or [`MAX_REACT_TURNS`] is reached.
//!
//! Workflow nodes use [`run_tool_agent`] and [`extract_response_content`].

mod act_node;
mod agent;
mod observe_node;
mod think_node;

pub use act_node::{ActNode, DEFAULT_TOOL_ERROR_TEMPLATE};
pub use agent::{
    build_react_graph, extract_response_content, is_tool_observation, last_assistant_message,
    run_tool_agent, to_executed_tool_call, tool_agent_retry_policy, TOOL_AGENT_RETRIES,
};
pub use observe_node::{ObserveNode, MAX_REACT_TURNS};
pub use think_node::ThinkNode;

use crate::state::ReActState;

/// Output of [`tools_condition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolsConditionResult {
    /// Route to the act node.
    Tools,
    /// Route to END.
    End,
}

impl ToolsConditionResult {
    /// `Tools` -> `"tools"`, `End` -> `"__end__"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::End => crate::graph::END,
        }
    }
}

/// Routes to the act node when the last think produced tool calls, else ends.
pub fn tools_condition(state: &ReActState) -> ToolsConditionResult {
    if state.tool_calls.is_empty() {
        ToolsConditionResult::End
    } else {
        ToolsConditionResult::Tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ToolCall;

    /// **Scenario**: tools_condition returns End when no tool calls.
    #[test]
    fn tools_condition_returns_end_when_no_tool_calls() {
        let state = ReActState::new("sys", "hello");
        let result = tools_condition(&state);
        assert_eq!(result, ToolsConditionResult::End);
        assert_eq!(result.as_str(), "__end__");
    }

    /// **Scenario**: tools_condition returns Tools when tool calls present.
    #[test]
    fn tools_condition_returns_tools_when_tool_calls_present() {
        let mut state = ReActState::new("sys", "search");
        state.tool_calls = vec![ToolCall {
            id: Some("tc1".into()),
            name: "search".into(),
            arguments: "{}".into(),
        }];
        let result = tools_condition(&state);
        assert_eq!(result, ToolsConditionResult::Tools);
        assert_eq!(result.as_str(), "tools");
    }
}
