//! Observe node: merge tool results into messages, clear tool_calls and tool_results.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::message::Message;
use crate::state::ReActState;

/// Maximum number of ReAct loop rounds (observe passes) before forcing End.
pub const MAX_REACT_TURNS: u32 = 10;

/// Prefix of the user message carrying one tool result.
pub(crate) const OBSERVATION_PREFIX: &str = "Tool ";

/// Observe node: appends each result as a User message ("Tool x returned: ...")
/// and loops back to think while the round had tool calls and the turn limit
/// is not reached.
pub struct ObserveNode;

#[async_trait]
impl Node<ReActState> for ObserveNode {
    fn id(&self) -> &str {
        "observe"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let had_tool_calls = !state.tool_calls.is_empty();
        let mut messages = state.messages;
        for tr in &state.tool_results {
            messages.push(Message::User(format!(
                "{}{} returned: {}",
                OBSERVATION_PREFIX, tr.name, tr.content
            )));
        }
        let next_turn = state.turn_count.saturating_add(1);
        let next = if next_turn >= MAX_REACT_TURNS {
            tracing::warn!(turns = next_turn, "tool agent reached max turns");
            Next::End
        } else if had_tool_calls {
            Next::Node("think".to_string())
        } else {
            Next::End
        };
        let new_state = ReActState {
            messages,
            tool_calls: vec![],
            tool_results: vec![],
            turn_count: next_turn,
            ..state
        };
        Ok((new_state, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ToolCall, ToolResult};

    fn with_round(turn_count: u32) -> ReActState {
        let mut state = ReActState::new("sys", "q");
        state.turn_count = turn_count;
        state.tool_calls = vec![ToolCall {
            name: "ping".into(),
            arguments: "{}".into(),
            id: None,
        }];
        state.tool_results = vec![ToolResult {
            call_id: None,
            name: "ping".into(),
            content: "pong".into(),
            is_error: false,
        }];
        state
    }

    #[tokio::test]
    async fn observe_appends_results_and_loops_to_think() {
        let (state, next) = ObserveNode.run(with_round(0)).await.unwrap();
        assert_eq!(next, Next::Node("think".into()));
        assert_eq!(state.messages.last().map(|m| m.content()), Some("Tool ping returned: pong"));
        assert!(state.tool_calls.is_empty());
        assert!(state.tool_results.is_empty());
        assert_eq!(state.turn_count, 1);
    }

    #[tokio::test]
    async fn observe_ends_at_turn_limit() {
        let (_, next) = ObserveNode.run(with_round(MAX_REACT_TURNS - 1)).await.unwrap();
        assert_eq!(next, Next::End);
    }
}
