//! Act node: execute the round's tool calls through a `ToolSource`.
//!
//! Tool failures never abort the agent: each becomes an error result the model
//! sees on its next turn, so it can retry or report the limitation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::state::{ReActState, ToolExchange, ToolResult};
use crate::tool_source::ToolSource;

/// Error text fed back to the model when a tool call fails.
pub const DEFAULT_TOOL_ERROR_TEMPLATE: &str =
    "Error executing tool '{tool_name}' with arguments {tool_args}:\n {error}\n Please fix the error and try again.";

fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

/// Parses ToolCall.arguments to JSON. Empty or invalid text becomes `{}`;
/// a JSON string holding JSON is unwrapped once.
pub(crate) fn parse_tool_arguments(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return serde_json::json!({});
    }
    let raw: Value = match serde_json::from_str(arguments) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, arguments = %arguments, "tool arguments JSON parse failed, using empty object");
            return serde_json::json!({});
        }
    };
    match raw.as_str().map(serde_json::from_str::<Value>) {
        Some(Ok(inner)) => inner,
        _ => raw,
    }
}

/// Act node: runs every tool call of the round and records results and history.
pub struct ActNode {
    tools: Arc<dyn ToolSource>,
}

impl ActNode {
    pub fn new(tools: Arc<dyn ToolSource>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Node<ReActState> for ActNode {
    fn id(&self) -> &str {
        "act"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let mut tool_results = Vec::with_capacity(state.tool_calls.len());
        let mut tool_history = state.tool_history;

        for tc in &state.tool_calls {
            let args = parse_tool_arguments(&tc.arguments);
            debug!(tool = %tc.name, args = %args, "calling tool");

            let result = match self.tools.call_tool(&tc.name, args.clone()).await {
                Ok(content) => {
                    trace!(
                        tool = %tc.name,
                        result_len = content.text.len(),
                        result_preview = %truncate_for_log(&content.text, 200),
                        "tool returned"
                    );
                    ToolResult {
                        call_id: tc.id.clone(),
                        name: tc.name.clone(),
                        content: content.text,
                        is_error: false,
                    }
                }
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, "tool call failed");
                    ToolResult {
                        call_id: tc.id.clone(),
                        name: tc.name.clone(),
                        content: DEFAULT_TOOL_ERROR_TEMPLATE
                            .replace("{tool_name}", &tc.name)
                            .replace("{tool_args}", &args.to_string())
                            .replace("{error}", &e.to_string()),
                        is_error: true,
                    }
                }
            };
            tool_history.push(ToolExchange {
                call: tc.clone(),
                result: result.clone(),
            });
            tool_results.push(result);
        }

        let new_state = ReActState {
            tool_results,
            tool_history,
            ..state
        };
        Ok((new_state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ToolCall;
    use crate::tool_source::MockToolSource;

    #[test]
    fn parse_tool_arguments_handles_empty_invalid_and_nested() {
        assert_eq!(parse_tool_arguments(""), serde_json::json!({}));
        assert_eq!(parse_tool_arguments("{oops"), serde_json::json!({}));
        assert_eq!(
            parse_tool_arguments(r#""{\"device_name\":\"R1\"}""#),
            serde_json::json!({"device_name": "R1"})
        );
        assert_eq!(parse_tool_arguments(r#""plain""#), serde_json::json!("plain"));
    }

    /// **Scenario**: A failing tool yields an error result and the run continues.
    #[tokio::test]
    async fn act_records_results_and_errors_without_aborting() {
        let tools = MockToolSource::new()
            .with_tool("get_interfaces", r#"{"eth0":"up"}"#)
            .with_failing_tool("get_bgp", "FEATURE_NOT_FOUND");
        let node = ActNode::new(Arc::new(tools));
        let mut state = ReActState::new("sys", "check");
        state.tool_calls = vec![
            ToolCall {
                name: "get_interfaces".into(),
                arguments: r#"{"device_name":"R1"}"#.into(),
                id: Some("c1".into()),
            },
            ToolCall {
                name: "get_bgp".into(),
                arguments: "{}".into(),
                id: Some("c2".into()),
            },
        ];
        let (state, next) = node.run(state).await.unwrap();
        assert_eq!(next, Next::Continue);
        assert_eq!(state.tool_results.len(), 2);
        assert!(!state.tool_results[0].is_error);
        assert!(state.tool_results[1].is_error);
        assert!(state.tool_results[1].content.contains("FEATURE_NOT_FOUND"));
        assert_eq!(state.tool_history.len(), 2);
        assert_eq!(state.tool_history[0].call.id.as_deref(), Some("c1"));
    }
}
