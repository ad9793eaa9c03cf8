//! ReAct state and tool types for the MCP tool agent.
//!
//! ReActState holds messages plus per-round tool_calls and tool_results; Think/Act/Observe
//! nodes read and write these fields. ToolCall and ToolResult align with MCP `tools/call`
//! and result content.

use serde::{Deserialize, Serialize};

use crate::llm::LlmUsage;
use crate::message::Message;

/// A single tool invocation produced by the LLM (Think node) and consumed by Act.
///
/// Aligns with MCP `tools/call`: `name` and `arguments` (JSON string).
/// Optional `id` correlates with `ToolResult::call_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as registered in ToolSource (MCP tools/list).
    pub name: String,
    /// Arguments as JSON string; parsed in Act when calling the tool.
    pub arguments: String,
    pub id: Option<String>,
}

/// Result of executing one tool call (Act node output, Observe node input).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the tool call this result belongs to (if ToolCall had `id`).
    pub call_id: Option<String>,
    pub name: String,
    /// Result text (MCP result.content[].text joined), or the error message.
    pub content: String,
    /// True when the tool failed or the MCP server flagged `isError`.
    #[serde(default)]
    pub is_error: bool,
}

/// One executed tool call with its result, kept for the whole agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExchange {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// State for the ReAct graph: Think → Act → Observe.
///
/// `tool_calls` and `tool_results` are per round and cleared by Observe;
/// `tool_history` keeps every exchange so callers can record what ran.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReActState {
    /// Conversation history (System, User, Assistant). Used by Think and extended by Observe.
    pub messages: Vec<Message>,
    /// Current round tool calls from the LLM (Think writes, Act reads).
    pub tool_calls: Vec<ToolCall>,
    /// Current round tool execution results (Act writes, Observe reads and merges).
    pub tool_results: Vec<ToolResult>,
    /// Every call/result pair of the run, in execution order.
    #[serde(default)]
    pub tool_history: Vec<ToolExchange>,
    /// Number of observe rounds completed; incremented in ObserveNode, used to enforce max turns.
    #[serde(default)]
    pub turn_count: u32,
    /// Token usage for the last LLM call (Think node).
    #[serde(default)]
    pub usage: Option<LlmUsage>,
    /// Accumulated token usage over the whole run (sum of all Think turns).
    #[serde(default)]
    pub total_usage: Option<LlmUsage>,
}

impl ReActState {
    /// State seeded with a system prompt and one user message.
    pub fn new(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_content)],
            ..Default::default()
        }
    }

    /// Returns the content of the chronologically last Assistant message, if any.
    ///
    /// Empty content (an assistant turn with only tool_calls) returns `Some("")`;
    /// `None` only when there is no Assistant message at all.
    pub fn last_assistant_reply(&self) -> Option<String> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant(s) => Some(s.clone()),
            _ => None,
        })
    }
}
