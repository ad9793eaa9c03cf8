//! Mock LLM for tests and offline runs.
//!
//! Replies are picked by routes: the first route whose needle occurs in any
//! message of the request answers, otherwise the fallback does. Each route holds
//! a sequence of replies; the last one repeats once the sequence is used up.
//! Because routing looks at the request text (system prompt, device name),
//! concurrent device investigations get deterministic answers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, LlmUsage};
use crate::message::Message;
use crate::react::is_tool_observation;
use crate::state::ToolCall;

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Assistant text, no tool calls.
    Text(String),
    /// Assistant text plus tool calls.
    ToolCalls {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    /// Tool calls until the request ends with a tool observation, then the answer.
    /// Stateless, so it behaves the same for every conversation it serves.
    ToolsThenAnswer {
        tool_calls: Vec<ToolCall>,
        answer: String,
    },
    /// `invoke` returns `AgentError::ExecutionFailed`.
    Error(String),
    /// `invoke` panics; exercises task isolation in the executor.
    Panic(String),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// One tool call with JSON arguments, then `answer`.
    pub fn tool_then_answer(
        tool: impl Into<String>,
        arguments: serde_json::Value,
        answer: impl Into<String>,
    ) -> Self {
        Self::ToolsThenAnswer {
            tool_calls: vec![ToolCall {
                name: tool.into(),
                arguments: arguments.to_string(),
                id: Some("call-1".to_string()),
            }],
            answer: answer.into(),
        }
    }
}

struct Route {
    needle: String,
    replies: Vec<MockReply>,
    cursor: AtomicUsize,
}

impl Route {
    fn new(needle: impl Into<String>, replies: Vec<MockReply>) -> Self {
        Self {
            needle: needle.into(),
            replies,
            cursor: AtomicUsize::new(0),
        }
    }

    fn matches(&self, messages: &[Message]) -> bool {
        messages.iter().any(|m| m.content().contains(&self.needle))
    }

    fn next_reply(&self) -> MockReply {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        let idx = n.min(self.replies.len().saturating_sub(1));
        self.replies
            .get(idx)
            .cloned()
            .unwrap_or_else(|| MockReply::Text(String::new()))
    }
}

/// Mock LLM: scripted assistant text and tool_calls.
///
/// **Interaction**: Implements `LlmClient`; stands in for both the tool-bound agent
/// model and the plain model in workflow tests.
pub struct MockLlm {
    routes: Vec<Route>,
    fallback: Route,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl MockLlm {
    fn from_fallback(replies: Vec<MockReply>) -> Self {
        Self {
            routes: Vec::new(),
            fallback: Route::new("", replies),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns `content` and `tool_calls` on every call.
    pub fn new(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::from_fallback(vec![MockReply::ToolCalls {
            content: content.into(),
            tool_calls,
        }])
    }

    /// Returns assistant text and no tool_calls (END path) on every call.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self::from_fallback(vec![MockReply::text(content)])
    }

    /// First call asks for `tool` with empty arguments, later calls answer with `answer`.
    pub fn first_tools_then_end(tool: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::from_fallback(vec![
            MockReply::ToolCalls {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    name: tool.into(),
                    arguments: "{}".to_string(),
                    id: Some("call-1".to_string()),
                }],
            },
            MockReply::text(answer),
        ])
    }

    /// Replays `replies` in order for unmatched requests.
    pub fn sequence(replies: Vec<MockReply>) -> Self {
        Self::from_fallback(replies)
    }

    /// Every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_fallback(vec![MockReply::Error(message.into())])
    }

    /// Requests containing `needle` get `reply` (builder).
    pub fn on(self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.on_sequence(needle, vec![reply])
    }

    /// Requests containing `needle` get `replies` in order, last one repeating (builder).
    pub fn on_sequence(mut self, needle: impl Into<String>, replies: Vec<MockReply>) -> Self {
        self.routes.push(Route::new(needle, replies));
        self
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists received so far, in call order.
    pub fn recorded_calls(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(messages.to_vec());
        }
        let route = self
            .routes
            .iter()
            .find(|r| r.matches(messages))
            .unwrap_or(&self.fallback);
        let usage = Some(LlmUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        let (content, tool_calls) = match route.next_reply() {
            MockReply::Text(content) => (content, vec![]),
            MockReply::ToolCalls {
                content,
                tool_calls,
            } => (content, tool_calls),
            MockReply::ToolsThenAnswer { tool_calls, answer } => {
                if messages.last().is_some_and(is_tool_observation) {
                    (answer, vec![])
                } else {
                    (String::new(), tool_calls)
                }
            }
            MockReply::Error(message) => return Err(AgentError::ExecutionFailed(message)),
            MockReply::Panic(message) => panic!("{}", message),
        };
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

    /// **Scenario**: Routes match on any message text; unmatched requests use the fallback.
    #[tokio::test]
    async fn routes_by_needle_then_fallback() {
        let llm = MockLlm::with_no_tool_calls("fallback").on("assessor", MockReply::text("routed"));
        let routed = llm
            .invoke(&[Message::system("you are the assessor"), Message::user("x")])
            .await
            .unwrap();
        assert_eq!(routed.content, "routed");
        let other = llm.invoke(&[Message::user("plain")]).await.unwrap();
        assert_eq!(other.content, "fallback");
        assert_eq!(llm.call_count(), 2);
        assert_eq!(llm.recorded_calls().len(), 2);
    }

    /// **Scenario**: A sequence replays in order and repeats its last reply.
    #[tokio::test]
    async fn sequence_repeats_last_reply() {
        let llm = MockLlm::sequence(vec![MockReply::text("one"), MockReply::text("two")]);
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(llm.invoke(&[]).await.unwrap().content);
        }
        assert_eq!(out, vec!["one", "two", "two"]);
    }

    /// **Scenario**: first_tools_then_end returns tool calls once, then text without tools.
    #[tokio::test]
    async fn first_tools_then_end_switches_after_first_call() {
        let llm = MockLlm::first_tools_then_end("get_devices", "done");
        let first = llm.invoke(&[]).await.unwrap();
        assert_eq!(first.tool_calls.len(), 1);
        assert_eq!(first.tool_calls[0].name, "get_devices");
        let second = llm.invoke(&[]).await.unwrap();
        assert!(second.tool_calls.is_empty());
        assert_eq!(second.content, "done");
    }

    /// **Scenario**: ToolsThenAnswer answers only once the last message is a tool observation.
    #[tokio::test]
    async fn tools_then_answer_depends_on_last_message() {
        let llm = MockLlm::sequence(vec![MockReply::tool_then_answer(
            "get_interfaces",
            serde_json::json!({"device_name": "R1"}),
            "all interfaces up",
        )]);
        let first = llm.invoke(&[Message::user("check R1")]).await.unwrap();
        assert_eq!(first.tool_calls[0].name, "get_interfaces");
        let second = llm
            .invoke(&[
                Message::user("check R1"),
                Message::user("Tool get_interfaces returned: {}"),
            ])
            .await
            .unwrap();
        assert!(second.tool_calls.is_empty());
        assert_eq!(second.content, "all interfaces up");
    }

    #[tokio::test]
    async fn failing_returns_execution_failed() {
        let llm = MockLlm::failing("rate limited");
        match llm.invoke(&[]).await {
            Err(AgentError::ExecutionFailed(m)) => assert_eq!(m, "rate limited"),
            other => panic!("expected error, got {:?}", other.map(|r| r.content)),
        }
    }
}
