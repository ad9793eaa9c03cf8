//! In-memory tool source for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

enum MockOutcome {
    Text(String),
    Fail(String),
}

/// Mock tool source: fixed tool list, per-tool results or failures.
///
/// Unknown tools return `ToolSourceError::NotFound`; calls are recorded as
/// `(name, arguments)` for assertions.
pub struct MockToolSource {
    tools: Vec<ToolSpec>,
    outcomes: HashMap<String, MockOutcome>,
    default_result: Option<String>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Value)>>,
}

impl MockToolSource {
    /// No tools.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            outcomes: HashMap::new(),
            default_result: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Adds a tool whose calls return `result` (builder).
    pub fn with_tool(mut self, name: impl Into<String>, result: impl Into<String>) -> Self {
        let name = name.into();
        self.tools.push(Self::spec(&name));
        self.outcomes.insert(name, MockOutcome::Text(result.into()));
        self
    }

    /// Adds a tool whose calls fail with `ToolSourceError::Tool(message)` (builder).
    pub fn with_failing_tool(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        self.tools.push(Self::spec(&name));
        self.outcomes.insert(name, MockOutcome::Fail(message.into()));
        self
    }

    /// Any tool name, listed or not, returns `result` (builder).
    pub fn with_default_result(mut self, result: impl Into<String>) -> Self {
        self.default_result = Some(result.into());
        self
    }

    /// Number of `call_tool` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded_calls(&self) -> Vec<(String, Value)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            description: Some(format!("Mock tool {}", name)),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "device_name": { "type": "string" } }
            }),
        }
    }
}

impl Default for MockToolSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((name.to_string(), arguments));
        }
        match (self.outcomes.get(name), &self.default_result) {
            (Some(MockOutcome::Text(t)), _) => Ok(ToolCallContent { text: t.clone() }),
            (Some(MockOutcome::Fail(m)), _) => Err(ToolSourceError::Tool(m.clone())),
            (None, Some(t)) => Ok(ToolCallContent { text: t.clone() }),
            (None, None) => Err(ToolSourceError::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_tool_source_lists_and_calls() {
        let tools = MockToolSource::new()
            .with_tool("get_interfaces", r#"{"eth0": "up"}"#)
            .with_failing_tool("get_bgp", "FEATURE_NOT_FOUND");
        let specs = tools.list_tools().await.unwrap();
        assert_eq!(specs.len(), 2);
        let ok = tools
            .call_tool("get_interfaces", serde_json::json!({"device_name": "R1"}))
            .await
            .unwrap();
        assert_eq!(ok.text, r#"{"eth0": "up"}"#);
        assert!(matches!(
            tools.call_tool("get_bgp", Value::Null).await,
            Err(ToolSourceError::Tool(_))
        ));
        assert!(matches!(
            tools.call_tool("missing", Value::Null).await,
            Err(ToolSourceError::NotFound(_))
        ));
        assert_eq!(tools.call_count(), 3);
        assert_eq!(tools.recorded_calls()[0].1["device_name"], "R1");
    }

    #[tokio::test]
    async fn default_result_answers_unknown_tools() {
        let tools = MockToolSource::new().with_default_result("ok");
        assert_eq!(tools.call_tool("anything", Value::Null).await.unwrap().text, "ok");
    }
}
