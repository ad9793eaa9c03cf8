//! Execution error type shared by graph nodes, LLM clients and the tool agent.
//!
//! Workflow nodes catch these and degrade state instead of propagating; only
//! infrastructure failures (compilation, start-up) reach the caller.

use thiserror::Error;

/// Execution error.
///
/// Returned by `Node::run`, `LlmClient::invoke` and the ReAct tool agent when a step fails.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. LLM call failed, response unparseable).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display format of ExecutionFailed contains "execution failed" and the message.
    #[test]
    fn agent_error_display_execution_failed() {
        let err = AgentError::ExecutionFailed("no assistant message".to_string());
        let s = err.to_string();
        assert!(s.contains("execution failed"), "{}", s);
        assert!(s.contains("no assistant message"), "{}", s);
    }
}
