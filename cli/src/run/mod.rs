//! Commands behind the binary: one-shot query, REPL, tool and logger listings.
//!
//! Each command takes an already built [`OncallRuntime`] (or tool source) so it can be
//! driven with mock models in tests; `main` only wires settings and connections.

mod listing;
mod repl;

pub use listing::{format_loggers, format_tools, list_tools};
pub use repl::run_repl;

use std::path::PathBuf;

use oncall::workflow::RuntimeError;
use oncall::{AgentError, OncallRuntime, OncallSession, Settings, SettingsError, ToolSourceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
    #[error("workflow: {0}")]
    Workflow(#[from] AgentError),
    #[error("mcp tools: {0}")]
    Tools(#[from] ToolSourceError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("provide a query as positional arguments, or use the `repl` subcommand")]
    MissingQuery,
}

/// Command-line values that override the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub mcp_config: Option<PathBuf>,
    pub plans_dir: Option<PathBuf>,
    pub max_retries: Option<u32>,
}

impl CliOverrides {
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(path) = self.mcp_config {
            settings.mcp_config = path;
        }
        if let Some(dir) = self.plans_dir {
            settings.plans_dir = dir;
        }
        if let Some(n) = self.max_retries {
            settings.max_retries = n;
        }
        settings
    }
}

/// What a one-shot query prints.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Report(String),
    /// Final workflow state, pretty-printed JSON.
    State(String),
}

impl QueryOutput {
    pub fn as_str(&self) -> &str {
        match self {
            QueryOutput::Report(s) | QueryOutput::State(s) => s,
        }
    }
}

/// Joins positional words into a query; blank input is [`RunError::MissingQuery`].
pub fn query_from_args(words: &[String]) -> Result<String, RunError> {
    let query = words.join(" ");
    let query = query.trim();
    if query.is_empty() {
        return Err(RunError::MissingQuery);
    }
    Ok(query.to_string())
}

/// Runs one query through a fresh session.
pub async fn run_query(
    runtime: &OncallRuntime,
    query: &str,
    json: bool,
) -> Result<QueryOutput, RunError> {
    let mut session = OncallSession::new(runtime)?;
    let report = session.ask(query).await?;
    if json {
        Ok(QueryOutput::State(serde_json::to_string_pretty(session.state())?))
    } else {
        Ok(QueryOutput::Report(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use oncall::{MockLlm, MockReply, MockToolSource};

    pub(crate) fn mock_runtime(report: &str) -> OncallRuntime {
        let agent = MockLlm::with_no_tool_calls("no devices found");
        let llm = MockLlm::with_no_tool_calls(report)
            .on("no devices found", MockReply::text(r#"{"devices": []}"#))
            .on(
                "Network Investigation Assessment Context",
                MockReply::text(r#"{"is_objective_achieved": true, "notes_for_final_report": "ok"}"#),
            );
        let plans = std::env::temp_dir().join("sp-oncall-cli-no-plans");
        OncallRuntime::new(
            Arc::new(agent),
            Arc::new(llm),
            Arc::new(MockToolSource::new()),
            Settings {
                plans_dir: plans,
                ..Settings::default()
            },
        )
    }

    /// **Scenario**: Flags replace only the values they name.
    #[test]
    fn overrides_apply_only_given_values() {
        let base = Settings::default();
        let out = CliOverrides {
            model: Some("openai/gpt-4o-mini".to_string()),
            max_retries: Some(1),
            ..CliOverrides::default()
        }
        .apply(base.clone());
        assert_eq!(out.model, "openai/gpt-4o-mini");
        assert_eq!(out.max_retries, 1);
        assert_eq!(out.mcp_config, base.mcp_config);
        assert_eq!(out.plans_dir, base.plans_dir);
    }

    #[test]
    fn query_from_args_joins_and_rejects_blank() {
        let words = vec!["check".to_string(), "R1".to_string()];
        assert_eq!(query_from_args(&words).unwrap(), "check R1");
        assert!(matches!(query_from_args(&[]), Err(RunError::MissingQuery)));
        assert!(matches!(
            query_from_args(&["  ".to_string()]),
            Err(RunError::MissingQuery)
        ));
    }

    /// **Scenario**: Plain output is the report; `--json` prints the final state.
    #[tokio::test]
    async fn run_query_report_and_json() {
        let runtime = mock_runtime("REPORT: nothing to investigate");
        let out = run_query(&runtime, "check the lab", false).await.unwrap();
        assert_eq!(out, QueryOutput::Report("REPORT: nothing to investigate".to_string()));

        let out = run_query(&runtime, "check the lab", true).await.unwrap();
        let state: serde_json::Value = serde_json::from_str(out.as_str()).unwrap();
        assert_eq!(state["final_report"], "REPORT: nothing to investigate");
        assert_eq!(state["user_query"], "check the lab");
        assert_eq!(state["workflow_sessions"].as_array().map(Vec::len), Some(1));
    }
}
