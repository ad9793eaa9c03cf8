//! Multi-query session: session history carries over between questions.

use tracing::info;

use crate::error::AgentError;
use crate::graph::CompiledStateGraph;
use crate::state::{WorkflowSession, WorkflowState};

use super::{build_oncall_graph, OncallRuntime};

/// Answers queries one after another over the same workflow state.
///
/// Each [`ask`](Self::ask) clears the per-query fields and keeps
/// `workflow_sessions`, so later planning, execution and assessment see the
/// earlier reports and learned insights.
pub struct OncallSession {
    graph: CompiledStateGraph<WorkflowState>,
    state: WorkflowState,
}

impl OncallSession {
    pub fn new(runtime: &OncallRuntime) -> Result<Self, AgentError> {
        Ok(Self {
            graph: build_oncall_graph(runtime)?,
            state: WorkflowState::default().with_max_retries(runtime.settings.max_retries),
        })
    }

    /// Runs the workflow for `query` and returns the final report.
    ///
    /// Node failures degrade the report rather than failing; an `Err` means the
    /// graph itself could not run, and the session state is left unchanged.
    pub async fn ask(&mut self, query: &str) -> Result<String, AgentError> {
        let mut state = self.state.clone();
        state.reset_for_next_query();
        state.user_query = query.to_string();
        info!(query = %query, history = state.workflow_sessions.len(), "on-call query");

        let out = self.graph.invoke(state).await?;
        let report = out.final_report.clone().unwrap_or_default();
        self.state = out;
        Ok(report)
    }

    /// State after the last query.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn history(&self) -> &[WorkflowSession] {
        &self.state.workflow_sessions
    }
}
