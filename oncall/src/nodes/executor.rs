//! Network executor: runs every ready investigation concurrently through the
//! MCP tool agent.
//!
//! Investigations run in waves: each wave spawns every pending investigation
//! whose dependencies have completed, and waits for all of them. A task that
//! errors or panics fails only its own investigation. Whatever is still pending
//! after the last wave has a dependency that did not complete and is skipped.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::graph::{CompiledStateGraph, Next, Node};
use crate::llm::LlmClient;
use crate::markdown::{add_session_context, MarkdownBuilder};
use crate::prompts::NETWORK_EXECUTOR_PROMPT;
use crate::react::{build_react_graph, extract_response_content};
use crate::state::{Investigation, InvestigationStatus, ReActState, WorkflowState};
use crate::tool_source::ToolSource;

use super::NETWORK_EXECUTOR_NODE;

pub struct NetworkExecutorNode {
    agent_llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
}

impl NetworkExecutorNode {
    pub fn new(agent_llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolSource>) -> Self {
        Self { agent_llm, tools }
    }

    /// Runs waves until nothing is ready; returns how many investigations ran.
    async fn execute(&self, state: &mut WorkflowState) -> Result<usize, AgentError> {
        let agent = Arc::new(build_react_graph(
            self.agent_llm.clone(),
            self.tools.clone(),
        )?);
        let mut executed = 0;
        loop {
            let ready = state.ready_investigations();
            if ready.is_empty() {
                break;
            }
            info!(count = ready.len(), "starting investigations");

            let jobs: Vec<(Investigation, String)> = ready
                .iter()
                .map(|&idx| {
                    let inv = &state.investigations[idx];
                    (inv.clone(), build_investigation_context(inv, state))
                })
                .collect();
            for &idx in &ready {
                state.investigations[idx].status = InvestigationStatus::InProgress;
            }

            let handles = jobs.into_iter().map(|(inv, context)| {
                let agent = agent.clone();
                tokio::spawn(async move { execute_single_investigation(&agent, inv, &context).await })
            });
            let results = join_all(handles).await;

            for (idx, result) in ready.into_iter().zip(results) {
                let current = &mut state.investigations[idx];
                match result {
                    Ok(updated) => *current = updated,
                    Err(e) => {
                        let text = join_error_text(e);
                        error!(device = %current.device_name, error = %text, "investigation task failed");
                        current.status = InvestigationStatus::Failed;
                        current.error_details = Some(text);
                    }
                }
                executed += 1;
            }
        }
        Ok(executed)
    }
}

/// One device through the tool agent. Agent errors fail the investigation.
async fn execute_single_investigation(
    agent: &CompiledStateGraph<ReActState>,
    investigation: Investigation,
    context: &str,
) -> Investigation {
    debug!(device = %investigation.device_name, "executing investigation");
    let outcome = agent
        .invoke(ReActState::new(NETWORK_EXECUTOR_PROMPT, context))
        .await
        .and_then(|agent_state| {
            debug!(
                device = %investigation.device_name,
                turns = agent_state.turn_count,
                total_tokens = agent_state.total_usage.as_ref().map(|u| u.total_tokens),
                "tool agent finished"
            );
            extract_response_content(&agent_state)
        });
    match outcome {
        Ok((analysis, calls)) => {
            info!(
                device = %investigation.device_name,
                tool_calls = calls.len(),
                "investigation completed"
            );
            let mut execution_results = investigation.execution_results;
            execution_results.extend(calls);
            Investigation {
                status: InvestigationStatus::Completed,
                execution_results,
                report: Some(analysis),
                error_details: None,
                ..investigation
            }
        }
        Err(e) => {
            error!(device = %investigation.device_name, error = %e, "investigation failed");
            Investigation {
                status: InvestigationStatus::Failed,
                error_details: Some(e.to_string()),
                ..investigation
            }
        }
    }
}

fn join_error_text(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("investigation task panicked: {}", message)
}

/// Puts finished investigations back in the queue so a retry acts on the
/// assessor's feedback. Skipped ones go back too: their dependency may
/// succeed this time. Tool-call history is kept and keeps growing.
fn requeue_for_retry(state: &mut WorkflowState) {
    let mut requeued = 0;
    for inv in &mut state.investigations {
        if matches!(
            inv.status,
            InvestigationStatus::Completed
                | InvestigationStatus::Failed
                | InvestigationStatus::Skipped
        ) {
            inv.status = InvestigationStatus::Pending;
            inv.error_details = None;
            requeued += 1;
        }
    }
    warn!(
        retry = state.current_retries,
        max_retries = state.max_retries,
        requeued,
        "retry execution"
    );
}

/// Pending investigations left after the last wave cannot run this attempt.
fn skip_blocked(state: &mut WorkflowState) {
    let completed: Vec<String> = state
        .investigations
        .iter()
        .filter(|inv| inv.status == InvestigationStatus::Completed)
        .map(|inv| inv.device_name.clone())
        .collect();
    for inv in &mut state.investigations {
        if inv.status != InvestigationStatus::Pending {
            continue;
        }
        let missing: Vec<&str> = inv
            .dependencies
            .iter()
            .filter(|dep| !completed.contains(dep))
            .map(String::as_str)
            .collect();
        warn!(device = %inv.device_name, ?missing, "skipping investigation with unmet dependencies");
        inv.status = InvestigationStatus::Skipped;
        inv.error_details = Some(format!(
            "Skipped: dependencies not completed: {}",
            missing.join(", ")
        ));
    }
}

fn mark_pending_failed(state: &mut WorkflowState, e: &AgentError) {
    for inv in &mut state.investigations {
        if matches!(
            inv.status,
            InvestigationStatus::Pending | InvestigationStatus::InProgress
        ) {
            inv.status = InvestigationStatus::Failed;
            inv.error_details = Some(format!("Global execution error: {}", e));
        }
    }
}

/// Context handed to the tool agent for one device: the investigation, session
/// history and, on retries, the assessor's feedback.
pub fn build_investigation_context(investigation: &Investigation, state: &WorkflowState) -> String {
    let mut builder = MarkdownBuilder::new();
    builder
        .add_header("Investigation Context")
        .add_bold_text("User Query:", Some(&state.user_query))
        .add_bold_text("Device Name:", Some(&investigation.device_name))
        .add_bold_text("Role:", Some(&investigation.role))
        .add_bold_text(
            "Objective:",
            Some(investigation.objective.as_deref().unwrap_or("Not specified")),
        )
        .add_section("Device Profile")
        .add_code_block(&investigation.device_profile)
        .add_section("Working Plan Steps");
    if investigation.working_plan_steps.is_empty() {
        builder.add_text("No plan steps defined");
    } else {
        builder.add_text(&investigation.working_plan_steps);
    }
    if let Some(previous) = investigation.report.as_deref() {
        builder
            .add_section("Previous Attempt Report")
            .add_text(previous);
    }

    add_session_context(&mut builder, state, "Previous Investigation Context");

    if state.current_retries > 0 {
        builder
            .add_separator()
            .add_section("Retry Context")
            .add_bold_text(
                "Retry Number:",
                Some(&format!("#{} of {}", state.current_retries, state.max_retries)),
            )
            .add_subsection("Previous Execution Feedback")
            .add_text(
                state
                    .retry_feedback()
                    .unwrap_or("No specific feedback provided from assessor"),
            );
    }
    builder.build()
}

#[async_trait]
impl Node<WorkflowState> for NetworkExecutorNode {
    fn id(&self) -> &str {
        NETWORK_EXECUTOR_NODE
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        let mut state = state;
        debug!(
            investigations = state.investigations.len(),
            ready = state.ready_investigations().len(),
            retries = state.current_retries,
            sessions = state.workflow_sessions.len(),
            "executor received state"
        );
        if state.current_retries > 0 {
            requeue_for_retry(&mut state);
        }
        match self.execute(&mut state).await {
            Ok(0) => info!("no investigations ready for execution"),
            Ok(n) => info!(executed = n, "execution finished"),
            Err(e) => {
                error!(error = %e, "executor failed");
                mark_pending_failed(&mut state, &e);
            }
        }
        skip_blocked(&mut state);
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlm, MockReply};
    use crate::react::TOOL_AGENT_RETRIES;
    use crate::state::AssessmentOutput;
    use crate::tool_source::MockToolSource;
    use serde_json::json;

    fn planned(name: &str, deps: &[&str]) -> Investigation {
        Investigation {
            objective: Some(format!("check {}", name)),
            working_plan_steps: "1. show interfaces".into(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..Investigation::new(name, "cisco_xr", "PE")
        }
    }

    fn state_with(invs: Vec<Investigation>) -> WorkflowState {
        let mut state = WorkflowState::new("are interfaces up?");
        state.investigations = invs;
        state
    }

    /// **Scenario**: Each device gets its own report and tool calls.
    #[tokio::test]
    async fn executes_all_ready_investigations() {
        let agent = Arc::new(
            MockLlm::with_no_tool_calls("unexpected")
                .on(
                    "**Device Name:** R1",
                    MockReply::tool_then_answer("show_interfaces", json!({"device": "R1"}), "R1 all up"),
                )
                .on("**Device Name:** R2", MockReply::text("R2 all up")),
        );
        let tools = Arc::new(MockToolSource::new().with_tool("show_interfaces", r#"{"up": 4}"#));
        let node = NetworkExecutorNode::new(agent, tools.clone());

        let (out, next) = node
            .run(state_with(vec![planned("R1", &[]), planned("R2", &[])]))
            .await
            .unwrap();
        assert_eq!(next, Next::Continue);
        let r1 = out.get_investigation_by_device("R1").unwrap();
        assert_eq!(r1.status, InvestigationStatus::Completed);
        assert_eq!(r1.report.as_deref(), Some("R1 all up"));
        assert_eq!(r1.execution_results.len(), 1);
        assert_eq!(r1.execution_results[0].result, Some(json!({"up": 4})));
        let r2 = out.get_investigation_by_device("R2").unwrap();
        assert_eq!(r2.report.as_deref(), Some("R2 all up"));
        assert!(r2.execution_results.is_empty());
        assert_eq!(tools.call_count(), 1);
    }

    /// **Scenario**: One task panicking and one erroring do not affect the sibling.
    #[tokio::test]
    async fn failing_tasks_are_isolated() {
        let agent = Arc::new(
            MockLlm::with_no_tool_calls("R3 is fine")
                .on("**Device Name:** R1", MockReply::Panic("driver crashed".into()))
                .on("**Device Name:** R2", MockReply::Error("timeout talking to model".into())),
        );
        let node = NetworkExecutorNode::new(agent, Arc::new(MockToolSource::new()));

        let (out, _) = node
            .run(state_with(vec![planned("R1", &[]), planned("R2", &[]), planned("R3", &[])]))
            .await
            .unwrap();
        let r1 = out.get_investigation_by_device("R1").unwrap();
        assert_eq!(r1.status, InvestigationStatus::Failed);
        assert!(r1.error_details.as_deref().unwrap().contains("driver crashed"));
        let r2 = out.get_investigation_by_device("R2").unwrap();
        assert_eq!(r2.status, InvestigationStatus::Failed);
        assert!(r2.error_details.as_deref().unwrap().contains("timeout talking to model"));
        let r3 = out.get_investigation_by_device("R3").unwrap();
        assert_eq!(r3.status, InvestigationStatus::Completed);
        assert_eq!(r3.report.as_deref(), Some("R3 is fine"));
    }

    /// **Scenario**: Dependents run after their dependency; a failed dependency skips them.
    #[tokio::test]
    async fn dependencies_run_in_waves_or_skip() {
        let agent = Arc::new(
            MockLlm::with_no_tool_calls("done")
                .on("**Device Name:** R1", MockReply::Error("unreachable".into())),
        );
        let node = NetworkExecutorNode::new(agent.clone(), Arc::new(MockToolSource::new()));
        let (out, _) = node
            .run(state_with(vec![
                planned("R1", &[]),
                planned("R2", &["R1"]),
                planned("R3", &[]),
                planned("R4", &["R3"]),
            ]))
            .await
            .unwrap();
        assert_eq!(out.investigations[0].status, InvestigationStatus::Failed);
        assert_eq!(out.investigations[1].status, InvestigationStatus::Skipped);
        assert_eq!(
            out.investigations[1].error_details.as_deref(),
            Some("Skipped: dependencies not completed: R1")
        );
        assert_eq!(out.investigations[2].status, InvestigationStatus::Completed);
        assert_eq!(out.investigations[3].status, InvestigationStatus::Completed);
        assert!(out.all_investigations_complete());
        assert_eq!(agent.call_count(), 3 + TOOL_AGENT_RETRIES);
    }

    /// **Scenario**: On a retry, finished investigations run again with the feedback and keep their history.
    #[tokio::test]
    async fn retry_requeues_with_feedback() {
        let agent = Arc::new(MockLlm::sequence(vec![MockReply::tool_then_answer(
            "show_bgp",
            json!({}),
            "bgp checked",
        )]));
        let node = NetworkExecutorNode::new(agent.clone(), Arc::new(MockToolSource::new().with_default_result("ok")));

        let (mut out, _) = node.run(state_with(vec![planned("R1", &[])])).await.unwrap();
        assert_eq!(out.investigations[0].execution_results.len(), 1);

        out.current_retries = 1;
        out.assessment = Some(AssessmentOutput {
            is_objective_achieved: false,
            notes_for_final_report: "incomplete".into(),
            feedback_for_retry: Some("also check BGP neighbors".into()),
        });
        let (out, _) = node.run(out).await.unwrap();
        assert_eq!(out.investigations[0].status, InvestigationStatus::Completed);
        assert_eq!(out.investigations[0].execution_results.len(), 2);

        let retry_request = agent.recorded_calls().into_iter().rev().find(|m| {
            m.iter().any(|msg| msg.content().contains("## Retry Context"))
        });
        let retry_request = retry_request.expect("retry context sent");
        let context = retry_request[1].content();
        assert!(context.contains("**Retry Number:** #1 of 3"));
        assert!(context.contains("also check BGP neighbors"));
        assert!(context.contains("## Previous Attempt Report"));
    }

    /// **Scenario**: A dependency that failed and skipped its dependent recovers on retry; both then complete.
    #[tokio::test]
    async fn retry_reruns_skipped_dependents() {
        let down = NetworkExecutorNode::new(
            Arc::new(
                MockLlm::with_no_tool_calls("R2 ok")
                    .on("**Device Name:** R1", MockReply::Error("unreachable".into())),
            ),
            Arc::new(MockToolSource::new()),
        );
        let (mut out, _) = down
            .run(state_with(vec![planned("R1", &[]), planned("R2", &["R1"])]))
            .await
            .unwrap();
        assert_eq!(out.investigations[0].status, InvestigationStatus::Failed);
        assert_eq!(out.investigations[1].status, InvestigationStatus::Skipped);

        out.current_retries = 1;
        out.assessment = Some(AssessmentOutput {
            is_objective_achieved: false,
            notes_for_final_report: "R1 unreachable".into(),
            feedback_for_retry: Some("try R1 again".into()),
        });
        let recovered = Arc::new(
            MockLlm::with_no_tool_calls("R2 ok").on("**Device Name:** R1", MockReply::text("R1 ok now")),
        );
        let up = NetworkExecutorNode::new(recovered.clone(), Arc::new(MockToolSource::new()));
        let (out, _) = up.run(out).await.unwrap();

        let r1 = out.get_investigation_by_device("R1").unwrap();
        assert_eq!(r1.status, InvestigationStatus::Completed);
        assert_eq!(r1.report.as_deref(), Some("R1 ok now"));
        assert!(r1.error_details.is_none());
        let r2 = out.get_investigation_by_device("R2").unwrap();
        assert_eq!(r2.status, InvestigationStatus::Completed);
        assert_eq!(r2.report.as_deref(), Some("R2 ok"));
        assert!(r2.error_details.is_none());
        assert!(out.all_investigations_complete());
        assert_eq!(recovered.call_count(), 2);
    }

    #[tokio::test]
    async fn nothing_ready_returns_state_unchanged() {
        let mut inv = planned("R1", &[]);
        inv.status = InvestigationStatus::Completed;
        let state = state_with(vec![inv]);
        let node = NetworkExecutorNode::new(
            Arc::new(MockLlm::failing("must not be called")),
            Arc::new(MockToolSource::new()),
        );
        let (out, _) = node.run(state.clone()).await.unwrap();
        assert_eq!(out, state);
    }

    #[test]
    fn context_without_retry_or_plan() {
        let inv = Investigation::new("R9", "juniper_mx", "P");
        let state = state_with(vec![inv.clone()]);
        let context = build_investigation_context(&inv, &state);
        assert!(context.starts_with("# Investigation Context"));
        assert!(context.contains("**Objective:** Not specified"));
        assert!(context.contains("No plan steps defined"));
        assert!(context.contains("## Previous Investigation Context"));
        assert!(!context.contains("Retry Context"));
    }

    #[test]
    fn retry_context_without_feedback() {
        let inv = planned("R1", &[]);
        let mut state = state_with(vec![inv.clone()]);
        state.current_retries = 2;
        let context = build_investigation_context(&inv, &state);
        assert!(context.contains("**Retry Number:** #2 of 3"));
        assert!(context.contains("No specific feedback provided from assessor"));
    }
}
