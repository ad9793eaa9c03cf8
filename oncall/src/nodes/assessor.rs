//! Objective assessor: decides whether the investigations answer the query,
//! and owns the bounded retry counter.
//!
//! The loop always terminates. A verdict of "not achieved" (or an error while
//! assessing) consumes one retry; once `current_retries == max_retries` the
//! objective is forced to achieved and the workflow moves on to the report.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::{invoke_structured, LlmClient};
use crate::markdown::{add_session_context, MarkdownBuilder};
use crate::message::Message;
use crate::prompts::OBJECTIVE_ASSESSOR_PROMPT;
use crate::state::{AssessmentOutput, ExecutedToolCall, Investigation, WorkflowState};

use super::OBJECTIVE_ASSESSOR_NODE;

/// Sent to the executor when the model asks for a retry without saying why.
pub const DEFAULT_RETRY_FEEDBACK: &str = "The AI assessment didn't provide specific guidance for improvement. Please carefully review what was accomplished against the original request, then try a different approach, focusing on any gaps or areas that seem incomplete.";

pub const ASSESSMENT_ERROR_FEEDBACK: &str =
    "An unexpected error occurred during assessment. Please try a different approach.";

pub struct ObjectiveAssessorNode {
    llm: Arc<dyn LlmClient>,
}

impl ObjectiveAssessorNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn assess(&self, state: &WorkflowState) -> Result<AssessmentOutput, AgentError> {
        let context = build_assessment_context(state);
        debug!(context_len = context.len(), "assessment context prepared");
        let messages = [
            Message::system(OBJECTIVE_ASSESSOR_PROMPT),
            Message::user(context),
        ];
        invoke_structured(self.llm.as_ref(), &messages).await
    }
}

/// Applies one assessment outcome to the state.
///
/// Achieved: stored as is. Not achieved with budget left: counter + 1 and the
/// feedback (or [`DEFAULT_RETRY_FEEDBACK`]) goes to the executor. Budget spent:
/// forced achieved with the notes prefixed and no feedback. Errors follow the
/// same budget with their own wording.
fn apply_assessment(
    mut state: WorkflowState,
    outcome: Result<AssessmentOutput, AgentError>,
) -> WorkflowState {
    let max = state.max_retries;
    let budget_left = state.current_retries < max;
    let assessment = match outcome {
        Ok(assessment) if assessment.is_objective_achieved => {
            info!(retries = state.current_retries, "objective achieved");
            assessment
        }
        Ok(assessment) if budget_left => {
            state.current_retries += 1;
            warn!(retry = state.current_retries, max_retries = max, "objective not achieved, retrying");
            let feedback = assessment
                .feedback_for_retry
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RETRY_FEEDBACK.to_string());
            AssessmentOutput {
                feedback_for_retry: Some(feedback),
                ..assessment
            }
        }
        Ok(assessment) => {
            warn!(max_retries = max, "objective not achieved, retry budget exhausted");
            AssessmentOutput {
                is_objective_achieved: true,
                notes_for_final_report: format!(
                    "Objective not achieved after {} attempts. {}",
                    max, assessment.notes_for_final_report
                ),
                feedback_for_retry: None,
            }
        }
        Err(e) if budget_left => {
            state.current_retries += 1;
            error!(error = %e, retry = state.current_retries, "assessment failed, retrying");
            AssessmentOutput {
                is_objective_achieved: false,
                notes_for_final_report: format!(
                    "Assessment encountered an error: {}. Will attempt retry.",
                    e
                ),
                feedback_for_retry: Some(ASSESSMENT_ERROR_FEEDBACK.to_string()),
            }
        }
        Err(e) => {
            error!(error = %e, "assessment failed, retry budget exhausted");
            AssessmentOutput {
                is_objective_achieved: true,
                notes_for_final_report: format!(
                    "Assessment error after maximum attempts: {}. Process concluded.",
                    e
                ),
                feedback_for_retry: None,
            }
        }
    };
    state.assessment = Some(assessment);
    state
}

/// Everything the assessor model sees: query, retry state, every investigation
/// with its tool calls and report, and session history.
pub fn build_assessment_context(state: &WorkflowState) -> String {
    let mut builder = MarkdownBuilder::new();
    builder
        .add_header("Network Investigation Assessment Context")
        .add_section("User Query")
        .add_text(&state.user_query);

    if state.current_retries > 0 {
        builder
            .add_section("Retry Information")
            .add_bullet(&format!(
                "Current attempt: {} of {}",
                state.current_retries, state.max_retries
            ))
            .add_bullet(&format!(
                "Previous feedback: {}",
                state
                    .retry_feedback()
                    .unwrap_or("No specific feedback provided")
            ))
            .add_empty_line();
    }

    builder.add_section("Device Investigations");
    if state.investigations.is_empty() {
        builder.add_text("No device investigations found.");
    }
    for (i, inv) in state.investigations.iter().enumerate() {
        add_investigation(&mut builder, inv, i + 1);
    }

    add_session_context(&mut builder, state, "Workflow Session Context");
    builder.build()
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn add_investigation(builder: &mut MarkdownBuilder, inv: &Investigation, index: usize) {
    builder
        .add_subsection(&format!("Investigation {}: {}", index, inv.device_name))
        .add_bold_text("Status:", Some(inv.status.as_str()))
        .add_bold_text(
            "Device Profile:",
            Some(or_default(&inv.device_profile, "Not available")),
        )
        .add_bold_text("Role:", Some(or_default(&inv.role, "Not specified")))
        .add_bold_text(
            "Objective:",
            Some(inv.objective.as_deref().unwrap_or("Not specified")),
        )
        .add_bold_text("Working Plan Steps:", None)
        .add_code_block(or_default(&inv.working_plan_steps, "No plan steps defined"));

    add_execution_results(builder, &inv.execution_results);

    if let Some(report) = inv.report.as_deref() {
        builder
            .add_bold_text("Investigation Report:", None)
            .add_code_block(report);
    }
    if let Some(details) = inv.error_details.as_deref() {
        builder.add_bold_text("Error Details:", Some(details));
    }
    builder.add_separator();
}

fn add_execution_results(builder: &mut MarkdownBuilder, results: &[ExecutedToolCall]) {
    if results.is_empty() {
        builder.add_bold_text("Execution Results:", Some("No execution results available"));
        return;
    }
    builder.add_bold_text(
        "Execution Results:",
        Some(&format!("{} tool calls executed", results.len())),
    );
    for (j, call) in results.iter().enumerate() {
        builder
            .add_bold_text(&format!("Tool Call {}:", j + 1), Some(&call.function))
            .add_bullet(&format!("Parameters: {}", Value::Object(call.params.clone())))
            .add_bullet(&format!("Error: {}", call.error.as_deref().unwrap_or("None")));
        match &call.result {
            Some(result) => {
                builder
                    .add_empty_line()
                    .add_bold_text("Result:", None)
                    .add_code_block(
                        &serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()),
                    );
            }
            None => {
                builder.add_bullet("Result: Not available").add_empty_line();
            }
        }
    }
}

#[async_trait]
impl Node<WorkflowState> for ObjectiveAssessorNode {
    fn id(&self) -> &str {
        OBJECTIVE_ASSESSOR_NODE
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        let outcome = self.assess(&state).await;
        let state = apply_assessment(state, outcome);
        Ok((state, Next::Continue))
    }
}
