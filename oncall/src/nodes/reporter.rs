//! Report generator: final report, learning insights and session history.
//!
//! The report is always produced, possibly as an error text. Afterwards the
//! per-query fields are cleared; the report and the new history entry remain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::{invoke_structured, LlmClient};
use crate::markdown::{add_session_context, text_preview, MarkdownBuilder};
use crate::message::Message;
use crate::prompts::{LEARNING_INSIGHTS_PROMPT, REPORT_GENERATOR_PROMPT};
use crate::schemas::LearningInsights;
use crate::state::{Investigation, InvestigationStatus, WorkflowSession, WorkflowState};

use super::REPORT_GENERATOR_NODE;

/// Report characters per investigation in the insights context.
const INSIGHTS_REPORT_PREVIEW_CHARS: usize = 500;

pub struct ReportGeneratorNode {
    llm: Arc<dyn LlmClient>,
}

impl ReportGeneratorNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn generate_report(&self, state: &WorkflowState) -> Result<String, AgentError> {
        let messages = [
            Message::system(REPORT_GENERATOR_PROMPT),
            Message::user(build_report_context(state)),
        ];
        let response = self.llm.invoke(&messages).await?;
        Ok(response.content)
    }

    /// Empty insights when the model fails or replies with something unusable.
    async fn learning_insights(&self, state: &WorkflowState) -> LearningInsights {
        let messages = [
            Message::system(LEARNING_INSIGHTS_PROMPT),
            Message::user(build_learning_insights_context(state)),
        ];
        match invoke_structured::<LearningInsights>(self.llm.as_ref(), &messages).await {
            Ok(insights) => {
                info!(
                    patterns_len = insights.learned_patterns.len(),
                    relationships_len = insights.device_relationships.len(),
                    "learning insights extracted"
                );
                insights
            }
            Err(e) => {
                warn!(error = %e, "learning insights unavailable");
                LearningInsights::default()
            }
        }
    }
}

fn status_icon(status: InvestigationStatus) -> &'static str {
    match status {
        InvestigationStatus::Completed => "✅",
        InvestigationStatus::Failed => "❌",
        InvestigationStatus::InProgress => "🔄",
        InvestigationStatus::Pending => "⏳",
        InvestigationStatus::Skipped => "⏭️",
    }
}

fn completed_count(state: &WorkflowState) -> usize {
    state
        .investigations
        .iter()
        .filter(|inv| inv.status == InvestigationStatus::Completed)
        .count()
}

/// Overview, per-device results, assessment and history for the report model.
pub fn build_report_context(state: &WorkflowState) -> String {
    let total = state.investigations.len();
    let completed = completed_count(state);
    let success_rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let mut builder = MarkdownBuilder::new();
    builder
        .add_header("Network Investigation Report Context")
        .add_section("Original User Query")
        .add_text(&state.user_query)
        .add_section("Investigation Overview")
        .add_bullet(&format!("Total devices investigated: {}", total))
        .add_bullet(&format!("Successfully completed: {}", completed))
        .add_bullet(&format!("Success rate: {:.1}%", success_rate))
        .add_bullet(&format!(
            "Retry attempts: {}/{}",
            state.current_retries, state.max_retries
        ))
        .add_empty_line()
        .add_section("Device Investigation Results");

    if state.investigations.is_empty() {
        builder.add_text("No device investigations found.");
    }
    for (i, inv) in state.investigations.iter().enumerate() {
        add_investigation_result(&mut builder, inv, i + 1);
    }

    builder.add_section("Assessment Results");
    match &state.assessment {
        Some(assessment) => {
            builder
                .add_bullet(&format!(
                    "Objective achieved: {}",
                    assessment.is_objective_achieved
                ))
                .add_empty_line()
                .add_bold_text("Assessment Notes:", Some(&assessment.notes_for_final_report));
            if let Some(feedback) = assessment.feedback_for_retry.as_deref() {
                builder.add_bold_text("Feedback for retry:", Some(feedback));
            }
        }
        None => {
            builder.add_text("No assessment results available.");
        }
    }

    add_session_context(&mut builder, state, "Historical Context");
    builder.build()
}

fn add_device_bullets(builder: &mut MarkdownBuilder, inv: &Investigation) {
    builder
        .add_bullet(&format!("Device Profile: {}", inv.device_profile))
        .add_bullet(&format!("Role: {}", inv.role))
        .add_bullet(&format!("Priority: {}", inv.priority.as_str()));
    if let Some(objective) = inv.objective.as_deref() {
        builder.add_bullet(&format!("Objective: {}", objective));
    }
    if !inv.dependencies.is_empty() {
        builder.add_bullet(&format!("Dependencies: {}", inv.dependencies.join(", ")));
    }
    builder
        .add_bullet(&format!("Execution steps: {}", inv.execution_results.len()))
        .add_empty_line();
    if let Some(details) = inv.error_details.as_deref() {
        builder.add_bold_text("Error Details:", Some(details));
    }
}

fn add_investigation_result(builder: &mut MarkdownBuilder, inv: &Investigation, index: usize) {
    builder
        .add_subsection(&format!("Investigation {}: {}", index, inv.device_name))
        .add_bullet(&format!("Status: {} {}", status_icon(inv.status), inv.status));
    add_device_bullets(builder, inv);
    if let Some(report) = inv.report.as_deref() {
        builder
            .add_bold_text("Investigation Report:", None)
            .add_text(report);
    }
    if !inv.working_plan_steps.is_empty() {
        builder
            .add_bold_text("Working Plan:", None)
            .add_text(&inv.working_plan_steps);
    }
}

/// Investigation data for the insights model; reports are cut to 500 characters.
pub fn build_learning_insights_context(state: &WorkflowState) -> String {
    let mut builder = MarkdownBuilder::new();
    builder
        .add_header("Investigation Data for Learning Insights Extraction")
        .add_section("Original User Query")
        .add_text(&state.user_query)
        .add_section("Investigation Results Summary")
        .add_bullet(&format!("Total investigations: {}", state.investigations.len()))
        .add_bullet(&format!("Completed investigations: {}", completed_count(state)))
        .add_empty_line()
        .add_section("Detailed Investigation Data");

    for (i, inv) in state.investigations.iter().enumerate() {
        builder
            .add_subsection(&format!("Investigation {}: {}", i + 1, inv.device_name))
            .add_bullet(&format!("Status: {}", inv.status));
        add_device_bullets(&mut builder, inv);
        if let Some(report) = inv.report.as_deref() {
            builder
                .add_bold_text("Investigation Report:", None)
                .add_text(&text_preview(report, INSIGHTS_REPORT_PREVIEW_CHARS));
        }
    }

    if let Some(assessment) = &state.assessment {
        builder
            .add_section("Assessment Results")
            .add_bullet(&format!(
                "Objective Achieved: {}",
                assessment.is_objective_achieved
            ))
            .add_empty_line();
        if !assessment.notes_for_final_report.is_empty() {
            builder.add_bold_text("Assessment Notes:", Some(&assessment.notes_for_final_report));
        }
    }
    builder.build()
}

#[async_trait]
impl Node<WorkflowState> for ReportGeneratorNode {
    fn id(&self) -> &str {
        REPORT_GENERATOR_NODE
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        info!(investigations = state.investigations.len(), "generating report");
        let report = match self.generate_report(&state).await {
            Ok(report) => {
                info!(report_len = report.len(), "report generated");
                report
            }
            Err(e) => {
                error!(error = %e, "report generation failed");
                format!("Error generating investigation report. Details: {}", e)
            }
        };

        let insights = self.learning_insights(&state).await;
        let session =
            WorkflowSession::new(report.clone(), insights.learned_patterns, insights.device_relationships);
        debug!(session_id = %session.session_id, "recording workflow session");

        let mut next = WorkflowState {
            user_query: state.user_query,
            max_retries: state.max_retries,
            final_report: Some(report),
            workflow_sessions: state.workflow_sessions,
            ..WorkflowState::default()
        };
        next.record_session(session);
        Ok((next, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlm, MockReply};
    use crate::state::{AssessmentOutput, MAX_WORKFLOW_SESSIONS};

    fn finished_state() -> WorkflowState {
        let mut state = WorkflowState::new("check R1 and R2");
        let mut r1 = Investigation::new("R1", "cisco_xr", "PE");
        r1.status = InvestigationStatus::Completed;
        r1.report = Some("x".repeat(600));
        let mut r2 = Investigation::new("R2", "cisco_xr", "P");
        r2.status = InvestigationStatus::Failed;
        r2.error_details = Some("ssh timeout".into());
        state.investigations = vec![r1, r2];
        state.current_retries = 1;
        state.assessment = Some(AssessmentOutput {
            is_objective_achieved: true,
            notes_for_final_report: "R2 unreachable".into(),
            feedback_for_retry: None,
        });
        state
    }

    /// **Scenario**: The report and insights land in a new session; per-query fields reset.
    #[tokio::test]
    async fn records_session_and_resets() {
        let llm = Arc::new(
            MockLlm::with_no_tool_calls("## 🎯 Summary\nR1 healthy, R2 unreachable").on(
                "Learning Insights Extraction",
                MockReply::text(
                    r#"{"learned_patterns": {"pe_health": "PEs answer quickly"}, "device_relationships": "R1 uplinks to R2"}"#,
                ),
            ),
        );
        let node = ReportGeneratorNode::new(llm);
        let (out, next) = node.run(finished_state().with_max_retries(5)).await.unwrap();
        assert_eq!(next, Next::Continue);
        assert_eq!(
            out.final_report.as_deref(),
            Some("## 🎯 Summary\nR1 healthy, R2 unreachable")
        );
        assert!(out.investigations.is_empty());
        assert_eq!(out.current_retries, 0);
        assert!(out.assessment.is_none());
        assert_eq!(out.max_retries, 5);
        assert_eq!(out.workflow_sessions.len(), 1);
        let session = &out.workflow_sessions[0];
        assert_eq!(session.previous_report, "## 🎯 Summary\nR1 healthy, R2 unreachable");
        assert_eq!(session.learned_patterns, "## Learned Patterns\n\n### Pe Health\nPEs answer quickly");
        assert_eq!(session.device_relationships, "R1 uplinks to R2");
    }

    /// **Scenario**: A failing model still yields an error report and an empty-insight session.
    #[tokio::test]
    async fn failure_produces_error_report() {
        let node = ReportGeneratorNode::new(Arc::new(MockLlm::failing("quota exceeded")));
        let (out, _) = node.run(finished_state()).await.unwrap();
        let report = out.final_report.unwrap();
        assert!(report.starts_with("Error generating investigation report. Details: "));
        assert!(report.contains("quota exceeded"));
        let session = &out.workflow_sessions[0];
        assert_eq!(session.previous_report, report);
        assert!(session.learned_patterns.is_empty());
        assert!(session.device_relationships.is_empty());
    }

    #[tokio::test]
    async fn history_stays_capped() {
        let mut state = finished_state();
        for i in 0..MAX_WORKFLOW_SESSIONS {
            state.record_session(WorkflowSession::new(format!("old {}", i), "", ""));
        }
        let node = ReportGeneratorNode::new(Arc::new(MockLlm::with_no_tool_calls("new report")));
        let (out, _) = node.run(state).await.unwrap();
        assert_eq!(out.workflow_sessions.len(), MAX_WORKFLOW_SESSIONS);
        assert_eq!(out.workflow_sessions[0].previous_report, "old 1");
        assert_eq!(
            out.workflow_sessions.last().map(|s| s.previous_report.as_str()),
            Some("new report")
        );
    }

    #[test]
    fn report_context_overview_and_icons() {
        let context = build_report_context(&finished_state());
        assert!(context.starts_with("# Network Investigation Report Context"));
        assert!(context.contains("- Total devices investigated: 2"));
        assert!(context.contains("- Successfully completed: 1"));
        assert!(context.contains("- Success rate: 50.0%"));
        assert!(context.contains("- Retry attempts: 1/3"));
        assert!(context.contains("- Status: ✅ completed"));
        assert!(context.contains("- Status: ❌ failed"));
        assert!(context.contains("**Error Details:** ssh timeout"));
        assert!(context.contains("- Objective achieved: true"));
        assert!(context.contains("**Assessment Notes:** R2 unreachable"));
        assert!(context.contains("## Historical Context"));
    }

    #[test]
    fn insights_context_truncates_reports() {
        let context = build_learning_insights_context(&finished_state());
        assert!(context.contains(&format!("{}...", "x".repeat(500))));
        assert!(!context.contains(&"x".repeat(501)));
        assert!(context.contains("- Completed investigations: 1"));
        assert!(context.contains("- Objective Achieved: true"));
    }
}
