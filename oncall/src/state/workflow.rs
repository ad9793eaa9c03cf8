//! Workflow state carried through the on-call graph, and session history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::investigation::{AssessmentOutput, Investigation, InvestigationStatus};

/// Sessions kept in history; older ones are dropped first.
pub const MAX_WORKFLOW_SESSIONS: usize = 20;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// What one completed query leaves behind for the next ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSession {
    /// First 8 characters of a v4 UUID.
    pub session_id: String,
    #[serde(default)]
    pub previous_report: String,
    #[serde(default)]
    pub learned_patterns: String,
    #[serde(default)]
    pub device_relationships: String,
    pub created_at: DateTime<Utc>,
}

impl WorkflowSession {
    pub fn new(
        previous_report: impl Into<String>,
        learned_patterns: impl Into<String>,
        device_relationships: impl Into<String>,
    ) -> Self {
        let mut session_id = uuid::Uuid::new_v4().to_string();
        session_id.truncate(8);
        Self {
            session_id,
            previous_report: previous_report.into(),
            learned_patterns: learned_patterns.into(),
            device_relationships: device_relationships.into(),
            created_at: Utc::now(),
        }
    }
}

/// State of one on-call graph run.
///
/// Nodes take it by value and return the updated copy. Only `workflow_sessions`
/// survives [`WorkflowState::reset_for_next_query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub user_query: String,
    #[serde(default)]
    pub investigations: Vec<Investigation>,
    pub max_retries: u32,
    /// Never exceeds `max_retries`.
    #[serde(default)]
    pub current_retries: u32,
    #[serde(default)]
    pub assessment: Option<AssessmentOutput>,
    #[serde(default)]
    pub final_report: Option<String>,
    #[serde(default)]
    pub workflow_sessions: Vec<WorkflowSession>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new("")
    }
}

impl WorkflowState {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            investigations: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            current_retries: 0,
            assessment: None,
            final_report: None,
            workflow_sessions: Vec::new(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn get_investigation_by_device(&self, device_name: &str) -> Option<&Investigation> {
        self.investigations
            .iter()
            .find(|inv| inv.device_name == device_name)
    }

    pub fn pending_investigations(&self) -> Vec<&Investigation> {
        self.investigations
            .iter()
            .filter(|inv| inv.status == InvestigationStatus::Pending)
            .collect()
    }

    /// Indices of pending investigations whose dependencies have all completed.
    pub fn ready_investigations(&self) -> Vec<usize> {
        let completed: Vec<&str> = self
            .investigations
            .iter()
            .filter(|inv| inv.status == InvestigationStatus::Completed)
            .map(|inv| inv.device_name.as_str())
            .collect();
        self.investigations
            .iter()
            .enumerate()
            .filter(|(_, inv)| {
                inv.status == InvestigationStatus::Pending
                    && inv
                        .dependencies
                        .iter()
                        .all(|dep| completed.contains(&dep.as_str()))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// True when every investigation is completed, failed or skipped (and for none).
    pub fn all_investigations_complete(&self) -> bool {
        self.investigations.iter().all(|inv| inv.status.is_terminal())
    }

    /// False until an assessment exists.
    pub fn objective_achieved(&self) -> bool {
        self.assessment
            .as_ref()
            .is_some_and(|a| a.is_objective_achieved)
    }

    /// Feedback from the last assessment, if it asked for a retry.
    pub fn retry_feedback(&self) -> Option<&str> {
        self.assessment
            .as_ref()
            .and_then(|a| a.feedback_for_retry.as_deref())
    }

    /// Appends a session, keeping the newest [`MAX_WORKFLOW_SESSIONS`].
    pub fn record_session(&mut self, session: WorkflowSession) {
        self.workflow_sessions.push(session);
        let len = self.workflow_sessions.len();
        if len > MAX_WORKFLOW_SESSIONS {
            self.workflow_sessions.drain(..len - MAX_WORKFLOW_SESSIONS);
        }
    }

    /// Clears per-query fields; keeps session history and `max_retries`.
    pub fn reset_for_next_query(&mut self) {
        self.user_query.clear();
        self.investigations.clear();
        self.current_retries = 0;
        self.assessment = None;
        self.final_report = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(name: &str, status: InvestigationStatus, deps: &[&str]) -> Investigation {
        Investigation {
            status,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..Investigation::new(name, "unknown", "")
        }
    }

    /// **Scenario**: Only pending investigations with completed dependencies are ready.
    #[test]
    fn ready_investigations_respects_dependencies() {
        let mut state = WorkflowState::new("q");
        state.investigations = vec![
            inv("R1", InvestigationStatus::Completed, &[]),
            inv("R2", InvestigationStatus::Pending, &["R1"]),
            inv("R3", InvestigationStatus::Pending, &["R4"]),
            inv("R4", InvestigationStatus::Failed, &[]),
            inv("R5", InvestigationStatus::Pending, &[]),
        ];
        assert_eq!(state.ready_investigations(), vec![1, 4]);
        assert_eq!(state.pending_investigations().len(), 3);
        assert!(!state.all_investigations_complete());
        assert_eq!(
            state.get_investigation_by_device("R4").map(|i| i.status),
            Some(InvestigationStatus::Failed)
        );
    }

    #[test]
    fn objective_achieved_false_without_assessment() {
        let mut state = WorkflowState::new("q");
        assert!(!state.objective_achieved());
        state.assessment = Some(AssessmentOutput {
            is_objective_achieved: true,
            notes_for_final_report: "ok".into(),
            feedback_for_retry: None,
        });
        assert!(state.objective_achieved());
    }

    /// **Scenario**: Session history keeps only the newest 20 entries.
    #[test]
    fn record_session_caps_history() {
        let mut state = WorkflowState::new("q");
        for i in 0..25 {
            state.record_session(WorkflowSession::new(format!("report {}", i), "", ""));
        }
        assert_eq!(state.workflow_sessions.len(), MAX_WORKFLOW_SESSIONS);
        assert_eq!(state.workflow_sessions[0].previous_report, "report 5");
        assert_eq!(state.workflow_sessions[0].session_id.len(), 8);
    }

    #[test]
    fn reset_for_next_query_keeps_sessions() {
        let mut state = WorkflowState::new("q").with_max_retries(1);
        state.investigations.push(Investigation::new("R1", "x", ""));
        state.current_retries = 1;
        state.final_report = Some("done".into());
        state.record_session(WorkflowSession::new("done", "", ""));
        state.reset_for_next_query();
        assert!(state.user_query.is_empty());
        assert!(state.investigations.is_empty());
        assert_eq!(state.current_retries, 0);
        assert_eq!(state.max_retries, 1);
        assert!(state.final_report.is_none());
        assert_eq!(state.workflow_sessions.len(), 1);
    }
}
