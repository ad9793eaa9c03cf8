//! Per-device investigation records and the assessor's verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one device investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl InvestigationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the executor is done with this investigation for the current attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for InvestigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One MCP tool invocation as recorded by the executor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutedToolCall {
    pub function: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One device's sub-task within a user query.
///
/// Created by the input validator, filled in by the planner (objective, steps)
/// and the executor (results, status, report).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Investigation {
    pub device_name: String,
    pub device_profile: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub working_plan_steps: String,
    #[serde(default)]
    pub execution_results: Vec<ExecutedToolCall>,
    #[serde(default)]
    pub status: InvestigationStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Device names that must complete before this one runs.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Final analysis text of the executor's tool agent.
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
}

impl Investigation {
    pub fn new(
        device_name: impl Into<String>,
        device_profile: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            device_profile: device_profile.into(),
            role: role.into(),
            ..Default::default()
        }
    }
}

pub const ASSESSMENT_INCOMPLETE_NOTES: &str =
    "Assessment incomplete. AI response could not be properly interpreted.";

fn default_assessment_notes() -> String {
    ASSESSMENT_INCOMPLETE_NOTES.to_string()
}

/// Assessor verdict; drives the conditional edge after assessment.
///
/// Missing fields in the model's JSON coerce to "not achieved" with a note saying
/// the response could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentOutput {
    #[serde(default)]
    pub is_objective_achieved: bool,
    #[serde(default = "default_assessment_notes")]
    pub notes_for_final_report: String,
    #[serde(default)]
    pub feedback_for_retry: Option<String>,
}

impl Default for AssessmentOutput {
    fn default() -> Self {
        Self {
            is_objective_achieved: false,
            notes_for_final_report: default_assessment_notes(),
            feedback_for_retry: None,
        }
    }
}
