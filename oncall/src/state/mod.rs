//! State types: the ReAct tool agent's state and the on-call workflow state.

mod investigation;
mod react_state;
mod workflow;

pub use investigation::{
    AssessmentOutput, ExecutedToolCall, Investigation, InvestigationStatus, Priority,
    ASSESSMENT_INCOMPLETE_NOTES,
};
pub use react_state::{ReActState, ToolCall, ToolExchange, ToolResult};
pub use workflow::{
    WorkflowSession, WorkflowState, DEFAULT_MAX_RETRIES, MAX_WORKFLOW_SESSIONS,
};
