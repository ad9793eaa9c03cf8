//! The five on-call workflow nodes.
//!
//! Each node owns the handles it needs (tool-bound model, plain model, tool
//! source) and implements `Node<WorkflowState>`. Failures inside a node are
//! folded into the state it returns; a node only returns `Err` for problems
//! with the runtime itself.
//!
//! | id | node |
//! |----|------|
//! | `input_validator_node` | [`InputValidatorNode`] |
//! | `planner_node` | [`PlannerNode`] |
//! | `network_executor` | [`NetworkExecutorNode`] |
//! | `objective_assessor` | [`ObjectiveAssessorNode`] |
//! | `report_generator` | [`ReportGeneratorNode`] |

mod assessor;
mod executor;
mod input_validator;
mod planner;
mod reporter;

pub use assessor::{
    build_assessment_context, ObjectiveAssessorNode, ASSESSMENT_ERROR_FEEDBACK,
    DEFAULT_RETRY_FEEDBACK,
};
pub use executor::{build_investigation_context, NetworkExecutorNode};
pub use input_validator::{build_investigation_planning_context, InputValidatorNode};
pub use planner::{investigations_summary, PlannerNode};
pub use reporter::{build_learning_insights_context, build_report_context, ReportGeneratorNode};

pub const INPUT_VALIDATOR_NODE: &str = "input_validator_node";
pub const PLANNER_NODE: &str = "planner_node";
pub const NETWORK_EXECUTOR_NODE: &str = "network_executor";
pub const OBJECTIVE_ASSESSOR_NODE: &str = "objective_assessor";
pub const REPORT_GENERATOR_NODE: &str = "report_generator";
