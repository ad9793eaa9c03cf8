//! Wires the five nodes into the on-call state graph.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AgentError;
use crate::graph::{CompiledStateGraph, LoggingNodeMiddleware, StateGraph, END, START};
use crate::nodes::{
    InputValidatorNode, NetworkExecutorNode, ObjectiveAssessorNode, PlannerNode,
    ReportGeneratorNode, INPUT_VALIDATOR_NODE, NETWORK_EXECUTOR_NODE, OBJECTIVE_ASSESSOR_NODE,
    PLANNER_NODE, REPORT_GENERATOR_NODE,
};
use crate::state::WorkflowState;

use super::OncallRuntime;

/// Routing after assessment: report when achieved, otherwise execute again.
pub fn decide_next_step(state: &WorkflowState) -> String {
    if state.objective_achieved() {
        REPORT_GENERATOR_NODE.to_string()
    } else {
        NETWORK_EXECUTOR_NODE.to_string()
    }
}

/// Steps in the longest run: validator and planner, one executor/assessor pair
/// per attempt, then the report.
pub fn workflow_recursion_limit(max_retries: u32) -> usize {
    2 + 2 * (max_retries as usize + 1) + 1
}

/// Builds and compiles the workflow graph over the runtime's handles.
pub fn build_oncall_graph(
    runtime: &OncallRuntime,
) -> Result<CompiledStateGraph<WorkflowState>, AgentError> {
    let mut graph = StateGraph::<WorkflowState>::new()
        .with_middleware(Arc::new(LoggingNodeMiddleware::<WorkflowState>::default()))
        .with_recursion_limit(workflow_recursion_limit(runtime.settings.max_retries));

    graph
        .add_node(
            INPUT_VALIDATOR_NODE,
            Arc::new(InputValidatorNode::new(
                runtime.agent_llm.clone(),
                runtime.llm.clone(),
                runtime.tools.clone(),
            )),
        )
        .add_node(
            PLANNER_NODE,
            Arc::new(PlannerNode::new(
                runtime.llm.clone(),
                runtime.settings.plans_dir.clone(),
            )),
        )
        .add_node(
            NETWORK_EXECUTOR_NODE,
            Arc::new(NetworkExecutorNode::new(
                runtime.agent_llm.clone(),
                runtime.tools.clone(),
            )),
        )
        .add_node(
            OBJECTIVE_ASSESSOR_NODE,
            Arc::new(ObjectiveAssessorNode::new(runtime.llm.clone())),
        )
        .add_node(
            REPORT_GENERATOR_NODE,
            Arc::new(ReportGeneratorNode::new(runtime.llm.clone())),
        )
        .add_edge(START, INPUT_VALIDATOR_NODE)
        .add_edge(INPUT_VALIDATOR_NODE, PLANNER_NODE)
        .add_edge(PLANNER_NODE, NETWORK_EXECUTOR_NODE)
        .add_edge(NETWORK_EXECUTOR_NODE, OBJECTIVE_ASSESSOR_NODE)
        .add_edge(REPORT_GENERATOR_NODE, END);

    let path_map: HashMap<String, String> = [REPORT_GENERATOR_NODE, NETWORK_EXECUTOR_NODE]
        .into_iter()
        .map(|id| (id.to_string(), id.to_string()))
        .collect();
    graph.add_conditional_edges(
        OBJECTIVE_ASSESSOR_NODE,
        Arc::new(decide_next_step),
        Some(path_map),
    );

    graph
        .compile()
        .map_err(|e| AgentError::ExecutionFailed(format!("workflow graph: {}", e)))
}
