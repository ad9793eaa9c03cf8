//! Structured logging for graph execution events.

pub fn log_node_start(node_id: &str) {
    tracing::debug!(node_id = node_id, "Starting node execution");
}

pub fn log_node_complete(node_id: &str, next: &crate::graph::Next) {
    tracing::debug!(node_id = node_id, ?next, "Node execution complete");
}

pub fn log_graph_start() {
    tracing::debug!("Starting graph execution");
}

pub fn log_graph_complete(steps: usize) {
    tracing::debug!(steps, "Graph execution complete");
}

pub fn log_graph_error(error: &crate::error::AgentError) {
    tracing::error!(?error, "Graph execution error");
}
