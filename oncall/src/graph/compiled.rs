//! Compiled state graph: immutable, supports invoke only.
//!
//! Built by `StateGraph::compile`. Runs from the first node; after each node the
//! returned state replaces the current one and the next node is chosen by the
//! conditional router (when present) or the node's `Next`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;

use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
};
use super::node_middleware::NodeMiddleware;
use super::retry::RetryPolicy;
use super::state_graph::END;
use super::{Next, NextEntry, Node};

/// Compiled graph: immutable structure, supports invoke only.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// First node to run (from START).
    pub(super) first_node_id: String,
    /// Node id -> Unconditional(to_id) or Conditional(router).
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    pub(super) retry_policy: RetryPolicy,
    pub(super) recursion_limit: usize,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Runs one node through the middleware (if any), retrying per the retry policy.
    async fn execute_node_with_retry(
        &self,
        node: Arc<dyn Node<S>>,
        state: S,
    ) -> Result<(S, Next), AgentError> {
        let mut attempt = 0;
        loop {
            let current_state = state.clone();
            let result = if let Some(middleware) = &self.middleware {
                let node_id = node.id().to_string();
                let node_clone = node.clone();
                middleware
                    .around_run(
                        &node_id,
                        current_state,
                        Box::new(move |s| Box::pin(async move { node_clone.run(s).await })),
                    )
                    .await
            } else {
                node.run(current_state).await
            };

            let e = match result {
                Ok(output) => return Ok(output),
                Err(e) => e,
            };
            let Some(delay) = self.retry_policy.backoff(attempt) else {
                return Err(e);
            };
            tracing::warn!(node_id = node.id(), attempt, ?delay, error = %e, "node failed, retrying");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    fn resolve_next(&self, current_id: &str, state: &S, next: Next) -> Option<String> {
        match self.next_map.get(current_id) {
            Some(NextEntry::Conditional(router)) => {
                let target = router.resolve_next(state);
                tracing::debug!(from = %current_id, to = %target, "conditional routing");
                Some(target)
            }
            entry => match next {
                Next::End => None,
                Next::Node(id) => Some(id),
                Next::Continue => match entry {
                    Some(NextEntry::Unconditional(id)) => Some(id.clone()),
                    _ => None,
                },
            },
        }
    }

    /// Runs the graph with the given state until END, returning the final state.
    ///
    /// - `Next::Continue`: follow the node's outgoing edge, or end if it has none.
    /// - `Next::Node(id)`: run the node with that id next.
    /// - `Next::End`: stop and return current state.
    ///
    /// Fails with `ExecutionFailed` when a node errors (after retries), when routing
    /// names an unknown node, or when the recursion limit is exceeded.
    pub async fn invoke(&self, state: S) -> Result<S, AgentError> {
        if !self.nodes.contains_key(&self.first_node_id) {
            return Err(AgentError::ExecutionFailed("empty graph".into()));
        }
        log_graph_start();
        let mut state = state;
        let mut current_id = self.first_node_id.clone();
        let mut steps = 0usize;

        loop {
            if steps >= self.recursion_limit {
                let err = AgentError::ExecutionFailed(format!(
                    "recursion limit of {} steps reached at node {}",
                    self.recursion_limit, current_id
                ));
                log_graph_error(&err);
                return Err(err);
            }
            let node = match self.nodes.get(&current_id) {
                Some(node) => node.clone(),
                None => {
                    let err =
                        AgentError::ExecutionFailed(format!("unknown node: {}", current_id));
                    log_graph_error(&err);
                    return Err(err);
                }
            };
            steps += 1;

            log_node_start(&current_id);
            let (new_state, next) = match self.execute_node_with_retry(node, state.clone()).await {
                Ok(output) => output,
                Err(e) => {
                    log_graph_error(&e);
                    return Err(e);
                }
            };
            log_node_complete(&current_id, &next);
            state = new_state;

            match self.resolve_next(&current_id, &state, next) {
                Some(id) if id != END => current_id = id,
                _ => {
                    log_graph_complete(steps);
                    return Ok(state);
                }
            }
        }
    }
}
