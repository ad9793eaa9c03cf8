//! State graph: nodes + explicit edges (from → to) and optional conditional edges.
//!
//! Add nodes with `add_node`, define the flow with `add_edge(from, to)` using
//! `START` and `END` for entry/exit, and `add_conditional_edges` to route on
//! state (the assessor → executor back-edge). Then `compile`.
//!
//! A node must have either one outgoing `add_edge` or `add_conditional_edges`, not both.
//! Node outputs replace the previous state entirely.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
use crate::graph::node::Node;
use crate::graph::node_middleware::NodeMiddleware;
use crate::graph::retry::RetryPolicy;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// Maximum node steps per `invoke` unless overridden with `with_recursion_limit`.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// State graph: nodes plus explicit edges and optional conditional edges.
///
/// Generic over state type `S`. Accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Edges (from_id, to_id).
    edges: Vec<(String, String)>,
    /// Source node id -> router. Next node is resolved from state at runtime.
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    retry_policy: RetryPolicy,
    recursion_limit: usize,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            middleware: None,
            retry_policy: RetryPolicy::None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Attaches node middleware; `compile()` will wrap every node run with it.
    pub fn with_middleware(self, middleware: Arc<dyn NodeMiddleware<S>>) -> Self {
        Self {
            middleware: Some(middleware),
            ..self
        }
    }

    /// Attaches a retry policy for nodes that return `Err`. Default is `RetryPolicy::None`.
    pub fn with_retry_policy(self, retry_policy: RetryPolicy) -> Self {
        Self {
            retry_policy,
            ..self
        }
    }

    /// Maximum number of node steps per `invoke`; exceeding it fails the run.
    pub fn with_recursion_limit(self, recursion_limit: usize) -> Self {
        Self {
            recursion_limit,
            ..self
        }
    }

    /// Adds a node; replaces any node with the same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id` (`START` / `END` allowed).
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`: after it runs, `path(state)` picks the key;
    /// the next node is `path_map[key]` when mapped, otherwise the key itself.
    ///
    /// All path_map values must be registered node ids or `END`.
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, path_map));
        self
    }

    /// Validates the graph and builds the executable form.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(ref path_map) = router.path_map {
                for target in path_map.values() {
                    if target != END && !self.nodes.contains_key(target) {
                        return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                    }
                }
            }
        }

        let mut start_edges = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone());
        let first = match (start_edges.next(), start_edges.next()) {
            (None, _) => return Err(CompilationError::MissingStart),
            (Some(first), None) => first,
            (Some(_), Some(_)) => {
                return Err(CompilationError::InvalidChain(
                    "multiple edges from START".into(),
                ))
            }
        };

        let has_end = self.edges.iter().any(|(_, t)| t == END)
            || self.conditional_edges.values().any(|r| {
                r.path_map
                    .as_ref()
                    .map_or(true, |m| m.values().any(|v| v == END))
            });
        if !has_end {
            return Err(CompilationError::MissingEnd);
        }

        let mut edge_froms = HashSet::new();
        for (from, _) in self.edges.iter().filter(|(f, _)| f.as_str() != START) {
            if !edge_froms.insert(from.clone()) {
                return Err(CompilationError::InvalidChain(format!(
                    "node {} has more than one outgoing edge",
                    from
                )));
            }
        }
        for source in self.conditional_edges.keys() {
            if edge_froms.contains(source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
        }

        let mut next_map: HashMap<String, NextEntry<S>> = self
            .edges
            .iter()
            .filter(|(f, _)| f.as_str() != START)
            .map(|(f, t)| (f.clone(), NextEntry::Unconditional(t.clone())))
            .collect();

        // Without a router nothing can break a cycle of plain edges.
        if self.conditional_edges.is_empty() {
            let mut visited = HashSet::from([first.clone()]);
            let mut current = first.clone();
            while let Some(NextEntry::Unconditional(next)) = next_map.get(&current) {
                if next == END {
                    break;
                }
                if !visited.insert(next.clone()) {
                    return Err(CompilationError::InvalidChain("cycle detected".into()));
                }
                current = next.clone();
            }
        }

        for (source, router) in self.conditional_edges {
            next_map.insert(source, NextEntry::Conditional(router));
        }

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            first_node_id: first,
            next_map,
            middleware: self.middleware,
            retry_policy: self.retry_policy,
            recursion_limit: self.recursion_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::AgentError;
    use crate::graph::{Next, Node};

    #[derive(Clone, Debug)]
    struct DummyState;

    struct DummyNode(&'static str);

    #[async_trait]
    impl Node<DummyState> for DummyNode {
        fn id(&self) -> &str {
            self.0
        }
        async fn run(&self, state: DummyState) -> Result<(DummyState, Next), AgentError> {
            Ok((state, Next::Continue))
        }
    }

    fn node(id: &'static str) -> Arc<dyn Node<DummyState>> {
        Arc::new(DummyNode(id))
    }

    /// **Scenario**: Compile fails when a node has both an outgoing edge and conditional edges.
    #[test]
    fn compile_fails_when_node_has_both_edge_and_conditional() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("assess", node("assess"));
        graph.add_node("report", node("report"));
        graph.add_edge(START, "assess");
        graph.add_edge("assess", "report");
        graph.add_edge("report", END);
        graph.add_conditional_edges("assess", Arc::new(|_| "report".to_string()), None);
        match graph.compile() {
            Err(CompilationError::NodeHasBothEdgeAndConditional(id)) => assert_eq!(id, "assess"),
            Err(e) => panic!("expected NodeHasBothEdgeAndConditional, got {:?}", e),
            Ok(_) => panic!("expected compile error"),
        }
    }

    /// **Scenario**: Compile fails when a conditional path_map targets an unknown node.
    #[test]
    fn compile_fails_when_conditional_path_map_has_invalid_target() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("assess", node("assess"));
        graph.add_edge(START, "assess");
        graph.add_conditional_edges(
            "assess",
            Arc::new(|_| "retry".to_string()),
            Some(
                [("retry".to_string(), "missing_executor".to_string())]
                    .into_iter()
                    .collect(),
            ),
        );
        match graph.compile() {
            Err(CompilationError::InvalidConditionalPathMap(id)) => {
                assert_eq!(id, "missing_executor")
            }
            Err(e) => panic!("expected InvalidConditionalPathMap, got {:?}", e),
            Ok(_) => panic!("expected compile error"),
        }
    }

    /// **Scenario**: Compile fails without an entry edge or when an edge names an unknown node.
    #[test]
    fn compile_fails_without_start_or_with_unknown_node() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", node("a"));
        graph.add_edge("a", END);
        assert!(matches!(graph.compile(), Err(CompilationError::MissingStart)));

        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", node("a"));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        assert!(matches!(graph.compile(), Err(CompilationError::NodeNotFound(id)) if id == "b"));
    }

    /// **Scenario**: A cycle made only of plain edges is rejected.
    #[test]
    fn compile_rejects_unconditional_cycle() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", node("a"));
        graph.add_node("b", node("b"));
        graph.add_node("c", node("c"));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");
        graph.add_edge("c", END);
        assert!(matches!(
            graph.compile(),
            Err(CompilationError::InvalidChain(msg)) if msg.contains("cycle")
        ));
    }
}
