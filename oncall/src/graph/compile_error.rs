//! Graph compilation error.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Returned by `StateGraph::compile()`. Every id referenced by an edge (except
/// START/END) must be registered, there must be exactly one entry edge, and
/// each node has either one outgoing edge or conditional edges.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// A node id in an edge was not registered via `add_node` (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// No edge has from_id == START.
    #[error("graph must have exactly one edge from START")]
    MissingStart,

    /// No path reaches END.
    #[error("graph must have at least one edge to END")]
    MissingEnd,

    /// Edges branch or loop without a conditional router.
    #[error("invalid edge chain: {0}")]
    InvalidChain(String),

    /// A node has both an outgoing edge and conditional edges.
    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),

    /// A value in a conditional path_map is not a valid node id or END.
    #[error("conditional path_map invalid target: {0}")]
    InvalidConditionalPathMap(String),
}
