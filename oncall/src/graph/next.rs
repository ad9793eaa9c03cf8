//! Next-step result from a graph node: continue along the edge, jump to a node, or end.

/// Next step after running a node.
///
/// - **Continue**: follow the node's outgoing edge (or END if it has none).
/// - **Node(id)**: jump to the given node (e.g. observe → think in the tool loop).
/// - **End**: stop; the current state is the final result.
///
/// Ignored for nodes that have conditional edges; the router decides instead.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    Continue,
    Node(String),
    End,
}
