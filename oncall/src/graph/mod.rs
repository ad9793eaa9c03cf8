//! State graph runtime: nodes + edges, compile and invoke.
//!
//! The on-call workflow is a [`StateGraph`] over `WorkflowState`; the MCP tool
//! agent is a second, smaller graph over `ReActState`.

mod compile_error;
mod compiled;
mod conditional;
mod logging;
mod logging_middleware;
mod next;
mod node;
mod node_middleware;
mod retry;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
};
pub use logging_middleware::LoggingNodeMiddleware;
pub use next::Next;
pub use node::Node;
pub use node_middleware::{NodeFuture, NodeInner, NodeMiddleware};
pub use retry::RetryPolicy;
pub use state_graph::{StateGraph, DEFAULT_RECURSION_LIMIT, END, START};
