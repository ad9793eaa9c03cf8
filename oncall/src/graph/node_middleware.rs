//! Node middleware: wrap `Node::run` with external async logic (around pattern).
//!
//! Set via `StateGraph::with_middleware`.

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use crate::error::AgentError;

use super::Next;

/// Boxed future returned by a node run.
pub type NodeFuture<S> = Pin<Box<dyn Future<Output = Result<(S, Next), AgentError>> + Send>>;

/// The wrapped node run; must be called exactly once to execute the node.
pub type NodeInner<S> = Box<dyn FnOnce(S) -> NodeFuture<S> + Send>;

/// Async middleware that wraps each node run.
#[async_trait]
pub trait NodeMiddleware<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// - `node_id`: current node id
    /// - `state`: state passed to the node
    /// - `inner`: actual node run
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: NodeInner<S>,
    ) -> Result<(S, Next), AgentError>;
}
