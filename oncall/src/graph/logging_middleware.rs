//! Middleware that logs node enter/exit (with elapsed time) around each node run.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Instant;

use crate::error::AgentError;
use crate::graph::Next;

use super::{NodeInner, NodeMiddleware};

/// Logs node enter/exit through `tracing` at info level.
///
/// Generic over state type `S`; only the node id, routing and timing are logged.
/// Installed on the on-call workflow graph so every run shows which stage it is in.
pub struct LoggingNodeMiddleware<S> {
    _phantom: std::marker::PhantomData<S>,
}

impl<S> Default for LoggingNodeMiddleware<S> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<S> NodeMiddleware<S> for LoggingNodeMiddleware<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: NodeInner<S>,
    ) -> Result<(S, Next), AgentError> {
        tracing::info!(node = node_id, "node enter");
        let started = Instant::now();
        let result = inner(state).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok((_, next)) => tracing::info!(node = node_id, ?next, elapsed_ms, "node exit"),
            Err(e) => tracing::warn!(node = node_id, error = %e, elapsed_ms, "node exit with error"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: The middleware calls inner exactly once and passes its result through.
    #[tokio::test]
    async fn around_run_passes_result_through() {
        let mw = LoggingNodeMiddleware::<i32>::default();
        let out = mw
            .around_run(
                "double",
                21,
                Box::new(|s| Box::pin(async move { Ok((s * 2, Next::End)) })),
            )
            .await
            .unwrap();
        assert_eq!(out, (42, Next::End));
    }

    /// **Scenario**: Errors from inner are returned unchanged.
    #[tokio::test]
    async fn around_run_returns_inner_error() {
        let mw = LoggingNodeMiddleware::<i32>::default();
        let out = mw
            .around_run(
                "broken",
                0,
                Box::new(|_| {
                    Box::pin(async move { Err(AgentError::ExecutionFailed("boom".into())) })
                }),
            )
            .await;
        assert!(matches!(out, Err(AgentError::ExecutionFailed(m)) if m == "boom"));
    }
}
