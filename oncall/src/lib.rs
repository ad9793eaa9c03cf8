//! # sp-oncall
//!
//! A multi-device network on-call assistant. A natural-language query goes
//! through a small state graph: the devices it concerns are discovered, each
//! gets an investigation plan, every investigation runs concurrently through an
//! MCP tool agent, an assessor decides whether the query is answered (retrying
//! execution a bounded number of times), and a final report is written.
//!
//! ## Design principles
//!
//! - **Single state type**: [`WorkflowState`] flows through every node and is
//!   replaced wholesale after each step.
//! - **Degrade, don't fail**: node-level failures (model errors, tool errors,
//!   unparseable replies) become error text in the state. Only infrastructure
//!   problems surface as `Err`.
//! - **Bounded loop**: the assessor forces the objective to achieved once
//!   `current_retries == max_retries`, so every query ends in a report.
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`]: the graph runtime.
//! - [`nodes`]: the five workflow nodes.
//! - [`workflow`]: [`build_oncall_graph`], [`OncallRuntime`], [`OncallSession`].
//! - [`react`]: the think → act → observe tool agent ([`run_tool_agent`]).
//! - [`tool_source`]: [`ToolSource`]; MCP over stdio and HTTP ([`McpToolSource`], [`MultiServerToolSource`]).
//! - [`llm`]: [`LlmClient`], [`ChatOpenAI`], [`MockLlm`], [`invoke_structured`].
//! - [`state`]: [`WorkflowState`], [`Investigation`], [`AssessmentOutput`], [`ReActState`].
//! - [`schemas`]: structured model outputs.
//! - [`markdown`], [`prompts`], [`plans`], [`settings`].

pub mod error;
pub mod graph;
pub mod llm;
pub mod markdown;
pub mod message;
pub mod nodes;
pub mod plans;
pub mod prompts;
pub mod react;
pub mod schemas;
pub mod settings;
pub mod state;
pub mod tool_source;
pub mod workflow;

pub use error::AgentError;
pub use graph::{CompilationError, CompiledStateGraph, Next, Node, StateGraph, END, START};
pub use llm::{invoke_structured, load_chat_model, ChatOpenAI, LlmClient, LlmResponse, MockLlm, MockReply};
pub use message::Message;
pub use react::run_tool_agent;
pub use settings::{Settings, SettingsError};
pub use state::{
    AssessmentOutput, ExecutedToolCall, Investigation, InvestigationStatus, Priority, ReActState,
    WorkflowSession, WorkflowState,
};
pub use tool_source::{
    McpToolSource, MockToolSource, MultiServerToolSource, ToolSource, ToolSourceError, ToolSpec,
};
pub use workflow::{build_oncall_graph, OncallRuntime, OncallSession};

/// Initializes tracing from `RUST_LOG` for unit tests (`cargo test -- --nocapture`).
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
