//! Input validator: finds the devices a query is about and opens one
//! investigation per device.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::{invoke_structured, LlmClient};
use crate::markdown::{add_session_context, MarkdownBuilder};
use crate::message::Message;
use crate::prompts::INVESTIGATION_PLANNING_PROMPT;
use crate::react::{last_assistant_message, run_tool_agent};
use crate::schemas::InvestigationPlanningResponse;
use crate::state::{Investigation, WorkflowState};
use crate::tool_source::ToolSource;

use super::INPUT_VALIDATOR_NODE;

/// Runs the tool agent for device discovery, then converts its answer into a
/// device list with a structured call on the plain model.
///
/// Any failure leaves the query with no investigations.
pub struct InputValidatorNode {
    agent_llm: Arc<dyn LlmClient>,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
}

impl InputValidatorNode {
    pub fn new(
        agent_llm: Arc<dyn LlmClient>,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
    ) -> Self {
        Self {
            agent_llm,
            llm,
            tools,
        }
    }

    async fn discover(&self, state: &WorkflowState) -> Result<Vec<Investigation>, AgentError> {
        let context = build_investigation_planning_context(state);
        let agent_state = run_tool_agent(
            self.agent_llm.clone(),
            self.tools.clone(),
            INVESTIGATION_PLANNING_PROMPT,
            &context,
        )
        .await?;
        let answer = last_assistant_message(&agent_state)?;
        debug!(answer_len = answer.len(), "device discovery answer");

        let response: InvestigationPlanningResponse =
            invoke_structured(self.llm.as_ref(), &[Message::user(answer)]).await?;
        Ok(response
            .devices
            .into_iter()
            .map(|device| Investigation {
                priority: device.priority,
                dependencies: device.dependencies,
                ..Investigation::new(device.device_name, device.device_profile, device.role)
            })
            .collect())
    }
}

/// Context for device discovery: the query plus session history.
pub fn build_investigation_planning_context(state: &WorkflowState) -> String {
    let mut builder = MarkdownBuilder::new();
    builder
        .add_header("Investigation Planning Context")
        .add_section("User Query")
        .add_text(&state.user_query);
    add_session_context(
        &mut builder,
        state,
        "Historical Context for Device Discovery",
    );
    builder.build()
}

#[async_trait]
impl Node<WorkflowState> for InputValidatorNode {
    fn id(&self) -> &str {
        INPUT_VALIDATOR_NODE
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        let investigations = match self.discover(&state).await {
            Ok(investigations) => investigations,
            Err(e) => {
                warn!(error = %e, "device discovery failed, no investigations created");
                Vec::new()
            }
        };
        if investigations.is_empty() {
            warn!("no devices found for query");
        } else {
            info!(devices = investigations.len(), "investigations created");
            for inv in &investigations {
                debug!(
                    device = %inv.device_name,
                    role = %inv.role,
                    profile = %inv.device_profile,
                    "investigation"
                );
            }
        }
        Ok((
            WorkflowState {
                investigations,
                ..state
            },
            Next::Continue,
        ))
    }
}
