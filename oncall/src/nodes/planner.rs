//! Planner: one objective and step list per investigation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::{invoke_structured, LlmClient};
use crate::markdown::MarkdownBuilder;
use crate::message::Message;
use crate::plans::{load_plans, plans_to_string};
use crate::prompts::PLANNER_PROMPT;
use crate::schemas::{DevicePlan, PlanningResponse};
use crate::state::{Investigation, WorkflowState};

use super::PLANNER_NODE;

const PLANNING_FAILED_STEPS: &str = "Planning failed. Manual intervention required.";

pub struct PlannerNode {
    llm: Arc<dyn LlmClient>,
    plans_dir: PathBuf,
}

impl PlannerNode {
    pub fn new(llm: Arc<dyn LlmClient>, plans_dir: impl Into<PathBuf>) -> Self {
        Self {
            llm,
            plans_dir: plans_dir.into(),
        }
    }

    async fn plan(&self, state: &WorkflowState) -> Result<PlanningResponse, AgentError> {
        let plans = load_plans(&self.plans_dir);
        debug!(plans = plans.len(), "available plans");
        let messages = [
            Message::system(PLANNER_PROMPT),
            Message::user(format!("request: {}", state.user_query)),
            Message::user(format!("#available_plans:\n{}", plans_to_string(&plans))),
            Message::user(format!(
                "#investigations:\n{}",
                investigations_summary(&state.investigations)
            )),
        ];
        invoke_structured(self.llm.as_ref(), &messages).await
    }
}

/// Device names, roles and profiles as a markdown list for the planner.
pub fn investigations_summary(investigations: &[Investigation]) -> String {
    let mut builder = MarkdownBuilder::new();
    if investigations.is_empty() {
        builder
            .add_section("Investigations")
            .add_text("No investigations defined.");
        return builder.build();
    }
    builder.add_section("Devices");
    for (i, inv) in investigations.iter().enumerate() {
        builder
            .add_subsection(&format!("{}. Device: `{}`", i + 1, inv.device_name))
            .add_bold_text("Role:", Some(&inv.role))
            .add_bold_text("Device Profile:", None)
            .add_code_block(&inv.device_profile);
        if !inv.dependencies.is_empty() {
            builder.add_bold_text("Depends on:", Some(&inv.dependencies.join(", ")));
        }
    }
    builder.build()
}

/// Applies plans by device name; devices without a plan keep their fields.
fn apply_plans(investigations: Vec<Investigation>, plan: Vec<DevicePlan>) -> Vec<Investigation> {
    let mut by_device: HashMap<String, DevicePlan> = plan
        .into_iter()
        .map(|p| (p.device_name.trim().to_string(), p))
        .collect();
    investigations
        .into_iter()
        .map(|inv| match by_device.remove(&inv.device_name) {
            Some(device_plan) => {
                debug!(device = %inv.device_name, "plan applied");
                Investigation {
                    objective: Some(device_plan.objective),
                    working_plan_steps: device_plan.working_plan_steps,
                    ..inv
                }
            }
            None => {
                warn!(device = %inv.device_name, "no plan returned for device");
                inv
            }
        })
        .collect()
}

fn mark_planning_failed(investigations: Vec<Investigation>, e: &AgentError) -> Vec<Investigation> {
    investigations
        .into_iter()
        .map(|inv| Investigation {
            objective: Some(format!(
                "Planning Error: Failed to generate plan for device - {}",
                e
            )),
            working_plan_steps: PLANNING_FAILED_STEPS.to_string(),
            error_details: Some(e.to_string()),
            ..inv
        })
        .collect()
}

#[async_trait]
impl Node<WorkflowState> for PlannerNode {
    fn id(&self) -> &str {
        PLANNER_NODE
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        let outcome = self.plan(&state).await;
        let mut state = state;
        let investigations = std::mem::take(&mut state.investigations);
        state.investigations = match outcome {
            Ok(response) => {
                info!(plans = response.plan.len(), "planning complete");
                apply_plans(investigations, response.plan)
            }
            Err(e) => {
                error!(error = %e, "planning failed");
                mark_planning_failed(investigations, &e)
            }
        };
        Ok((state, Next::Continue))
    }
}
