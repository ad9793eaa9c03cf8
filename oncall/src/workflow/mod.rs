//! The on-call workflow: graph assembly, shared runtime handles and a
//! multi-query session.
//!
//! ```text
//! input_validator_node → planner_node → network_executor → objective_assessor
//!                                              ↑                   │
//!                                              └── not achieved ───┤
//!                                                                  ↓ achieved
//!                                                          report_generator → END
//! ```

mod graph;
mod runtime;
mod session;

pub use graph::{build_oncall_graph, decide_next_step, workflow_recursion_limit};
pub use runtime::{connect_tools, OncallRuntime, RuntimeError};
pub use session::OncallSession;
