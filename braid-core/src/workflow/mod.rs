//! Workflow orchestration
//!
//! - [`state`]: the single run snapshot
//! - [`schedule`]: dependency readiness
//! - [`engine`]: the coordinator tying issues, pull requests and tabs together

mod engine;
pub mod schedule;
mod state;

pub use engine::{ResponseOutcome, WorkflowEngine, AUTO_APPROVE_COMMENT};
pub use state::{RunStatus, WorkflowState};
