//! Run orchestration: candidate selection, per-patient decisions and the
//! run-end export pipeline.

mod context;
mod decision;
mod orchestrator;

pub use context::{ContextError, RunContext};
pub use decision::{decide, Decision, RegenReason};
pub use orchestrator::{Orchestrator, RunSummary};
