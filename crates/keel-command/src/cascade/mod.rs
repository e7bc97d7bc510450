//! Cascading teardown of organizations and environments.

mod graph;
mod handler;
mod orchestrator;

pub use graph::{CascadeGraph, DeletionPlan, Dependent, GraphError, PlanStep};
pub use handler::{Teardown, TeardownHandler};
pub use orchestrator::{CascadeOrchestrator, DeletionReport};
