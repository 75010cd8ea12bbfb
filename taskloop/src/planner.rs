//! Planning: turn a prompt plus a unit-of-work descriptor into an ordered
//! plan, and revise the remaining plan between steps.

use anyhow::Result;

use crate::core::types::{Plan, Step, StepReport, WorkOrder};
use crate::error::PlanningFailure;

/// Produces and revises plans.
///
/// `replan` runs once per loop cycle over plan + reports-so-far; it may
/// insert, drop or reorder the unexecuted tail, but must never alter executed
/// history (the orchestrator enforces this) and must not grow the unexecuted
/// tail without bound; termination of the loop depends on it.
pub trait Planner {
    /// Produce the initial ordered plan.
    fn plan(&self, prompt: &str, work: &WorkOrder) -> Result<Plan>;

    /// Revise the plan given completed step reports.
    ///
    /// Default policy: return the plan unchanged.
    fn replan(&self, plan: &Plan, reports: &[StepReport]) -> Result<Plan> {
        let _ = reports;
        Ok(plan.clone())
    }
}

/// Planner that maps the submitted unit of work to a one-step plan using the
/// prompt as the step description.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleStepPlanner;

impl Planner for SingleStepPlanner {
    fn plan(&self, prompt: &str, work: &WorkOrder) -> Result<Plan> {
        if prompt.trim().is_empty() {
            return Err(PlanningFailure::new("prompt must be non-empty").into());
        }
        let step = Step::new(prompt, work.action.clone())
            .with_inputs(work.inputs.clone())
            .with_params(work.params.clone());
        Ok(Plan::new(vec![step]))
    }
}
