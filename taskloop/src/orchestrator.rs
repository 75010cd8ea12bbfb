//! The orchestration loop.
//!
//! An explicit finite-state machine drives each task:
//!
//! ```text
//! Planning ── no step left ──▶ Done
//!    │ ▲
//!    ▼ └───────────────┐
//! Executing ──▶ Analyzing
//! ```
//!
//! Every stage transition runs inside its own audit scope (`planner`,
//! `environment`, `runner`, `analyst`), so the master index alone gives a
//! total order of stage invocations. Termination: the cursor is monotonically
//! non-decreasing and bounded by the plan length, and the default replanning
//! policy never grows the plan.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::core::analyzer::ResultAnalyzer;
use crate::core::environment::EnvironmentResolver;
use crate::core::types::{Plan, Step, StepReport, WorkOrder, describe_args, render_value};
use crate::error::PlanningFailure;
use crate::executor::StepExecutor;
use crate::io::task::Task;
use crate::planner::Planner;

/// Loop phase. `Executing` and `Analyzing` carry the data the next transition
/// needs; `Done` is terminal.
#[derive(Debug)]
enum Phase {
    Planning,
    Executing { step: Step },
    Analyzing { step: Step, result: Value },
    Done,
}

/// Drives one task through plan → execute → analyze → replan until the plan is
/// exhausted. All collaborators are injected; the orchestrator owns only the
/// control flow and the audit trail.
pub struct TaskOrchestrator<'a, P, E, R> {
    task: &'a Task,
    planner: P,
    executor: E,
    environments: R,
    analyzer: ResultAnalyzer,
}

impl<'a, P, E, R> TaskOrchestrator<'a, P, E, R>
where
    P: Planner,
    E: StepExecutor,
    R: EnvironmentResolver,
{
    pub fn new(task: &'a Task, planner: P, executor: E, environments: R) -> Self {
        Self {
            task,
            planner,
            executor,
            environments,
            analyzer: ResultAnalyzer,
        }
    }

    /// Run the loop to completion and return the final report text: all step
    /// report lines joined with newlines, also appended to the transcript as
    /// the assistant's turn.
    ///
    /// On failure the error names the failing stage; its dedicated log file is
    /// reachable through the master index.
    #[instrument(skip_all, fields(task = %self.task.root().display()))]
    pub fn run(&self, prompt: &str, work: &WorkOrder) -> Result<String> {
        self.task.append_chat("user", prompt)?;

        let mut plan: Option<Plan> = None;
        let mut reports: Vec<StepReport> = Vec::new();
        let mut cursor = 0usize;
        // Set when a step failed and the planner gets one chance to route
        // around it; propagated if the revised plan repeats the failing step.
        let mut pending_failure: Option<(anyhow::Error, String)> = None;
        let mut phase = Phase::Planning;

        loop {
            phase = match phase {
                Phase::Planning => {
                    let revised = match &plan {
                        None => self.task.run_stage("planner", prompt, "plan", |_log| {
                            self.planner.plan(prompt, work)
                        })?,
                        Some(current) => {
                            let inputs = format!("{} report(s) so far", reports.len());
                            self.task.run_stage("planner", &inputs, "plan", |_log| {
                                self.planner.replan(current, &reports)
                            })?
                        }
                    };
                    if let Some(current) = &plan {
                        ensure_history_intact(current, &revised, cursor)?;
                    }

                    if let Some((failure, failed_step)) = pending_failure.take() {
                        let repeats = revised
                            .get(cursor)
                            .is_some_and(|step| step_signature(step) == failed_step);
                        if repeats {
                            return Err(failure);
                        }
                        info!("replanning routed around the failed step");
                    }

                    let next = revised.get(cursor).cloned();
                    plan = Some(revised);
                    match next {
                        None => Phase::Done,
                        Some(step) => Phase::Executing { step },
                    }
                }

                Phase::Executing { step } => {
                    let env = self
                        .task
                        .run_stage("environment", step.tool_name(), "environment", |_log| {
                            Ok(self.environments.resolve(step.tool_name()))
                        })?;

                    let inputs = describe_args(&step.inputs);
                    let attempt =
                        self.task
                            .run_stage("runner", &inputs, "execution result", |log| {
                                self.executor.execute(&step, env, log)
                            });

                    match attempt {
                        Ok(result) => Phase::Analyzing { step, result },
                        Err(err) => {
                            debug!(step = %step.description, "step failed, recording report");
                            // The failure becomes part of the report history so
                            // replanning can react to it.
                            reports.push(StepReport {
                                description: step.description.clone(),
                                summary: format!("{err:#}"),
                            });
                            pending_failure = Some((err, step_signature(&step)));
                            Phase::Planning
                        }
                    }
                }

                Phase::Analyzing { step, result } => {
                    let summary =
                        self.task
                            .run_stage("analyst", &step.description, "report", |log| {
                                log.info(&format!("Result: {}", render_value(&result)))?;
                                Ok(self.analyzer.analyze(&step, &result))
                            })?;
                    reports.push(StepReport {
                        description: step.description.clone(),
                        summary,
                    });
                    cursor += 1;
                    Phase::Planning
                }

                Phase::Done => {
                    let final_report = reports
                        .iter()
                        .map(|report| report.summary.as_str())
                        .collect::<Vec<_>>()
                        .join("\n");
                    self.task.append_chat("assistant", &final_report)?;
                    info!(steps = cursor, "task complete");
                    return Ok(final_report);
                }
            };
        }
    }
}

/// Identity used to detect whether replanning changed a step: description plus
/// action name.
fn step_signature(step: &Step) -> String {
    format!("{}\u{1f}{}", step.description, step.tool_name())
}

/// Replanning may only touch the unexecuted tail; the executed prefix must
/// survive verbatim.
fn ensure_history_intact(current: &Plan, revised: &Plan, cursor: usize) -> Result<()> {
    for index in 0..cursor {
        let before = current.get(index).map(step_signature);
        let after = revised.get(index).map(step_signature);
        if before != after {
            return Err(PlanningFailure::new(format!(
                "replan altered executed history at step {index}"
            ))
            .into());
        }
    }
    Ok(())
}
