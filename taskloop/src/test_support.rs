//! Shared test doubles and fixtures.
//!
//! Available to integration tests through the `test-support` feature. The
//! doubles are scripted rather than mocked: each carries a queue of canned
//! outcomes and records what it was asked to do.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::{Value, json};

use crate::core::environment::ExecutionEnv;
use crate::core::types::{Plan, Step, StepAction, StepReport, ToolRef, WorkOrder};
use crate::error::ExecutionFailure;
use crate::executor::StepExecutor;
use crate::io::audit::NodeLog;
use crate::io::task::Task;
use crate::planner::Planner;

/// Fresh task in a temp directory. Keep the guard alive for the test's
/// duration.
pub fn temp_task() -> (tempfile::TempDir, Task) {
    let temp = tempfile::tempdir().expect("tempdir");
    let task = Task::open(temp.path().join("task")).expect("open task");
    (temp, task)
}

/// Callable tool that sums its `a` and `b` arguments.
pub fn adder_tool() -> ToolRef {
    ToolRef::new(
        "add",
        Arc::new(|args| {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(a + b))
        }),
    )
}

/// Command step running `echo` over its input values.
pub fn echo_step(description: &str, inputs: Vec<(String, Value)>) -> Step {
    Step::new(
        description,
        StepAction::Command {
            argv: vec!["echo".to_string()],
        },
    )
    .with_inputs(inputs)
}

/// Planner scripted with an initial plan and a queue of revisions.
///
/// `plan` returns the initial plan; each `replan` call pops the next revision,
/// falling back to the unchanged current plan once the queue is empty. Call
/// counts are observable for assertions.
pub struct ScriptedPlanner {
    initial: Plan,
    revisions: Mutex<Vec<Plan>>,
    pub replan_calls: Mutex<usize>,
}

impl ScriptedPlanner {
    pub fn new(initial: Plan) -> Self {
        Self {
            initial,
            revisions: Mutex::new(Vec::new()),
            replan_calls: Mutex::new(0),
        }
    }

    /// Queue revisions returned by successive `replan` calls, in order.
    pub fn with_revisions(mut self, revisions: Vec<Plan>) -> Self {
        // Stored reversed so pop() yields them in queue order.
        let mut reversed = revisions;
        reversed.reverse();
        self.revisions = Mutex::new(reversed);
        self
    }

    pub fn replan_count(&self) -> usize {
        *self.replan_calls.lock().expect("lock")
    }
}

impl Planner for ScriptedPlanner {
    fn plan(&self, _prompt: &str, _work: &WorkOrder) -> Result<Plan> {
        Ok(self.initial.clone())
    }

    fn replan(&self, plan: &Plan, _reports: &[StepReport]) -> Result<Plan> {
        *self.replan_calls.lock().expect("lock") += 1;
        let next = self.revisions.lock().expect("lock").pop();
        Ok(next.unwrap_or_else(|| plan.clone()))
    }
}

/// One scripted execution outcome.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Succeed(Value),
    Fail(String),
}

/// Executor that pops one scripted outcome per step and records the step
/// descriptions it saw.
pub struct ScriptedExecutor {
    outcomes: Mutex<Vec<ScriptedOutcome>>,
    default: Option<Value>,
    pub executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(outcomes: Vec<ScriptedOutcome>) -> Self {
        let mut reversed = outcomes;
        reversed.reverse();
        Self {
            outcomes: Mutex::new(reversed),
            default: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Executor that succeeds every step with the given value, forever.
    pub fn always(value: Value) -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            default: Some(value),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed_descriptions(&self) -> Vec<String> {
        self.executed.lock().expect("lock").clone()
    }
}

impl StepExecutor for ScriptedExecutor {
    fn execute(&self, step: &Step, env: ExecutionEnv, log: &mut NodeLog) -> Result<Value> {
        log.info(&format!("scripted execution of '{}' in {env}", step.description))?;
        self.executed
            .lock()
            .expect("lock")
            .push(step.description.clone());

        let outcome = self.outcomes.lock().expect("lock").pop();
        match outcome {
            Some(ScriptedOutcome::Succeed(value)) => Ok(value),
            Some(ScriptedOutcome::Fail(cause)) => {
                Err(ExecutionFailure::new(&step.description, cause).into())
            }
            None => match &self.default {
                Some(value) => Ok(value.clone()),
                None => Err(ExecutionFailure::new(
                    &step.description,
                    "scripted executor exhausted",
                )
                .into()),
            },
        }
    }
}
