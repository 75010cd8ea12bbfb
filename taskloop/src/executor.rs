//! Step execution.
//!
//! The [`StepExecutor`] trait decouples the orchestration loop from the actual
//! execution substrate. [`LocalExecutor`] runs callable steps in-process and
//! command steps as child processes; remote queue backends plug in behind the
//! same trait. From the loop's perspective `execute` blocks until a result or
//! failure is available; no partial results are surfaced.

use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::environment::ExecutionEnv;
use crate::core::types::{Step, StepAction, ToolArgs, render_value};
use crate::error::ExecutionFailure;
use crate::io::audit::NodeLog;
use crate::io::config::OrchestratorConfig;
use crate::io::process::run_command;

/// Abstraction over step execution backends.
pub trait StepExecutor {
    /// Execute one plan step to completion in the resolved environment.
    ///
    /// Detailed output (stdout/stderr, tool chatter) goes to the stage's node
    /// log; the return value is the step result. Failures are
    /// [`ExecutionFailure`] values carried in the error chain.
    fn execute(&self, step: &Step, env: ExecutionEnv, log: &mut NodeLog) -> Result<Value>;
}

/// Executor that runs steps on the local host.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    config: OrchestratorConfig,
}

impl LocalExecutor {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }
}

impl StepExecutor for LocalExecutor {
    #[instrument(skip_all, fields(step = %step.description, env = %env))]
    fn execute(&self, step: &Step, env: ExecutionEnv, log: &mut NodeLog) -> Result<Value> {
        step.validate()
            .map_err(|reason| ExecutionFailure::new(&step.description, reason))?;

        match &step.action {
            StepAction::Callable { tool } => {
                log.info(&format!("calling tool '{}' in {env}", tool.name()))?;
                let args = ToolArgs::merged(&step.inputs, &step.params);
                let result = tool.call(&args).map_err(|err| {
                    ExecutionFailure::new(&step.description, format!("{err:#}"))
                })?;
                debug!("tool call completed");
                Ok(result)
            }
            StepAction::Command { argv } => {
                // Positional argument vector: the template argv followed by the
                // stringified input values in insertion order.
                let mut full = argv.clone();
                full.extend(step.inputs.iter().map(|(_, value)| render_value(value)));
                log.info(&format!("spawning in {env}: {}", full.join(" ")))?;

                let mut cmd = Command::new(&full[0]);
                cmd.args(&full[1..]);
                let timeout = Duration::from_secs(self.config.step_timeout_secs);
                let output = run_command(cmd, timeout, self.config.output_limit_bytes)
                    .map_err(|err| {
                        ExecutionFailure::new(&step.description, format!("{err:#}"))
                    })?;

                let stdout = output.stdout_text();
                let stderr = output.stderr_text();
                if !stdout.is_empty() {
                    log.info(&format!("stdout: {}", stdout.trim_end()))?;
                }
                if !stderr.is_empty() {
                    log.info(&format!("stderr: {}", stderr.trim_end()))?;
                }

                if output.timed_out {
                    return Err(ExecutionFailure::new(
                        &step.description,
                        format!("command timed out after {}s", timeout.as_secs()),
                    )
                    .into());
                }
                if !output.status.success() {
                    return Err(ExecutionFailure::new(
                        &step.description,
                        format!(
                            "command exited with status {:?}: {}",
                            output.status.code(),
                            stderr.trim()
                        ),
                    )
                    .into());
                }

                Ok(Value::String(stdout.trim().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ToolRef;
    use crate::io::task::Task;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::Arc;

    fn with_log<T>(f: impl FnOnce(&mut NodeLog) -> Result<T>) -> Result<T> {
        let temp = tempfile::tempdir().expect("tempdir");
        let task = Task::open(temp.path().join("t")).expect("open");
        task.with_node_log("runner", f)
    }

    fn add_tool() -> ToolRef {
        ToolRef::new(
            "add",
            Arc::new(|args: &ToolArgs| {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
                Ok(json!(a + b))
            }),
        )
    }

    #[test]
    fn callable_step_receives_merged_inputs_and_params() {
        let step = Step::new("add numbers", StepAction::Callable { tool: add_tool() })
            .with_inputs(vec![("a".to_string(), json!(1))])
            .with_params(vec![("b".to_string(), json!(2))]);

        let executor = LocalExecutor::default();
        let result = with_log(|log| executor.execute(&step, ExecutionEnv::Local, log))
            .expect("execute");
        assert_eq!(result, json!(3));
    }

    #[test]
    fn callable_error_becomes_execution_failure_with_step_description() {
        let tool = ToolRef::new(
            "broken",
            Arc::new(|_args: &ToolArgs| Err(anyhow!("tool blew up"))),
        );
        let step = Step::new("break things", StepAction::Callable { tool });

        let executor = LocalExecutor::default();
        let err = with_log(|log| executor.execute(&step, ExecutionEnv::Local, log)).unwrap_err();
        let failure = err.downcast_ref::<ExecutionFailure>().expect("downcast");
        assert_eq!(failure.description, "break things");
        assert!(failure.cause.contains("tool blew up"));
    }

    #[test]
    fn command_step_appends_input_values_in_insertion_order() {
        let step = Step::new(
            "echo args",
            StepAction::Command {
                argv: vec!["echo".to_string()],
            },
        )
        .with_inputs(vec![
            ("first".to_string(), json!("one")),
            ("second".to_string(), json!(2)),
        ]);

        let executor = LocalExecutor::default();
        let result = with_log(|log| executor.execute(&step, ExecutionEnv::Local, log))
            .expect("execute");
        assert_eq!(result, json!("one 2"));
    }

    #[test]
    fn command_step_returns_trimmed_stdout() {
        let step = Step::new(
            "say hi",
            StepAction::Command {
                argv: vec!["sh".to_string(), "-c".to_string(), "echo '  hi  '".to_string()],
            },
        );

        let executor = LocalExecutor::default();
        let result = with_log(|log| executor.execute(&step, ExecutionEnv::Local, log))
            .expect("execute");
        assert_eq!(result, json!("hi"));
    }

    #[test]
    fn nonzero_exit_fails_with_captured_stderr() {
        let step = Step::new(
            "fail loudly",
            StepAction::Command {
                argv: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "echo broken >&2; exit 7".to_string(),
                ],
            },
        );

        let executor = LocalExecutor::default();
        let err = with_log(|log| executor.execute(&step, ExecutionEnv::Local, log)).unwrap_err();
        let failure = err.downcast_ref::<ExecutionFailure>().expect("downcast");
        assert!(failure.cause.contains("status Some(7)"));
        assert!(failure.cause.contains("broken"));
    }

    #[test]
    fn invalid_step_fails_fast_without_running_anything() {
        let step = Step::new("run nothing", StepAction::Command { argv: Vec::new() });

        let executor = LocalExecutor::default();
        let err = with_log(|log| executor.execute(&step, ExecutionEnv::Local, log)).unwrap_err();
        let failure = err.downcast_ref::<ExecutionFailure>().expect("downcast");
        assert!(failure.cause.contains("no runnable reference"));
    }
}
