//! Shared deterministic types for the orchestration core.
//!
//! These types define stable contracts between the planner, executor and
//! analyzer. Steps are immutable once created: replanning produces new `Step`
//! values, it never edits executed history in place.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// Named argument list. A `Vec` rather than a map because insertion order is
/// significant: command steps append input values to their argv in this order.
pub type ArgMap = Vec<(String, Value)>;

/// Render a value the way it appears in argv, reports and stage logs:
/// bare text for strings, compact JSON for everything else.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render an argument list as `key=value` pairs for stage input logging.
pub fn describe_args(args: &ArgMap) -> String {
    args.iter()
        .map(|(key, value)| format!("{key}={}", render_value(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Signature of the function backing a [`ToolRef`].
pub type ToolFn = Arc<dyn Fn(&ToolArgs) -> anyhow::Result<Value> + Send + Sync>;

/// A named, callable tool.
#[derive(Clone)]
pub struct ToolRef {
    name: String,
    func: ToolFn,
}

impl ToolRef {
    pub fn new(name: impl Into<String>, func: ToolFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &ToolArgs) -> anyhow::Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for ToolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRef").field("name", &self.name).finish()
    }
}

/// Arguments handed to a callable tool: step inputs merged with step params,
/// insertion order preserved.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    entries: ArgMap,
}

impl ToolArgs {
    /// Merge inputs and params into one argument list, inputs first.
    ///
    /// Key uniqueness across both maps is a `Step` invariant enforced by
    /// [`Step::validate`] before execution.
    pub fn merged(inputs: &ArgMap, params: &ArgMap) -> Self {
        let mut entries = inputs.clone();
        entries.extend(params.iter().cloned());
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a step actually runs, as data.
///
/// A tagged union instead of duck typing: the executor dispatches on the
/// variant, never on the shape of the payload.
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Invoke a named tool function with inputs merged with params.
    Callable { tool: ToolRef },
    /// Run a command line; step input values are appended to `argv` in
    /// insertion order, stringified.
    Command { argv: Vec<String> },
}

impl StepAction {
    /// Name used for environment resolution and failure messages:
    /// the tool name, or the command program.
    pub fn name(&self) -> &str {
        match self {
            StepAction::Callable { tool } => tool.name(),
            StepAction::Command { argv } => argv.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// One planned unit of work. Consumed exactly once by the orchestration loop.
#[derive(Debug, Clone)]
pub struct Step {
    /// Human-readable description; doubles as the report key.
    pub description: String,
    /// The callable or command to invoke.
    pub action: StepAction,
    /// Named inputs, order-significant.
    pub inputs: ArgMap,
    /// Named parameters, merged after inputs for callable steps.
    pub params: ArgMap,
    /// Free-form planner notes.
    pub notes: String,
}

impl Step {
    pub fn new(description: impl Into<String>, action: StepAction) -> Self {
        Self {
            description: description.into(),
            action,
            inputs: ArgMap::new(),
            params: ArgMap::new(),
            notes: String::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: ArgMap) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_params(mut self, params: ArgMap) -> Self {
        self.params = params;
        self
    }

    pub fn tool_name(&self) -> &str {
        self.action.name()
    }

    /// Check step invariants. A step that fails here must fail fast, before
    /// any execution side effects.
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("step description must be non-empty".to_string());
        }
        if let StepAction::Command { argv } = &self.action
            && argv.is_empty()
        {
            return Err("command step has no runnable reference (empty argv)".to_string());
        }
        let mut seen: Vec<&str> = Vec::new();
        for (key, _) in self.inputs.iter().chain(self.params.iter()) {
            if seen.contains(&key.as_str()) {
                return Err(format!("duplicate input/param key '{key}'"));
            }
            seen.push(key);
        }
        Ok(())
    }
}

/// An ordered sequence of steps. Order defines execution order; the
/// orchestrator advances a single monotonically increasing cursor through it.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// The textual outcome of analyzing one executed step. Reports are the only
/// history replanning sees; the loop is Markovian over plan + reports-so-far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Description of the originating step.
    pub description: String,
    /// Rendered summary, one line per report in the final text.
    pub summary: String,
}

/// The unit-of-work descriptor a caller submits alongside a prompt.
///
/// The planner turns this into the initial plan; the default single-step
/// planner maps it to one step verbatim.
#[derive(Debug, Clone)]
pub struct WorkOrder {
    pub action: StepAction,
    pub inputs: ArgMap,
    pub params: ArgMap,
}

impl WorkOrder {
    pub fn new(action: StepAction) -> Self {
        Self {
            action,
            inputs: ArgMap::new(),
            params: ArgMap::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: ArgMap) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_params(mut self, params: ArgMap) -> Self {
        self.params = params;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn noop_tool() -> ToolRef {
        ToolRef::new("noop", Arc::new(|_args: &ToolArgs| Ok(Value::Null)))
    }

    #[test]
    fn render_value_strips_string_quotes() {
        assert_eq!(render_value(&json!("hello")), "hello");
        assert_eq!(render_value(&json!(3)), "3");
        assert_eq!(render_value(&json!([1, 2])), "[1,2]");
        assert_eq!(render_value(&json!(null)), "null");
    }

    #[test]
    fn merged_args_preserve_insertion_order() {
        let inputs = vec![("b".to_string(), json!(2)), ("a".to_string(), json!(1))];
        let params = vec![("mode".to_string(), json!("fast"))];
        let args = ToolArgs::merged(&inputs, &params);

        let keys: Vec<&str> = args.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "mode"]);
        assert_eq!(args.get("mode"), Some(&json!("fast")));
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn validate_rejects_empty_description() {
        let step = Step::new("  ", StepAction::Callable { tool: noop_tool() });
        let err = step.validate().unwrap_err();
        assert!(err.contains("non-empty"));
    }

    #[test]
    fn validate_rejects_empty_argv() {
        let step = Step::new("run nothing", StepAction::Command { argv: Vec::new() });
        let err = step.validate().unwrap_err();
        assert!(err.contains("no runnable reference"));
    }

    #[test]
    fn validate_rejects_duplicate_keys_across_inputs_and_params() {
        let step = Step::new("dup", StepAction::Callable { tool: noop_tool() })
            .with_inputs(vec![("a".to_string(), json!(1))])
            .with_params(vec![("a".to_string(), json!(2))]);
        let err = step.validate().unwrap_err();
        assert!(err.contains("duplicate"));
        assert!(err.contains("'a'"));
    }

    #[test]
    fn validate_accepts_well_formed_step() {
        let step = Step::new("add numbers", StepAction::Callable { tool: noop_tool() })
            .with_inputs(vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]);
        assert!(step.validate().is_ok());
    }

    #[test]
    fn describe_args_renders_pairs_in_order() {
        let args = vec![("a".to_string(), json!(1)), ("b".to_string(), json!("x"))];
        assert_eq!(describe_args(&args), "a=1 b=x");
    }
}
