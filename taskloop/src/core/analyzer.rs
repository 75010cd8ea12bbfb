//! Result analysis: turn a (step, result) pair into a report line.

use serde_json::Value;

use crate::core::types::{Step, render_value};

/// Deterministic report formatter. Pure: no side effects, identical arguments
/// always yield identical text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAnalyzer;

impl ResultAnalyzer {
    /// Format the outcome of one executed step as `"<description>: <result>"`.
    pub fn analyze(&self, step: &Step, result: &Value) -> String {
        format!("{}: {}", step.description, render_value(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StepAction;
    use serde_json::json;

    fn step(description: &str) -> Step {
        Step::new(
            description,
            StepAction::Command {
                argv: vec!["true".to_string()],
            },
        )
    }

    #[test]
    fn formats_description_and_result() {
        let analyzer = ResultAnalyzer;
        assert_eq!(analyzer.analyze(&step("add numbers"), &json!(3)), "add numbers: 3");
    }

    #[test]
    fn string_results_are_not_quoted() {
        let analyzer = ResultAnalyzer;
        assert_eq!(analyzer.analyze(&step("echo"), &json!("3")), "echo: 3");
    }

    #[test]
    fn structured_results_render_as_compact_json() {
        let analyzer = ResultAnalyzer;
        assert_eq!(
            analyzer.analyze(&step("list"), &json!({"n": 1})),
            "list: {\"n\":1}"
        );
    }

    #[test]
    fn analysis_is_idempotent() {
        let analyzer = ResultAnalyzer;
        let s = step("stable");
        let first = analyzer.analyze(&s, &json!(42));
        let second = analyzer.analyze(&s, &json!(42));
        assert_eq!(first, second);
    }
}
