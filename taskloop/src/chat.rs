//! Single-turn chat against a completion provider, recorded in the task's
//! audit trail.

use anyhow::Result;

use crate::error::ExecutionFailure;
use crate::io::task::Task;
use crate::provider::{ChatMessage, CompletionProvider};

/// Run one chat turn: append the user line, invoke the provider inside a
/// `model` stage scope, append the assistant line, return the reply text.
///
/// Provider errors surface as [`ExecutionFailure`] after being logged inside
/// the stage scope.
pub fn run_chat<P: CompletionProvider>(task: &Task, provider: &P, prompt: &str) -> Result<String> {
    task.append_chat("user", prompt)?;

    let history = vec![ChatMessage::user(prompt)];
    let reply = task.run_stage("model", prompt, "response", |_log| {
        let message = provider
            .invoke(&history)
            .map_err(|err| ExecutionFailure::new("chat turn", format!("{err:#}")))?;
        Ok(message.content)
    })?;

    task.append_chat("assistant", &reply)?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::fs;

    /// Echoes the last message back, like a trivial model.
    struct EchoProvider;

    impl CompletionProvider for EchoProvider {
        fn invoke(&self, history: &[ChatMessage]) -> Result<ChatMessage> {
            let last = history.last().expect("non-empty history");
            Ok(ChatMessage::assistant(last.content.clone()))
        }
    }

    struct FailingProvider;

    impl CompletionProvider for FailingProvider {
        fn invoke(&self, _history: &[ChatMessage]) -> Result<ChatMessage> {
            Err(anyhow!("provider unavailable"))
        }
    }

    #[test]
    fn chat_turn_records_both_sides_and_a_model_scope() {
        let temp = tempfile::tempdir().expect("tempdir");
        let task = Task::open(temp.path().join("t1")).expect("open");

        let reply = run_chat(&task, &EchoProvider, "echo").expect("chat");
        assert_eq!(reply, "echo");

        let chat = fs::read_to_string(task.chat_path()).expect("read chat");
        assert!(chat.contains("user: echo"));
        assert!(chat.contains("assistant: echo"));

        let index = fs::read_to_string(task.index_path()).expect("read index");
        assert!(index.contains(" model: logs/"));
    }

    #[test]
    fn provider_error_is_an_execution_failure_and_still_indexed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let task = Task::open(temp.path().join("t1")).expect("open");

        let err = run_chat(&task, &FailingProvider, "hello").unwrap_err();
        let failure = err.downcast_ref::<ExecutionFailure>().expect("downcast");
        assert!(failure.cause.contains("provider unavailable"));

        // The failed stage still produced its index line, and no assistant
        // turn was recorded.
        let index = fs::read_to_string(task.index_path()).expect("read index");
        assert!(index.contains(" model: logs/"));
        let chat = fs::read_to_string(task.chat_path()).expect("read chat");
        assert!(!chat.contains("assistant:"));
    }
}
