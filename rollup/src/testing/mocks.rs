//! Scripted executors for testing.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::RollupError;
use crate::executor::{CommandSpec, ExecOutput, RemoteExecutor};

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The host the command was sent to.
    pub host: String,
    /// The command spec as the executor received it.
    pub command: CommandSpec,
}

/// A [`RemoteExecutor`] that records every invocation and answers from a
/// script.
///
/// Responses are matched by substring against the command template, first
/// match wins; unmatched commands succeed with empty output. A response
/// can also be scripted as a sequence, consumed one entry per call, with
/// the last entry repeating.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Vec<(String, Script)>,
    invocations: Mutex<Vec<Invocation>>,
}

#[derive(Debug)]
struct Script {
    outputs: Vec<ExecOutput>,
    cursor: Mutex<usize>,
}

impl Script {
    fn next(&self) -> ExecOutput {
        let mut cursor = self.cursor.lock();
        let index = (*cursor).min(self.outputs.len() - 1);
        *cursor += 1;
        self.outputs[index].clone()
    }
}

impl ScriptedExecutor {
    /// Creates an executor that answers every command with success.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a fixed response for commands whose template contains
    /// `pattern`.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, output: ExecOutput) -> Self {
        self.with_response_sequence(pattern, vec![output])
    }

    /// Scripts a sequence of responses for commands whose template
    /// contains `pattern`; the last entry repeats once the sequence is
    /// exhausted.
    ///
    /// # Panics
    ///
    /// Panics if `outputs` is empty.
    #[must_use]
    pub fn with_response_sequence(
        mut self,
        pattern: impl Into<String>,
        outputs: Vec<ExecOutput>,
    ) -> Self {
        assert!(!outputs.is_empty(), "a response script needs at least one entry");
        self.responses.push((
            pattern.into(),
            Script {
                outputs,
                cursor: Mutex::new(0),
            },
        ));
        self
    }

    /// Every invocation recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    /// The command templates run so far, in order.
    #[must_use]
    pub fn commands_run(&self) -> Vec<String> {
        self.invocations
            .lock()
            .iter()
            .map(|i| i.command.template().to_string())
            .collect()
    }

    /// How many commands containing `pattern` were run.
    #[must_use]
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.invocations
            .lock()
            .iter()
            .filter(|i| i.command.template().contains(pattern))
            .count()
    }

    /// Clears recorded invocations.
    pub fn reset(&self) {
        self.invocations.lock().clear();
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn execute(&self, host: &str, command: &CommandSpec) -> Result<ExecOutput, RollupError> {
        self.invocations.lock().push(Invocation {
            host: host.to_string(),
            command: command.clone(),
        });

        for (pattern, script) in &self.responses {
            if command.template().contains(pattern.as_str()) {
                return Ok(script.next());
            }
        }
        Ok(ExecOutput::ok())
    }
}

/// Shorthand constructors for scripted responses.
pub mod respond {
    use crate::executor::ExecOutput;

    /// A success with the given stdout.
    #[must_use]
    pub fn stdout(out: impl Into<String>) -> ExecOutput {
        ExecOutput::new(0, out, "")
    }

    /// A failure with the given exit code.
    #[must_use]
    pub fn exit(code: i32) -> ExecOutput {
        ExecOutput::new(code, "", "")
    }

    /// A failure with stderr content.
    #[must_use]
    pub fn stderr(code: i32, err: impl Into<String>) -> ExecOutput {
        ExecOutput::new(code, "", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_unmatched_commands_succeed() {
        let executor = ScriptedExecutor::new();
        let output = executor
            .execute("db-1", &CommandSpec::new("anything"))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(executor.commands_run(), vec!["anything"]);
    }

    #[tokio::test]
    async fn test_first_matching_pattern_wins() {
        let executor = ScriptedExecutor::new()
            .with_response("stop", respond::exit(1))
            .with_response("stop-service", respond::exit(2));

        let output = executor
            .execute("db-1", &CommandSpec::new("stop-service"))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 1);
    }

    #[tokio::test]
    async fn test_sequence_repeats_last_entry() {
        let executor = ScriptedExecutor::new()
            .with_response_sequence("check", vec![respond::exit(1), respond::exit(0)]);

        let spec = CommandSpec::new("check");
        assert_eq!(executor.execute("h", &spec).await.unwrap().exit_code, 1);
        assert_eq!(executor.execute("h", &spec).await.unwrap().exit_code, 0);
        assert_eq!(executor.execute("h", &spec).await.unwrap().exit_code, 0);
    }
}
