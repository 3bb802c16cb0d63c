//! The remote execution seam.
//!
//! Everything the orchestrator does to a node goes through
//! [`RemoteExecutor`]: run a command string on a named host, get back the
//! exit code and captured output. The core treats exit code 0 as success
//! uniformly and stays agnostic to how commands reach the host.
//!
//! Commands are passed as a structured [`CommandSpec`] rather than a
//! pre-formatted string, so anchor-timestamp substitution is an executor
//! concern and the state machine never touches string formatting.

mod ssh;

pub use ssh::SshExecutor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::RollupError;

/// Placeholder in a command template that receives the stability anchor.
pub const ANCHOR_PLACEHOLDER: &str = "{service_start_time}";

/// Format the anchor is rendered in, matching what log-grepping check
/// commands compare against (`date +'%Y%m%d%H%M%S'`).
const ANCHOR_FORMAT: &str = "%Y%m%d%H%M%S";

/// A structured command descriptor.
///
/// The template may contain [`ANCHOR_PLACEHOLDER`]; when an anchor is
/// attached, executors substitute the rendered timestamp before running
/// the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    template: String,
    anchor: Option<DateTime<Utc>>,
}

impl CommandSpec {
    /// Creates a command spec with no anchor parameter.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            anchor: None,
        }
    }

    /// Attaches the stability anchor timestamp.
    #[must_use]
    pub fn with_anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// The raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The attached anchor, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    /// Renders the final command string, substituting the anchor
    /// placeholder when an anchor is attached.
    #[must_use]
    pub fn render(&self) -> String {
        match self.anchor {
            Some(anchor) => self
                .template
                .replace(ANCHOR_PLACEHOLDER, &anchor.format(ANCHOR_FORMAT).to_string()),
            None => self.template.clone(),
        }
    }
}

/// Captured result of one remote command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Process exit code; 0 means success.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error, scrubbed of transport noise.
    pub stderr: String,
}

impl ExecOutput {
    /// Creates an output record.
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A successful, empty output.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(0, "", "")
    }

    /// Whether the command succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// A one-line description of a failed invocation for error reporting.
    #[must_use]
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {stderr}", self.exit_code)
        }
    }
}

/// Executes commands on remote hosts.
///
/// Implementations are responsible for transport, authentication, and
/// rendering the [`CommandSpec`] into its final string form.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Runs a command on the given host and captures its result.
    ///
    /// A non-zero exit code is not an error at this layer; only transport
    /// failures are.
    async fn execute(&self, host: &str, command: &CommandSpec) -> Result<ExecOutput, RollupError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_without_anchor_is_identity() {
        let spec = CommandSpec::new("sudo systemctl stop couchdb");
        assert_eq!(spec.render(), "sudo systemctl stop couchdb");
    }

    #[test]
    fn test_render_substitutes_anchor() {
        let anchor = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 45).unwrap();
        let spec = CommandSpec::new("check-after {service_start_time}").with_anchor(anchor);
        assert_eq!(spec.render(), "check-after 20240305123045");
    }

    #[test]
    fn test_anchor_placeholder_untouched_when_no_anchor() {
        let spec = CommandSpec::new("check-after {service_start_time}");
        assert_eq!(spec.render(), "check-after {service_start_time}");
    }

    #[test]
    fn test_failure_detail_includes_stderr() {
        let output = ExecOutput::new(1, "", "unit not found\n");
        assert_eq!(output.failure_detail(), "exit code 1: unit not found");

        let silent = ExecOutput::new(127, "", "");
        assert_eq!(silent.failure_detail(), "exit code 127");
    }
}
