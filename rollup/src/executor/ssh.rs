//! SSH-backed remote executor.
//!
//! Shells out to the system `ssh` binary, one connection per command.
//! Authentication, host keys, and connection multiplexing are whatever the
//! ambient ssh configuration provides; the orchestrator passes them
//! through untouched.

use std::process::Stdio;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use super::{CommandSpec, ExecOutput, RemoteExecutor};
use crate::errors::RollupError;

/// Remote executor that runs each command through `ssh <host> <command>`.
#[derive(Debug)]
pub struct SshExecutor {
    /// Extra arguments inserted before the host (e.g. `-l user`, `-p 2222`).
    ssh_args: Vec<String>,
    /// Matches connection-teardown noise ssh prints on stderr.
    noise: Option<Regex>,
}

impl SshExecutor {
    /// Creates an executor with no extra ssh arguments.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ssh_args: Vec::new(),
            noise: Regex::new(r"(?i)Connection .+? closed by remote host\.?\n?").ok(),
        }
    }

    /// Adds extra arguments passed to every ssh invocation.
    #[must_use]
    pub fn with_ssh_args(mut self, args: Vec<String>) -> Self {
        self.ssh_args = args;
        self
    }

    fn scrub_stderr(&self, raw: &str) -> String {
        match &self.noise {
            Some(noise) => noise.replace_all(raw, "").trim().to_string(),
            None => raw.trim().to_string(),
        }
    }
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, host: &str, command: &CommandSpec) -> Result<ExecOutput, RollupError> {
        let rendered = command.render();
        tracing::debug!(host, command = %rendered, "running remote command");

        let output = Command::new("ssh")
            .args(&self.ssh_args)
            .arg(host)
            .arg(&rendered)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RollupError::transport(host, e.to_string()))?;

        let exit_code = output
            .status
            .code()
            .ok_or_else(|| RollupError::transport(host, "ssh terminated by signal"))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = self.scrub_stderr(&String::from_utf8_lossy(&output.stderr));

        if !stderr.is_empty() {
            tracing::warn!(host, %stderr, "remote command wrote to stderr");
        }

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_removes_connection_noise() {
        let executor = SshExecutor::new();
        let scrubbed =
            executor.scrub_stderr("Connection to db-1 closed by remote host.\nreal error\n");
        assert_eq!(scrubbed, "real error");
    }

    #[test]
    fn test_scrub_keeps_ordinary_stderr() {
        let executor = SshExecutor::new();
        assert_eq!(executor.scrub_stderr("  permission denied \n"), "permission denied");
    }
}
