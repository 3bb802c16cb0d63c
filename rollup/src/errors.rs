//! Error types for the rollup orchestrator.
//!
//! Every error in this taxonomy is node-local and fatal to the whole run:
//! the driver never continues past a node that could not be verified
//! healthy. The only internal retry in the system lives in the stability
//! gate, and its exhaustion surfaces here as [`RollupError::Unstable`].

use thiserror::Error;

use crate::node::UpgradeStep;

/// The main error type for rollup operations.
#[derive(Debug, Error)]
pub enum RollupError {
    /// A version string could not be parsed.
    #[error("malformed version '{input}': {reason}")]
    MalformedVersion {
        /// The offending input string.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The installed-version probe on a node failed.
    #[error("version probe failed on '{host}': {detail}")]
    Probe {
        /// The node that was probed.
        host: String,
        /// Captured failure detail (exit code, stderr).
        detail: String,
    },

    /// The latest-version repository query failed or produced no usable output.
    #[error("could not resolve target version on '{host}': {detail}")]
    ResolveTarget {
        /// The node the query ran on.
        host: String,
        /// Captured failure detail.
        detail: String,
    },

    /// The service stop command exited non-zero.
    #[error("failed to stop service on '{host}': {detail}")]
    ServiceStop {
        /// The node being stopped.
        host: String,
        /// Captured failure detail.
        detail: String,
    },

    /// The service upgrade command exited non-zero.
    #[error("failed to upgrade service on '{host}': {detail}")]
    Upgrade {
        /// The node being upgraded.
        host: String,
        /// Captured failure detail.
        detail: String,
    },

    /// The operating system upgrade command exited non-zero.
    #[error("failed to upgrade operating system on '{host}': {detail}")]
    OsUpgrade {
        /// The node being upgraded.
        host: String,
        /// Captured failure detail.
        detail: String,
    },

    /// The service start command exited non-zero.
    ///
    /// This is the worst outcome: the node is stuck with its service
    /// stopped, so the run halts immediately.
    #[error("failed to start service on '{host}': {detail}")]
    ServiceStart {
        /// The node being started.
        host: String,
        /// Captured failure detail.
        detail: String,
    },

    /// The stability gate exhausted its attempts without observing a
    /// stable cluster.
    #[error("cluster did not report stable from '{host}' after {attempts} attempts")]
    Unstable {
        /// The node the stability checks ran from.
        host: String,
        /// How many check attempts were made.
        attempts: u32,
    },

    /// The remote transport itself failed (ssh could not be spawned or
    /// terminated abnormally).
    #[error("transport error for '{host}': {detail}")]
    Transport {
        /// The node the command was destined for.
        host: String,
        /// The underlying failure.
        detail: String,
    },
}

impl RollupError {
    /// Creates a malformed version error.
    #[must_use]
    pub fn malformed_version(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedVersion {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(host: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Transport {
            host: host.into(),
            detail: detail.into(),
        }
    }

    /// The state-machine step this error corresponds to, if any.
    ///
    /// Used by the report layer to say exactly where a node failed.
    #[must_use]
    pub fn step(&self) -> Option<UpgradeStep> {
        match self {
            Self::Probe { .. } => Some(UpgradeStep::Probe),
            Self::ServiceStop { .. } => Some(UpgradeStep::StopService),
            Self::Upgrade { .. } => Some(UpgradeStep::Upgrade),
            Self::OsUpgrade { .. } => Some(UpgradeStep::UpgradeOs),
            Self::ServiceStart { .. } => Some(UpgradeStep::StartService),
            Self::Unstable { .. } => Some(UpgradeStep::StabilityCheck),
            Self::MalformedVersion { .. } | Self::ResolveTarget { .. } | Self::Transport { .. } => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reports_failing_step() {
        let err = RollupError::ServiceStart {
            host: "db-2".to_string(),
            detail: "exit code 1".to_string(),
        };
        assert_eq!(err.step(), Some(UpgradeStep::StartService));
    }

    #[test]
    fn test_unstable_display() {
        let err = RollupError::Unstable {
            host: "db-1".to_string(),
            attempts: 60,
        };
        assert!(err.to_string().contains("db-1"));
        assert!(err.to_string().contains("60 attempts"));
    }
}
