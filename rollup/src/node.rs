//! Node identity, per-node state, and outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Terminal outcome of processing one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Already at or above the target; no service disruption occurred.
    Skipped,
    /// Upgraded, restarted, and observed stable.
    Upgraded,
    /// Upgraded and then rebooted.
    UpgradedRebooted,
    /// A step failed; the run stops here.
    Failed,
}

impl NodeOutcome {
    /// Whether this outcome allows the driver to continue to the next node.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl fmt::Display for NodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Upgraded => write!(f, "upgraded"),
            Self::UpgradedRebooted => write!(f, "upgraded+rebooted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Steps of the per-node upgrade sequence, used to report where a node
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStep {
    /// Querying the installed version.
    Probe,
    /// Stopping the service.
    StopService,
    /// Running the service upgrade command.
    Upgrade,
    /// Running the OS upgrade command.
    UpgradeOs,
    /// Starting the service.
    StartService,
    /// Waiting for the cluster to report stable.
    StabilityCheck,
    /// Issuing the reboot command.
    Reboot,
}

impl fmt::Display for UpgradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe => write!(f, "probe"),
            Self::StopService => write!(f, "stop-service"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::UpgradeOs => write!(f, "upgrade-os"),
            Self::StartService => write!(f, "start-service"),
            Self::StabilityCheck => write!(f, "stability-check"),
            Self::Reboot => write!(f, "reboot"),
        }
    }
}

/// One cluster member.
///
/// Owned by the driver for the duration of the run. The state machine
/// receives it `&mut` and touches only the observed version, the anchor,
/// and the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Hostname or IP address.
    pub host: String,
    /// Version observed at state-machine entry.
    pub installed: Option<Version>,
    /// Instant the service start command was issued; anchors the
    /// stability gate.
    pub anchor: Option<DateTime<Utc>>,
    /// Terminal outcome, set exactly once.
    pub outcome: Option<NodeOutcome>,
}

impl Node {
    /// Creates a node with nothing observed yet.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            installed: None,
            anchor: None,
            outcome: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_classification() {
        assert!(NodeOutcome::Skipped.is_success());
        assert!(NodeOutcome::Upgraded.is_success());
        assert!(NodeOutcome::UpgradedRebooted.is_success());
        assert!(!NodeOutcome::Failed.is_success());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(UpgradeStep::StabilityCheck.to_string(), "stability-check");
    }
}
