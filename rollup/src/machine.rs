//! The per-node upgrade state machine.
//!
//! Sequences one node through version-check, service-stop, upgrade,
//! service-start, stability gate, and the reboot decision. Every step is
//! attempt-once: a non-zero exit is fatal for the node and therefore for
//! the run. The only retries in the system live inside the stability
//! gate.

use chrono::Utc;

use crate::config::UpgradeConfig;
use crate::errors::RollupError;
use crate::executor::{CommandSpec, ExecOutput, RemoteExecutor};
use crate::node::{Node, NodeOutcome};
use crate::stability::StabilityGate;
use crate::version::Version;

/// Terminal result of one state-machine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeResult {
    /// The node's terminal outcome.
    pub outcome: NodeOutcome,
    /// Human-readable summary for the run report.
    pub detail: String,
}

impl NodeResult {
    fn new(outcome: NodeOutcome, detail: impl Into<String>) -> Self {
        Self {
            outcome,
            detail: detail.into(),
        }
    }
}

/// Drives a single node through the upgrade sequence.
pub struct UpgradeMachine<'a> {
    config: &'a UpgradeConfig,
    target: Version,
    gate: StabilityGate,
}

impl<'a> UpgradeMachine<'a> {
    /// Creates a machine for a resolved target version.
    #[must_use]
    pub fn new(config: &'a UpgradeConfig, target: Version) -> Self {
        let gate = StabilityGate::new(&config.check_stable_command, config.stability.clone());
        Self {
            config,
            target,
            gate,
        }
    }

    /// The version this machine upgrades towards.
    #[must_use]
    pub fn target(&self) -> &Version {
        &self.target
    }

    /// Processes one node to a terminal outcome.
    ///
    /// Mutates only the node's observed version, anchor, and outcome.
    ///
    /// # Errors
    ///
    /// Any step error is returned as-is; the caller records the node as
    /// failed and aborts the run.
    pub async fn upgrade_node(
        &self,
        node: &mut Node,
        executor: &dyn RemoteExecutor,
    ) -> Result<NodeResult, RollupError> {
        tracing::info!(host = %node.host, target = %self.target, "processing node");

        let installed = self.probe_version(node, executor).await?;
        node.installed = Some(installed.clone());

        let result = if installed >= self.target {
            self.skip_node(node, &installed, executor).await?
        } else {
            tracing::info!(
                host = %node.host,
                installed = %installed,
                target = %self.target,
                "installed version is lower than target, upgrading"
            );
            self.run_upgrade(node, &installed, executor).await?
        };

        node.outcome = Some(result.outcome);
        Ok(result)
    }

    /// Queries the node's installed version.
    async fn probe_version(
        &self,
        node: &Node,
        executor: &dyn RemoteExecutor,
    ) -> Result<Version, RollupError> {
        let output = executor
            .execute(&node.host, &CommandSpec::new(&self.config.version_probe_command))
            .await?;

        if !output.success() {
            return Err(RollupError::Probe {
                host: node.host.clone(),
                detail: output.failure_detail(),
            });
        }

        let line = output.stdout.lines().next().unwrap_or("").trim();
        Version::parse(line)
    }

    /// The skip path: the node is already at or above the target.
    ///
    /// No service disruption occurs, but an OS upgrade and a forced
    /// reboot can still be requested.
    async fn skip_node(
        &self,
        node: &Node,
        installed: &Version,
        executor: &dyn RemoteExecutor,
    ) -> Result<NodeResult, RollupError> {
        tracing::info!(
            host = %node.host,
            installed = %installed,
            target = %self.target,
            "skipping upgrade, node is already current"
        );

        let mut os_upgraded = false;
        if self.config.upgrade_os {
            os_upgraded = self.upgrade_os(node, executor).await?;
        }

        let mut detail = format!("already at {installed}");
        if self.config.force_reboot || (self.config.reboot && os_upgraded) {
            self.issue_reboot(node, executor).await?;
            detail.push_str(", reboot issued");
        }

        Ok(NodeResult::new(NodeOutcome::Skipped, detail))
    }

    /// The full upgrade path: stop, upgrade, start, verify, maybe reboot.
    async fn run_upgrade(
        &self,
        node: &mut Node,
        installed: &Version,
        executor: &dyn RemoteExecutor,
    ) -> Result<NodeResult, RollupError> {
        tracing::info!(host = %node.host, "stopping service");
        let output = executor
            .execute(&node.host, &CommandSpec::new(&self.config.service_stop_command))
            .await?;
        if !output.success() {
            return Err(RollupError::ServiceStop {
                host: node.host.clone(),
                detail: output.failure_detail(),
            });
        }

        tracing::info!(host = %node.host, "upgrading service");
        let output = executor
            .execute(&node.host, &CommandSpec::new(&self.config.upgrade_command))
            .await?;
        if !output.success() {
            return Err(RollupError::Upgrade {
                host: node.host.clone(),
                detail: output.failure_detail(),
            });
        }
        let service_upgraded = !output.stdout.contains(&self.config.upgrade_noop_marker);
        self.log_output(&output);

        let mut os_upgraded = false;
        if self.config.upgrade_os {
            os_upgraded = self.upgrade_os(node, executor).await?;
        }

        // The anchor is taken when the start command is issued, so the
        // stability check only accepts evidence from the new incarnation.
        let anchor = Utc::now();
        node.anchor = Some(anchor);

        tracing::info!(host = %node.host, "starting service");
        let output = executor
            .execute(&node.host, &CommandSpec::new(&self.config.service_start_command))
            .await?;
        if !output.success() {
            return Err(RollupError::ServiceStart {
                host: node.host.clone(),
                detail: output.failure_detail(),
            });
        }

        tracing::info!(host = %node.host, "waiting for the cluster to report stable");
        self.gate.wait_stable(&node.host, anchor, executor).await?;

        let detail = format!("{installed} -> {}", self.target);
        if self.config.force_reboot || (self.config.reboot && (service_upgraded || os_upgraded)) {
            self.issue_reboot(node, executor).await?;
            return Ok(NodeResult::new(
                NodeOutcome::UpgradedRebooted,
                format!("{detail}, reboot issued"),
            ));
        }

        Ok(NodeResult::new(NodeOutcome::Upgraded, detail))
    }

    /// Runs the OS upgrade command; returns whether anything was actually
    /// installed.
    async fn upgrade_os(
        &self,
        node: &Node,
        executor: &dyn RemoteExecutor,
    ) -> Result<bool, RollupError> {
        tracing::info!(host = %node.host, "upgrading operating system");
        let output = executor
            .execute(&node.host, &CommandSpec::new(&self.config.os_upgrade_command))
            .await?;
        if !output.success() {
            return Err(RollupError::OsUpgrade {
                host: node.host.clone(),
                detail: output.failure_detail(),
            });
        }
        self.log_output(&output);

        let upgraded = !output.stdout.contains(&self.config.os_upgrade_noop_marker);
        if !upgraded {
            tracing::info!(host = %node.host, "no operating system upgrades available");
        }
        Ok(upgraded)
    }

    /// Issues the reboot command without waiting for the node to return.
    ///
    /// The connection usually drops mid-shutdown, so a non-zero exit is
    /// logged but not treated as a failure.
    async fn issue_reboot(
        &self,
        node: &Node,
        executor: &dyn RemoteExecutor,
    ) -> Result<(), RollupError> {
        tracing::info!(host = %node.host, "rebooting node");
        let output = executor
            .execute(&node.host, &CommandSpec::new(&self.config.reboot_command))
            .await?;
        if !output.success() {
            tracing::warn!(
                host = %node.host,
                detail = %output.failure_detail(),
                "reboot command did not exit cleanly"
            );
        }
        Ok(())
    }

    fn log_output(&self, output: &ExecOutput) {
        if self.config.verbose {
            tracing::debug!(stdout = %output.stdout, stderr = %output.stderr, "command output");
        }
    }
}
