//! The rolling upgrade driver.
//!
//! Iterates the state machine over the ordered node list, one node at a
//! time. The ordering is the operator's declared safe sequencing and is
//! never reordered or parallelized: overlapping stop windows on two nodes
//! could take a majority of the cluster down at once. The first failed
//! node stops the run; nodes after it are never attempted and nodes
//! before it are not rolled back.


use crate::config::UpgradeConfig;
use crate::errors::RollupError;
use crate::executor::RemoteExecutor;
use crate::machine::UpgradeMachine;
use crate::node::{Node, NodeOutcome};
use crate::report::RunReport;
use crate::version::resolve_target;

/// Drives a whole rolling upgrade run.
#[derive(Debug, Clone)]
pub struct RollingDriver {
    config: UpgradeConfig,
}

impl RollingDriver {
    /// Creates a driver for the given configuration.
    #[must_use]
    pub fn new(config: UpgradeConfig) -> Self {
        Self { config }
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    /// Runs the rolling upgrade across `nodes`, strictly in order.
    ///
    /// Resolves the target version once (querying the first node when the
    /// target is `latest`), then processes each node to a terminal
    /// outcome before touching the next. Returns the finalized report;
    /// this method never panics or returns early without recording what
    /// happened.
    pub async fn run(&self, nodes: &mut [Node], executor: &dyn RemoteExecutor) -> RunReport {
        let mut report = RunReport::new();
        tracing::info!(run_id = %report.run_id, nodes = nodes.len(), "starting rolling upgrade");

        let Some(first) = nodes.first() else {
            tracing::warn!("node list is empty, nothing to do");
            report.finalize_success();
            return report;
        };

        let target = match resolve_target(&self.config, &first.host, executor).await {
            Ok(target) => target,
            Err(e) => {
                tracing::error!(error = %e, "could not resolve target version");
                report.push(first.host.clone(), NodeOutcome::Failed, failure_detail(&e));
                return report;
            }
        };

        let machine = UpgradeMachine::new(&self.config, target);

        for node in nodes.iter_mut() {
            match machine.upgrade_node(node, executor).await {
                Ok(result) => {
                    tracing::info!(
                        host = %node.host,
                        outcome = %result.outcome,
                        "node processed"
                    );
                    report.push(node.host.clone(), result.outcome, result.detail);
                }
                Err(e) => {
                    // An unverified node mid-sequence makes further
                    // disruption unsafe; stop here.
                    tracing::error!(host = %node.host, error = %e, "node failed, aborting run");
                    node.outcome = Some(NodeOutcome::Failed);
                    report.push(node.host.clone(), NodeOutcome::Failed, failure_detail(&e));
                    return report;
                }
            }
        }

        report.finalize_success();
        tracing::info!(run_id = %report.run_id, "all nodes upgraded successfully");
        report
    }
}

/// Renders an error as a report detail, prefixed with the failing step
/// when one is known.
fn failure_detail(error: &RollupError) -> String {
    match error.step() {
        Some(step) => format!("{step}: {error}"),
        None => error.to_string(),
    }
}
