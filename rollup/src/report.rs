//! The run report.
//!
//! An append-only record of per-node outcomes, finalized when the run
//! ends or aborts. The report is what an operator sees: which node ended
//! where, and — on failure — exactly which step gave out.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::node::NodeOutcome;

/// Outcome record for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    /// The node's host identity.
    pub host: String,
    /// Terminal outcome.
    pub outcome: NodeOutcome,
    /// Human-readable detail (version transition, or the failing step
    /// and its error).
    pub detail: String,
}

/// Ordered per-node outcomes plus the overall verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Per-node records in processing order.
    pub records: Vec<NodeReport>,
    /// True only when every processed node succeeded and no node was
    /// left unattempted.
    pub success: bool,
}

impl RunReport {
    /// Creates an empty report for a run starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            records: Vec::new(),
            success: false,
        }
    }

    /// Appends a node record.
    pub fn push(&mut self, host: impl Into<String>, outcome: NodeOutcome, detail: impl Into<String>) {
        self.records.push(NodeReport {
            host: host.into(),
            outcome,
            detail: detail.into(),
        });
    }

    /// Marks the run as fully successful.
    pub fn finalize_success(&mut self) {
        self.success = true;
    }

    /// Whether any recorded node failed.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.records.iter().any(|r| r.outcome == NodeOutcome::Failed)
    }

    /// Process exit code for the CLI: 0 on full success, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.success)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run {} ({} nodes)", self.run_id, self.records.len())?;
        for record in &self.records {
            writeln!(f, "  {:<24} {:<18} {}", record.host, record.outcome.to_string(), record.detail)?;
        }
        if self.success {
            write!(f, "result: all nodes upgraded successfully")
        } else {
            write!(f, "result: run failed; remaining nodes were not attempted")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exit_code_mapping() {
        let mut report = RunReport::new();
        assert_eq!(report.exit_code(), 1);
        report.finalize_success();
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_has_failure() {
        let mut report = RunReport::new();
        report.push("db-1", NodeOutcome::Upgraded, "2.0.0 -> 2.1.0");
        assert!(!report.has_failure());
        report.push("db-2", NodeOutcome::Failed, "upgrade: exit code 1");
        assert!(report.has_failure());
    }

    #[test]
    fn test_display_lists_nodes_in_order() {
        let mut report = RunReport::new();
        report.push("db-1", NodeOutcome::Skipped, "already at 2.1.0");
        report.push("db-2", NodeOutcome::Upgraded, "2.0.0 -> 2.1.0");
        let rendered = report.to_string();
        let db1 = rendered.find("db-1").unwrap();
        let db2 = rendered.find("db-2").unwrap();
        assert!(db1 < db2);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut report = RunReport::new();
        report.push("db-1", NodeOutcome::Upgraded, "2.0.0 -> 2.1.0");
        report.finalize_success();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["records"][0]["outcome"], "upgraded");
        assert_eq!(json["success"], true);
    }
}
