//! # Rollup
//!
//! Rolling, zero-downtime version upgrades for clustered services.
//!
//! Rollup walks an ordered list of cluster nodes and, for each one in
//! turn: checks the installed version, takes the node out of service,
//! upgrades it, brings it back, and blocks until the cluster is observed
//! stable again before touching the next node. Nodes already at or above
//! the target are skipped, so a run is idempotent.
//!
//! - **Sequential by design**: at most one node is ever out of service;
//!   the node order is the operator's declared safe sequencing.
//! - **Fail-stop**: any unverified step aborts the whole run; there is no
//!   rollback and no silent continuation past an unstable cluster.
//! - **Command-agnostic**: stopping, starting, upgrading, and checking
//!   stability are opaque shell commands supplied by configuration and
//!   run over ssh.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rollup::prelude::*;
//!
//! let config = UpgradeConfig::new()
//!     .with_target(VersionTarget::parse("2.1.0")?)
//!     .with_reboot(true);
//!
//! let driver = RollingDriver::new(config);
//! let mut nodes = vec![Node::new("db-1"), Node::new("db-2")];
//! let report = driver.run(&mut nodes, &SshExecutor::new()).await;
//! std::process::exit(report.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod machine;
pub mod node;
pub mod report;
pub mod stability;
pub mod testing;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{StabilityConfig, UpgradeConfig};
    pub use crate::driver::RollingDriver;
    pub use crate::errors::RollupError;
    pub use crate::executor::{CommandSpec, ExecOutput, RemoteExecutor, SshExecutor};
    pub use crate::machine::{NodeResult, UpgradeMachine};
    pub use crate::node::{Node, NodeOutcome, UpgradeStep};
    pub use crate::report::{NodeReport, RunReport};
    pub use crate::stability::StabilityGate;
    pub use crate::version::{resolve_target, Version, VersionTarget};
}
