//! Run configuration.
//!
//! An [`UpgradeConfig`] is resolved once before the run begins and is
//! read-only thereafter. The command strings are opaque to the core: the
//! defaults target a yum/systemd CouchDB install, but any service can be
//! driven by overriding them. Platform-specific command content lives
//! here, never in the state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::version::VersionTarget;

/// Default command to stop the service on a node.
pub const DEFAULT_SERVICE_STOP: &str = "sudo systemctl stop couchdb";

/// Default command to start the service on a node.
pub const DEFAULT_SERVICE_START: &str = "sudo systemctl start couchdb";

/// Default command to upgrade the service package.
pub const DEFAULT_UPGRADE: &str = "sudo yum clean all && sudo yum install -y couchdb";

/// Default command to query the installed service version.
pub const DEFAULT_VERSION_PROBE: &str = "rpm -q --queryformat '%{VERSION}' couchdb";

/// Default command to query the highest version available in the repository.
pub const DEFAULT_LATEST_VERSION: &str = "sudo yum clean all >/dev/null 2>&1 && yum list all couchdb |\
 grep couchdb | awk '{ print $2 }' | cut -d '-' -f1 |\
 sort --version-sort -r | head -n 1";

/// Default command to check whether the cluster reports stable, anchored
/// to the service start time so stale log entries never count.
pub const DEFAULT_CHECK_STABLE: &str = "stable=$(grep 'publish cluster `stable` event' \
/var/log/couchdb/couchdb.log | while read -r line; do timestamp=$(echo $line | awk '{ print $2 }'); \
if [ \"$(date -d\"$timestamp\" +'%Y%m%d%H%M%S')\" -ge \"{service_start_time}\" ]; \
then echo 'yes'; fi; done); if [ \"$stable\" != \"yes\" ]; then exit 1; fi";

/// Default command to upgrade the operating system.
pub const DEFAULT_OS_UPGRADE: &str = "sudo yum clean all && sudo yum update -y";

/// Default command to reboot a node.
pub const DEFAULT_REBOOT: &str = "sudo /sbin/shutdown -r now";

/// Stdout marker meaning the upgrade command found nothing to install.
pub const DEFAULT_UPGRADE_NOOP_MARKER: &str = "Nothing to do";

/// Stdout marker meaning the OS upgrade found nothing to install.
pub const DEFAULT_OS_UPGRADE_NOOP_MARKER: &str = "No packages marked for update";

/// Bounded-retry policy for the stability gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Maximum number of check attempts before giving up.
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            retry_delay_ms: 5000,
        }
    }
}

impl StabilityConfig {
    /// The delay between attempts as a [`Duration`].
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Configuration for a rolling upgrade run.
///
/// Value semantics; resolved once before the run and treated as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Version to upgrade to, or `latest`.
    pub target: VersionTarget,
    /// Command to stop the service.
    pub service_stop_command: String,
    /// Command to start the service.
    pub service_start_command: String,
    /// Command to upgrade the service package.
    pub upgrade_command: String,
    /// Command to query the installed version; its first stdout line must
    /// be a version string.
    pub version_probe_command: String,
    /// Command to query the highest available version; its trimmed stdout
    /// must be a single version string.
    pub latest_version_command: String,
    /// Command to check cluster stability; may contain the anchor
    /// placeholder `{service_start_time}`.
    pub check_stable_command: String,
    /// Command to upgrade the operating system.
    pub os_upgrade_command: String,
    /// Command to reboot a node.
    pub reboot_command: String,
    /// Stdout substring meaning the upgrade installed nothing.
    pub upgrade_noop_marker: String,
    /// Stdout substring meaning the OS upgrade installed nothing.
    pub os_upgrade_noop_marker: String,
    /// Also upgrade the operating system after the service.
    pub upgrade_os: bool,
    /// Reboot a node if an actual upgrade took place.
    pub reboot: bool,
    /// Always reboot a node, even when nothing was upgraded.
    pub force_reboot: bool,
    /// Emit more detail while running.
    pub verbose: bool,
    /// Stability gate retry policy.
    pub stability: StabilityConfig,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            target: VersionTarget::Latest,
            service_stop_command: DEFAULT_SERVICE_STOP.to_string(),
            service_start_command: DEFAULT_SERVICE_START.to_string(),
            upgrade_command: DEFAULT_UPGRADE.to_string(),
            version_probe_command: DEFAULT_VERSION_PROBE.to_string(),
            latest_version_command: DEFAULT_LATEST_VERSION.to_string(),
            check_stable_command: DEFAULT_CHECK_STABLE.to_string(),
            os_upgrade_command: DEFAULT_OS_UPGRADE.to_string(),
            reboot_command: DEFAULT_REBOOT.to_string(),
            upgrade_noop_marker: DEFAULT_UPGRADE_NOOP_MARKER.to_string(),
            os_upgrade_noop_marker: DEFAULT_OS_UPGRADE_NOOP_MARKER.to_string(),
            upgrade_os: false,
            reboot: false,
            force_reboot: false,
            verbose: false,
            stability: StabilityConfig::default(),
        }
    }
}

impl UpgradeConfig {
    /// Creates a config with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the upgrade target.
    #[must_use]
    pub fn with_target(mut self, target: VersionTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the service stop command.
    #[must_use]
    pub fn with_service_stop_command(mut self, command: impl Into<String>) -> Self {
        self.service_stop_command = command.into();
        self
    }

    /// Sets the service start command.
    #[must_use]
    pub fn with_service_start_command(mut self, command: impl Into<String>) -> Self {
        self.service_start_command = command.into();
        self
    }

    /// Sets the upgrade command.
    #[must_use]
    pub fn with_upgrade_command(mut self, command: impl Into<String>) -> Self {
        self.upgrade_command = command.into();
        self
    }

    /// Sets the installed-version probe command.
    #[must_use]
    pub fn with_version_probe_command(mut self, command: impl Into<String>) -> Self {
        self.version_probe_command = command.into();
        self
    }

    /// Sets the latest-version query command.
    #[must_use]
    pub fn with_latest_version_command(mut self, command: impl Into<String>) -> Self {
        self.latest_version_command = command.into();
        self
    }

    /// Sets the stability check command.
    #[must_use]
    pub fn with_check_stable_command(mut self, command: impl Into<String>) -> Self {
        self.check_stable_command = command.into();
        self
    }

    /// Sets the OS upgrade command.
    #[must_use]
    pub fn with_os_upgrade_command(mut self, command: impl Into<String>) -> Self {
        self.os_upgrade_command = command.into();
        self
    }

    /// Sets the reboot command.
    #[must_use]
    pub fn with_reboot_command(mut self, command: impl Into<String>) -> Self {
        self.reboot_command = command.into();
        self
    }

    /// Enables the OS upgrade step.
    #[must_use]
    pub fn with_upgrade_os(mut self, enabled: bool) -> Self {
        self.upgrade_os = enabled;
        self
    }

    /// Enables rebooting after an actual upgrade.
    #[must_use]
    pub fn with_reboot(mut self, enabled: bool) -> Self {
        self.reboot = enabled;
        self
    }

    /// Enables rebooting regardless of whether anything was upgraded.
    #[must_use]
    pub fn with_force_reboot(mut self, enabled: bool) -> Self {
        self.force_reboot = enabled;
        self
    }

    /// Sets the verbosity flag.
    #[must_use]
    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Sets the stability gate policy.
    #[must_use]
    pub fn with_stability(mut self, stability: StabilityConfig) -> Self {
        self.stability = stability;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_couchdb_yum_platform() {
        let config = UpgradeConfig::default();
        assert_eq!(config.service_stop_command, DEFAULT_SERVICE_STOP);
        assert_eq!(config.target, VersionTarget::Latest);
        assert_eq!(config.stability.max_attempts, 60);
        assert_eq!(config.stability.retry_delay(), Duration::from_secs(5));
        assert!(!config.reboot);
    }

    #[test]
    fn test_builder_chain() {
        let config = UpgradeConfig::new()
            .with_upgrade_command("apt-get install -y couchdb")
            .with_reboot(true)
            .with_stability(StabilityConfig {
                max_attempts: 3,
                retry_delay_ms: 100,
            });
        assert_eq!(config.upgrade_command, "apt-get install -y couchdb");
        assert!(config.reboot);
        assert_eq!(config.stability.max_attempts, 3);
    }

    #[test]
    fn test_check_stable_default_carries_anchor_placeholder() {
        let config = UpgradeConfig::default();
        assert!(config.check_stable_command.contains("{service_start_time}"));
    }
}
