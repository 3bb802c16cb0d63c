//! Rollup CLI entry point.
//!
//! Thin plumbing over the library: parse arguments into an
//! [`UpgradeConfig`], build the ssh executor, run the driver, print the
//! report, and map the result to a process exit code.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rollup::prelude::*;

/// Performs a rolling upgrade of a clustered service.
#[derive(Parser, Debug)]
#[command(name = "rollup", version, about)]
struct Args {
    /// Comma-separated host names or IP addresses of the cluster nodes,
    /// in the order they should be upgraded.
    #[arg(short, long, required = true, value_delimiter = ',')]
    nodes: Vec<String>,

    /// A specific version to upgrade to, or 'latest' to use the highest
    /// version available in the repository. Nodes at an equal or higher
    /// version are skipped.
    #[arg(long, default_value = "latest")]
    target: String,

    /// Shell command to stop the service on a node.
    #[arg(long)]
    service_stop_command: Option<String>,

    /// Shell command to start the service on a node.
    #[arg(long)]
    service_start_command: Option<String>,

    /// Command to upgrade the service on a node.
    #[arg(long)]
    upgrade_command: Option<String>,

    /// Command printing the installed service version.
    #[arg(long)]
    version_probe_command: Option<String>,

    /// Command printing the highest version available in the repository.
    #[arg(long)]
    latest_version_command: Option<String>,

    /// Command checking whether the cluster reports stable; may contain
    /// the '{service_start_time}' anchor placeholder.
    #[arg(long)]
    check_stable_command: Option<String>,

    /// Command to upgrade the operating system.
    #[arg(long)]
    os_upgrade_command: Option<String>,

    /// Command to reboot a node.
    #[arg(long)]
    reboot_command: Option<String>,

    /// Also upgrade the operating system after upgrading the service.
    #[arg(long)]
    upgrade_system: bool,

    /// Reboot a node if an actual upgrade took place.
    #[arg(long)]
    reboot: bool,

    /// Always reboot a node, even when it was already at the target
    /// version.
    #[arg(long)]
    force_reboot: bool,

    /// Maximum stability check attempts per node.
    #[arg(long, default_value_t = 60)]
    stability_attempts: u32,

    /// Delay between stability checks, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    stability_delay_ms: u64,

    /// Extra arguments passed to every ssh invocation (repeatable).
    #[arg(long = "ssh-arg")]
    ssh_args: Vec<String>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Display more information while running.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<(UpgradeConfig, Vec<Node>, Vec<String>, bool)> {
        let mut config = UpgradeConfig::new()
            .with_target(VersionTarget::parse(&self.target)?)
            .with_upgrade_os(self.upgrade_system)
            .with_reboot(self.reboot)
            .with_force_reboot(self.force_reboot)
            .with_verbose(self.verbose)
            .with_stability(StabilityConfig {
                max_attempts: self.stability_attempts,
                retry_delay_ms: self.stability_delay_ms,
            });

        if let Some(command) = self.service_stop_command {
            config = config.with_service_stop_command(command);
        }
        if let Some(command) = self.service_start_command {
            config = config.with_service_start_command(command);
        }
        if let Some(command) = self.upgrade_command {
            config = config.with_upgrade_command(command);
        }
        if let Some(command) = self.version_probe_command {
            config = config.with_version_probe_command(command);
        }
        if let Some(command) = self.latest_version_command {
            config = config.with_latest_version_command(command);
        }
        if let Some(command) = self.check_stable_command {
            config = config.with_check_stable_command(command);
        }
        if let Some(command) = self.os_upgrade_command {
            config = config.with_os_upgrade_command(command);
        }
        if let Some(command) = self.reboot_command {
            config = config.with_reboot_command(command);
        }

        let nodes = self
            .nodes
            .iter()
            .map(|host| Node::new(host.trim()))
            .filter(|node| !node.host.is_empty())
            .collect();

        Ok((config, nodes, self.ssh_args, self.json))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "rollup=debug" } else { "rollup=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();

    let (config, mut nodes, ssh_args, json) = args.into_config()?;
    let executor = SshExecutor::new().with_ssh_args(ssh_args);

    let driver = RollingDriver::new(config);
    let report = driver.run(&mut nodes, &executor).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    std::process::exit(report.exit_code());
}
