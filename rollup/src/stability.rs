//! The cluster stability gate.
//!
//! After a node's service is restarted, the driver must not touch the next
//! node until the cluster is observed stable again from the restarted
//! node. The gate polls the configured check command with bounded retries;
//! exhausting the retries is a run-stopping failure, never a silent pass.
//! This is the property that keeps a bad upgrade from cascading into a
//! multi-node outage.
//!
//! Each check carries the anchor timestamp (the instant the start command
//! was issued), so stability events logged before the restart are never
//! accepted as evidence that the new incarnation stabilized.

use chrono::{DateTime, Utc};

use crate::config::StabilityConfig;
use crate::errors::RollupError;
use crate::executor::{CommandSpec, RemoteExecutor};

/// Polls cluster stability from one node until it passes or the retry
/// budget runs out.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    check_command: String,
    policy: StabilityConfig,
}

impl StabilityGate {
    /// Creates a gate around a check command and retry policy.
    #[must_use]
    pub fn new(check_command: impl Into<String>, policy: StabilityConfig) -> Self {
        Self {
            check_command: check_command.into(),
            policy,
        }
    }

    /// Blocks until the cluster reports stable as observed from `host`.
    ///
    /// Exit code 0 from the check command means stable; anything else
    /// means not yet. The anchor is attached to every invocation so the
    /// check only accepts evidence at-or-after the restart.
    ///
    /// # Errors
    ///
    /// Returns [`RollupError::Unstable`] when `max_attempts` checks all
    /// failed, and propagates transport errors from the executor.
    pub async fn wait_stable(
        &self,
        host: &str,
        anchor: DateTime<Utc>,
        executor: &dyn RemoteExecutor,
    ) -> Result<(), RollupError> {
        let command = CommandSpec::new(&self.check_command).with_anchor(anchor);

        for attempt in 1..=self.policy.max_attempts {
            let output = executor.execute(host, &command).await?;

            if output.success() {
                tracing::info!(host, attempt, "cluster reported stable");
                return Ok(());
            }

            tracing::debug!(
                host,
                attempt,
                max_attempts = self.policy.max_attempts,
                "cluster not stable yet"
            );

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.retry_delay()).await;
            }
        }

        Err(RollupError::Unstable {
            host: host.to_string(),
            attempts: self.policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecOutput, MockRemoteExecutor};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn policy(max_attempts: u32) -> StabilityConfig {
        StabilityConfig {
            max_attempts,
            retry_delay_ms: 5000,
        }
    }

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_when_check_eventually_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_mock = Arc::clone(&calls);

        let mut executor = MockRemoteExecutor::new();
        executor.expect_execute().returning(move |_, _| {
            let n = calls_in_mock.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Ok(ExecOutput::new(1, "", ""))
            } else {
                Ok(ExecOutput::ok())
            }
        });

        let gate = StabilityGate::new("check", policy(5));
        tokio_test::assert_ok!(gate.wait_stable("db-1", anchor(), &executor).await);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_unstable() {
        let mut executor = MockRemoteExecutor::new();
        executor
            .expect_execute()
            .times(4)
            .returning(|_, _| Ok(ExecOutput::new(1, "", "")));

        let gate = StabilityGate::new("check", policy(4));
        let err = gate.wait_stable("db-1", anchor(), &executor).await.unwrap_err();
        assert!(matches!(
            err,
            RollupError::Unstable { attempts: 4, ref host } if host == "db-1"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_check_carries_the_anchor() {
        let at = anchor();
        let mut executor = MockRemoteExecutor::new();
        executor
            .expect_execute()
            .withf(move |_, command| command.anchor() == Some(at))
            .times(3)
            .returning(|_, _| Ok(ExecOutput::new(1, "", "")));

        let gate = StabilityGate::new("grep after {service_start_time}", policy(3));
        let result = gate.wait_stable("db-1", at, &executor).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_propagates() {
        let mut executor = MockRemoteExecutor::new();
        executor
            .expect_execute()
            .returning(|host, _| Err(RollupError::transport(host, "spawn failed")));

        let gate = StabilityGate::new("check", policy(3));
        let err = gate.wait_stable("db-1", anchor(), &executor).await.unwrap_err();
        assert!(matches!(err, RollupError::Transport { .. }));
    }
}
