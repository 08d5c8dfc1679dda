//! Read-only view of the poll loop for the status server.
//!
//! The scheduler owns the state and publishes a [`StatusSnapshot`] through a
//! [`tokio::sync::watch`] channel after every phase change. Readers only ever see copies.

use bin_util::health_check::{CheckHealth, ReportStatus};
use serde::Serialize;
use tokio::sync::watch;

/// Where the poll loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Sleeping between cycles
    Idle,
    /// Waiting for the review api
    Fetching,
    /// Checking the response envelope
    Validating,
    /// Building the notification text
    Translating,
    /// Waiting for the notification channel
    Delivering,
}

/// State of the poll loop as seen from the outside
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Current phase
    pub phase: Phase,
    /// `from_date` of the next fetch
    pub watermark: u64,
    /// Finished cycles, including failed ones
    pub cycles: u64,
    /// Transient failures since the last successful fetch
    pub consecutive_failures: usize,
    /// Notifications and error reports delivered so far
    pub notifications_delivered: u64,
    /// Subjects the deduplicator remembers
    pub tracked_subjects: usize,
    /// Last error seen by the loop
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    /// Snapshot of a loop that has not run yet
    #[must_use]
    pub const fn new(watermark: u64) -> Self {
        Self {
            phase: Phase::Idle,
            watermark,
            cycles: 0,
            consecutive_failures: 0,
            notifications_delivered: 0,
            tracked_subjects: 0,
            last_error: None,
        }
    }
}

/// Health and status view over the published snapshots
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    receiver: watch::Receiver<StatusSnapshot>,
    unhealthy_after_failures: usize,
}

impl SnapshotReader {
    /// Reader that turns unhealthy once `unhealthy_after_failures` transient failures happen in
    /// a row
    #[must_use]
    pub const fn new(
        receiver: watch::Receiver<StatusSnapshot>,
        unhealthy_after_failures: usize,
    ) -> Self {
        Self {
            receiver,
            unhealthy_after_failures,
        }
    }

    /// Copy of the latest snapshot
    #[must_use]
    pub fn latest(&self) -> StatusSnapshot {
        self.receiver.borrow().clone()
    }
}

impl CheckHealth for SnapshotReader {
    async fn check_health(&self) -> eyre::Result<()> {
        let failures = self.receiver.borrow().consecutive_failures;
        if failures >= self.unhealthy_after_failures {
            eyre::bail!("review api failed {failures} times in a row");
        }
        Ok(())
    }
}

impl ReportStatus for SnapshotReader {
    fn report_status(&self) -> serde_json::Value {
        serde_json::to_value(self.latest()).unwrap_or_else(|err| {
            tracing::error!(?err, "could not serialize status snapshot");
            serde_json::Value::Null
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_health_follows_consecutive_failures() {
        let (sender, receiver) = watch::channel(StatusSnapshot::new(0));
        let reader = SnapshotReader::new(receiver, 2);

        reader.check_health().await.unwrap();

        sender.send_modify(|snapshot| snapshot.consecutive_failures = 1);
        reader.check_health().await.unwrap();

        sender.send_modify(|snapshot| snapshot.consecutive_failures = 2);
        assert!(reader.check_health().await.is_err());

        sender.send_modify(|snapshot| snapshot.consecutive_failures = 0);
        reader.check_health().await.unwrap();
    }

    #[test]
    fn test_report_status() {
        let (sender, receiver) = watch::channel(StatusSnapshot::new(1_700_000_000));
        let reader = SnapshotReader::new(receiver, 5);
        sender.send_modify(|snapshot| {
            snapshot.phase = Phase::Fetching;
            snapshot.cycles = 3;
            snapshot.last_error = Some("review api endpoint is unavailable: 503".to_owned());
        });

        assert_eq!(
            reader.report_status(),
            json!({
                "phase": "fetching",
                "watermark": 1_700_000_000_u64,
                "cycles": 3,
                "consecutive_failures": 0,
                "notifications_delivered": 0,
                "tracked_subjects": 0,
                "last_error": "review api endpoint is unavailable: 503"
            })
        );
    }
}
