//! The poll loop.
//!
//! Every cycle fetches the status changes since the watermark, validates the envelope, turns the
//! newest homework into a notification and delivers it unless it repeats the last one delivered
//! for that homework. The watermark follows the `current_date` of every response that made it
//! past the fetch, whatever happened afterwards.

use core::panic::AssertUnwindSafe;
use core::time::Duration;

use futures::FutureExt as _;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use crate::WatchError;
use crate::dedup::Deduplicator;
use crate::interfaces::{DeliverNotification, FetchStatuses};
use crate::snapshot::{Phase, SnapshotReader, StatusSnapshot};
use crate::translator::{Notification, translate};
use crate::validator::{Validation, current_date, validate};
use crate::watermark::Watermark;

/// Timing and delivery settings of the poll loop
#[derive(Debug, Clone, TypedBuilder)]
pub struct LoopSettings {
    /// Chat the notifications are sent to
    #[builder(setter(into))]
    pub channel_id: String,
    /// Pause after a cycle that reached the api
    pub poll_interval: Duration,
    /// Pause after a transient failure
    pub retry_interval: Duration,
    /// Deliver a report when the api response cannot be understood
    #[builder(default = true)]
    pub report_errors: bool,
}

/// What happened to a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered and recorded
    Sent,
    /// Same as the last one delivered for this subject
    Suppressed,
    /// The channel refused it; it will be tried again when seen next time
    Failed(WatchError),
    /// Error reports are disabled
    Skipped,
}

/// Result of a single cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing changed since the watermark
    NoNewStatus,
    /// The newest homework was translated
    Notified {
        /// The status-change message
        notification: Notification,
        /// What happened to it
        delivery: Delivery,
    },
    /// The response could not be understood
    ApplicationError {
        /// Why
        error: WatchError,
        /// What happened to the error report
        report: Delivery,
    },
    /// The api could not be reached or sent garbage; the watermark did not move
    TransientFailure(WatchError),
}

impl CycleOutcome {
    /// The next cycle should start after the retry interval
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(*self, Self::TransientFailure(_))
    }

    const fn error(&self) -> Option<&WatchError> {
        match *self {
            Self::NoNewStatus => None,
            Self::Notified { ref delivery, .. } => match *delivery {
                Delivery::Failed(ref err) => Some(err),
                Delivery::Sent | Delivery::Suppressed | Delivery::Skipped => None,
            },
            Self::ApplicationError { ref error, .. } | Self::TransientFailure(ref error) => {
                Some(error)
            }
        }
    }
}

/// Summary of a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// What happened
    pub outcome: CycleOutcome,
    /// `from_date` the cycle fetched with
    pub watermark_before: u64,
    /// `from_date` of the next cycle
    pub watermark_after: u64,
}

/// Owns the loop state: watermark and deduplicator
#[derive(Debug)]
pub struct Scheduler<F, N> {
    fetcher: F,
    notifier: N,
    settings: LoopSettings,
    watermark: Watermark,
    dedup: Deduplicator,
    status: watch::Sender<StatusSnapshot>,
}

impl<F, N> Scheduler<F, N>
where
    F: FetchStatuses,
    N: DeliverNotification,
{
    /// Create a scheduler whose first fetch starts at `initial_watermark`
    #[must_use]
    pub fn new(fetcher: F, notifier: N, settings: LoopSettings, initial_watermark: u64) -> Self {
        let (status, _) = watch::channel(StatusSnapshot::new(initial_watermark));
        Self {
            fetcher,
            notifier,
            settings,
            watermark: Watermark::new(initial_watermark),
            dedup: Deduplicator::new(),
            status,
        }
    }

    /// Reader for the status server
    #[must_use]
    pub fn snapshot_reader(&self, unhealthy_after_failures: usize) -> SnapshotReader {
        SnapshotReader::new(self.status.subscribe(), unhealthy_after_failures)
    }

    /// Current watermark
    #[must_use]
    pub const fn watermark(&self) -> u64 {
        self.watermark.get()
    }

    /// Run cycles until `cancel_token` is cancelled.
    ///
    /// A cycle in flight is allowed to finish; the pause between cycles is interrupted. A panic
    /// inside a cycle is logged and handled like a transient failure.
    pub async fn run(mut self, cancel_token: CancellationToken) {
        tracing::info!(
            watermark = self.watermark.get(),
            poll_interval = ?self.settings.poll_interval,
            "poll loop started"
        );
        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            let pause = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) if report.outcome.is_transient() => self.settings.retry_interval,
                Ok(_) => self.settings.poll_interval,
                Err(panic_err) => {
                    let panic_msg = if let Some(err) = panic_err.downcast_ref::<String>() {
                        err.clone()
                    } else if let Some(err) = panic_err.downcast_ref::<&str>() {
                        (*err).to_owned()
                    } else {
                        format!("Unknown panic: {panic_err:?}")
                    };
                    tracing::error!(%panic_msg, "poll cycle panicked");
                    self.status.send_modify(|snapshot| {
                        snapshot.cycles = snapshot.cycles.saturating_add(1);
                        snapshot.consecutive_failures =
                            snapshot.consecutive_failures.saturating_add(1);
                        snapshot.last_error = Some(panic_msg);
                    });
                    self.settings.retry_interval
                }
            };
            self.set_phase(Phase::Idle);

            tokio::select! {
                () = cancel_token.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }
        tracing::info!(watermark = self.watermark.get(), "poll loop stopped");
    }

    /// Run a single cycle
    #[tracing::instrument(skip(self), fields(from_date = self.watermark.get()))]
    pub async fn run_cycle(&mut self) -> CycleReport {
        let watermark_before = self.watermark.get();
        let outcome = self.poll().await;

        match outcome {
            CycleOutcome::NoNewStatus => tracing::debug!("no new status"),
            CycleOutcome::Notified {
                ref notification,
                ref delivery,
            } => tracing::debug!(subject = ?notification.fingerprint.subject, ?delivery, "status handled"),
            CycleOutcome::ApplicationError { ref report, .. } => {
                tracing::debug!(?report, "application error handled");
            }
            CycleOutcome::TransientFailure(ref err) => tracing::warn!(
                %err,
                retry_in = ?self.settings.retry_interval,
                "review api unavailable"
            ),
        }

        let transient = outcome.is_transient();
        let last_error = outcome.error().map(ToString::to_string);
        let watermark = self.watermark.get();
        let tracked_subjects = self.dedup.len();
        self.status.send_modify(|snapshot| {
            snapshot.cycles = snapshot.cycles.saturating_add(1);
            snapshot.watermark = watermark;
            snapshot.tracked_subjects = tracked_subjects;
            snapshot.consecutive_failures = if transient {
                snapshot.consecutive_failures.saturating_add(1)
            } else {
                0
            };
            if last_error.is_some() {
                snapshot.last_error = last_error;
            }
        });

        CycleReport {
            outcome,
            watermark_before,
            watermark_after: watermark,
        }
    }

    async fn poll(&mut self) -> CycleOutcome {
        self.set_phase(Phase::Fetching);
        let raw = match self.fetcher.fetch(self.watermark.get()).await {
            Ok(raw) => raw,
            Err(err) => return CycleOutcome::TransientFailure(err),
        };

        self.set_phase(Phase::Validating);
        let outcome = match validate(&raw) {
            Ok(Validation::NoNewStatus) => CycleOutcome::NoNewStatus,
            Ok(Validation::Items(items)) => {
                self.set_phase(Phase::Translating);
                match items.first().map(translate) {
                    None => CycleOutcome::NoNewStatus,
                    Some(Ok(notification)) => {
                        let delivery = self.deliver(&notification).await;
                        CycleOutcome::Notified {
                            notification,
                            delivery,
                        }
                    }
                    Some(Err(err)) => self.application_error(err).await,
                }
            }
            Err(err) if err.is_transient() => return CycleOutcome::TransientFailure(err),
            Err(err) => self.application_error(err).await,
        };

        if let Some(current_date) = current_date(&raw) {
            self.watermark.advance(current_date);
        }
        outcome
    }

    async fn application_error(&mut self, error: WatchError) -> CycleOutcome {
        tracing::error!(%error, "review api response could not be handled");
        let report = if self.settings.report_errors {
            self.deliver(&Notification::error_report(&error)).await
        } else {
            Delivery::Skipped
        };
        CycleOutcome::ApplicationError { error, report }
    }

    async fn deliver(&mut self, notification: &Notification) -> Delivery {
        if !self.dedup.should_send(&notification.fingerprint) {
            tracing::debug!(subject = ?notification.fingerprint.subject, "already delivered");
            return Delivery::Suppressed;
        }

        self.set_phase(Phase::Delivering);
        match self
            .notifier
            .deliver(&self.settings.channel_id, &notification.text)
            .await
        {
            Ok(()) => {
                tracing::info!(text = %notification.text, "notification delivered");
                self.dedup.record_sent(notification.fingerprint.clone());
                self.status.send_modify(|snapshot| {
                    snapshot.notifications_delivered =
                        snapshot.notifications_delivered.saturating_add(1);
                });
                Delivery::Sent
            }
            Err(err) => {
                tracing::error!(%err, "notification was not delivered");
                Delivery::Failed(err)
            }
        }
    }

    fn set_phase(&self, phase: Phase) {
        self.status.send_if_modified(|snapshot| {
            if snapshot.phase == phase {
                return false;
            }
            snapshot.phase = phase;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use review_api::types::RawResponse;
    use serde_json::json;
    use test_log::test;

    use super::*;
    use crate::dedup::{Fingerprint, Subject};

    const CHANNEL: &str = "123456";

    #[derive(Clone, Default)]
    struct FakeReviewApi {
        responses: Arc<Mutex<VecDeque<Result<RawResponse, WatchError>>>>,
        calls: Arc<Mutex<Vec<u64>>>,
        panic_once: Arc<AtomicBool>,
    }

    impl FakeReviewApi {
        fn with(responses: impl IntoIterator<Item = Result<RawResponse, WatchError>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into_iter().collect())),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<u64> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FetchStatuses for FakeReviewApi {
        async fn fetch(&self, from_date: u64) -> Result<RawResponse, WatchError> {
            self.calls.lock().unwrap().push(from_date);
            if self.panic_once.swap(false, Ordering::SeqCst) {
                panic!("review api fake exploded");
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(json!({ "homeworks": [] })))
        }
    }

    #[derive(Clone, Default)]
    struct FakeTelegram {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        failures: Arc<Mutex<VecDeque<WatchError>>>,
    }

    impl FakeTelegram {
        fn failing_once(err: WatchError) -> Self {
            Self {
                failures: Arc::new(Mutex::new(VecDeque::from([err]))),
                ..Self::default()
            }
        }

        fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text)| text.clone())
                .collect()
        }
    }

    impl DeliverNotification for FakeTelegram {
        async fn deliver(&self, channel_id: &str, text: &str) -> Result<(), WatchError> {
            let failure = self.failures.lock().unwrap().pop_front();
            if let Some(err) = failure {
                return Err(err);
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel_id.to_owned(), text.to_owned()));
            Ok(())
        }
    }

    fn settings() -> LoopSettings {
        LoopSettings::builder()
            .channel_id(CHANNEL)
            .poll_interval(Duration::from_secs(600))
            .retry_interval(Duration::from_secs(60))
            .build()
    }

    fn homework(id: u64, status: &str, current_date: u64) -> Result<RawResponse, WatchError> {
        Ok(json!({
            "homeworks": [{ "id": id, "homework_name": "hw1", "status": status }],
            "current_date": current_date
        }))
    }

    fn scheduler(
        api: &FakeReviewApi,
        telegram: &FakeTelegram,
        settings: LoopSettings,
    ) -> Scheduler<FakeReviewApi, FakeTelegram> {
        Scheduler::new(api.clone(), telegram.clone(), settings, 1_700_000_000)
    }

    #[test(tokio::test)]
    async fn test_empty_homeworks_advance_watermark() {
        let api = FakeReviewApi::with([Ok(
            json!({ "homeworks": [], "current_date": 1_700_000_100_u64 }),
        )]);
        let telegram = FakeTelegram::default();
        let mut scheduler = scheduler(&api, &telegram, settings());

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report,
            CycleReport {
                outcome: CycleOutcome::NoNewStatus,
                watermark_before: 1_700_000_000,
                watermark_after: 1_700_000_100,
            }
        );
        assert_eq!(api.calls(), vec![1_700_000_000]);
        assert!(telegram.texts().is_empty());
    }

    #[test(tokio::test)]
    async fn test_approved_is_delivered_once() {
        let api = FakeReviewApi::with([
            homework(1, "approved", 1_700_000_200),
            homework(1, "approved", 1_700_000_300),
        ]);
        let telegram = FakeTelegram::default();
        let mut scheduler = scheduler(&api, &telegram, settings());

        let first = scheduler.run_cycle().await;
        let second = scheduler.run_cycle().await;

        let expected = Notification {
            text: "Status changed for \"hw1\": The work has been reviewed: the reviewer liked everything. Hooray!".to_owned(),
            fingerprint: Fingerprint {
                subject: Subject::Item("1".to_owned()),
                digest: "approved".to_owned(),
            },
        };
        assert_eq!(
            first.outcome,
            CycleOutcome::Notified {
                notification: expected.clone(),
                delivery: Delivery::Sent,
            }
        );
        assert_eq!(
            second.outcome,
            CycleOutcome::Notified {
                notification: expected.clone(),
                delivery: Delivery::Suppressed,
            }
        );
        assert_eq!(second.watermark_after, 1_700_000_300);
        assert_eq!(
            telegram.sent.lock().unwrap().clone(),
            vec![(CHANNEL.to_owned(), expected.text)]
        );
    }

    #[test(tokio::test)]
    async fn test_unavailable_api_keeps_watermark() {
        let api = FakeReviewApi::with([Err(WatchError::EndpointUnavailable(
            "status 503".to_owned(),
        ))]);
        let telegram = FakeTelegram::default();
        let mut scheduler = scheduler(&api, &telegram, settings());
        let reader = scheduler.snapshot_reader(5);

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report,
            CycleReport {
                outcome: CycleOutcome::TransientFailure(WatchError::EndpointUnavailable(
                    "status 503".to_owned()
                )),
                watermark_before: 1_700_000_000,
                watermark_after: 1_700_000_000,
            }
        );
        assert!(telegram.texts().is_empty());
        let snapshot = reader.latest();
        assert_eq!(snapshot.consecutive_failures, 1);
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("review api endpoint is unavailable: status 503")
        );

        scheduler.run_cycle().await;
        assert_eq!(reader.latest().consecutive_failures, 0);
    }

    #[test(tokio::test)]
    async fn test_unknown_status_is_reported_and_loop_continues() {
        let api = FakeReviewApi::with([
            homework(1, "archived", 1_700_000_200),
            homework(1, "approved", 1_700_000_300),
        ]);
        let telegram = FakeTelegram::default();
        let mut scheduler = scheduler(&api, &telegram, settings());

        let first = scheduler.run_cycle().await;
        let second = scheduler.run_cycle().await;

        assert_eq!(
            first.outcome,
            CycleOutcome::ApplicationError {
                error: WatchError::UnknownStatus("archived".to_owned()),
                report: Delivery::Sent,
            }
        );
        assert_eq!(first.watermark_after, 1_700_000_200);
        assert!(matches!(
            second.outcome,
            CycleOutcome::Notified {
                delivery: Delivery::Sent,
                ..
            }
        ));
        assert_eq!(
            telegram.texts(),
            vec![
                "undocumented homework status `archived`".to_owned(),
                "Status changed for \"hw1\": The work has been reviewed: the reviewer liked everything. Hooray!".to_owned(),
            ]
        );
    }

    #[test(tokio::test)]
    async fn test_unknown_status_without_reports_sends_nothing() {
        let api = FakeReviewApi::with([homework(1, "archived", 1_700_000_200)]);
        let telegram = FakeTelegram::default();
        let settings = LoopSettings::builder()
            .channel_id(CHANNEL)
            .poll_interval(Duration::from_secs(600))
            .retry_interval(Duration::from_secs(60))
            .report_errors(false)
            .build();
        let mut scheduler = scheduler(&api, &telegram, settings);

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report.outcome,
            CycleOutcome::ApplicationError {
                error: WatchError::UnknownStatus("archived".to_owned()),
                report: Delivery::Skipped,
            }
        );
        assert_eq!(report.watermark_after, 1_700_000_200);
        assert!(telegram.texts().is_empty());
    }

    #[test(tokio::test)]
    async fn test_same_error_is_reported_once() {
        let api = FakeReviewApi::with([
            Ok(json!({ "current_date": 1_700_000_100_u64 })),
            Ok(json!({ "current_date": 1_700_000_200_u64 })),
            Ok(json!({ "homeworks": "oops", "current_date": 1_700_000_300_u64 })),
        ]);
        let telegram = FakeTelegram::default();
        let mut scheduler = scheduler(&api, &telegram, settings());

        let reports = [
            scheduler.run_cycle().await,
            scheduler.run_cycle().await,
            scheduler.run_cycle().await,
        ];

        let deliveries = reports
            .iter()
            .map(|report| match report.outcome {
                CycleOutcome::ApplicationError { ref report, .. } => report.clone(),
                ref other => panic!("unexpected outcome {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(
            deliveries,
            vec![Delivery::Sent, Delivery::Suppressed, Delivery::Sent]
        );
        assert_eq!(
            telegram.texts(),
            vec![
                "missing expected key `homeworks` in review api response".to_owned(),
                "unexpected shape of `homeworks` in review api response".to_owned(),
            ]
        );
        assert_eq!(scheduler.watermark(), 1_700_000_300);
    }

    #[test(tokio::test)]
    async fn test_non_object_body_is_retried_without_report() {
        let api = FakeReviewApi::with([
            Ok(json!((0..2000).collect::<Vec<u64>>())),
            Ok(json!([1, 2, 3])),
        ]);
        let telegram = FakeTelegram::default();
        let mut scheduler = scheduler(&api, &telegram, settings());
        let reader = scheduler.snapshot_reader(5);

        let first = scheduler.run_cycle().await;
        let second = scheduler.run_cycle().await;

        let expected = CycleReport {
            outcome: CycleOutcome::TransientFailure(WatchError::MalformedResponse(
                "expected a JSON object, got an array".to_owned(),
            )),
            watermark_before: 1_700_000_000,
            watermark_after: 1_700_000_000,
        };
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert!(telegram.texts().is_empty());
        let snapshot = reader.latest();
        assert_eq!(snapshot.consecutive_failures, 2);
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("malformed review api response: expected a JSON object, got an array")
        );
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_non_object_body_waits_retry_interval() {
        let api = FakeReviewApi::with([Ok(json!([]))]);
        let telegram = FakeTelegram::default();
        let scheduler = scheduler(&api, &telegram, settings());
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel_token.clone()));

        // t=0 malformed, t=60 retried, the next poll is at t=660
        tokio::time::sleep(Duration::from_secs(100)).await;
        cancel_token.cancel();
        handle.await.unwrap();

        assert_eq!(api.calls(), vec![1_700_000_000, 1_700_000_000]);
        assert!(telegram.texts().is_empty());
    }

    #[test(tokio::test)]
    async fn test_failed_delivery_is_retried_next_time() {
        let api = FakeReviewApi::with([
            homework(1, "reviewing", 1_700_000_200),
            homework(1, "reviewing", 1_700_000_300),
        ]);
        let telegram =
            FakeTelegram::failing_once(WatchError::DeliveryFailed("chat not found".to_owned()));
        let mut scheduler = scheduler(&api, &telegram, settings());
        let reader = scheduler.snapshot_reader(5);

        let first = scheduler.run_cycle().await;
        assert!(matches!(
            first.outcome,
            CycleOutcome::Notified {
                delivery: Delivery::Failed(WatchError::DeliveryFailed(_)),
                ..
            }
        ));
        assert_eq!(first.watermark_after, 1_700_000_200);
        assert_eq!(reader.latest().notifications_delivered, 0);

        let second = scheduler.run_cycle().await;
        assert!(matches!(
            second.outcome,
            CycleOutcome::Notified {
                delivery: Delivery::Sent,
                ..
            }
        ));
        assert_eq!(telegram.texts().len(), 1);
        assert_eq!(reader.latest().notifications_delivered, 1);
        assert_eq!(reader.latest().tracked_subjects, 1);
    }

    #[test(tokio::test)]
    async fn test_every_status_change_is_delivered() {
        let api = FakeReviewApi::with([
            homework(1, "reviewing", 1_700_000_100),
            homework(1, "rejected", 1_700_000_200),
            homework(1, "reviewing", 1_700_000_300),
            homework(1, "approved", 1_700_000_400),
        ]);
        let telegram = FakeTelegram::default();
        let mut scheduler = scheduler(&api, &telegram, settings());

        for _ in 0..4 {
            scheduler.run_cycle().await;
        }

        assert_eq!(
            telegram.texts(),
            vec![
                "Status changed for \"hw1\": The work has been taken for review by the reviewer.",
                "Status changed for \"hw1\": The work has been reviewed: the reviewer has comments.",
                "Status changed for \"hw1\": The work has been taken for review by the reviewer.",
                "Status changed for \"hw1\": The work has been reviewed: the reviewer liked everything. Hooray!",
            ]
        );
        assert_eq!(
            api.calls(),
            vec![1_700_000_000, 1_700_000_100, 1_700_000_200, 1_700_000_300]
        );
    }

    #[test(tokio::test)]
    async fn test_watermark_never_moves_backward() {
        let api = FakeReviewApi::with([
            Ok(json!({ "homeworks": [], "current_date": 100 })),
            Ok(json!({ "homeworks": [], "current_date": 50 })),
            Ok(json!({ "homeworks": [], "current_date": 200 })),
        ]);
        let telegram = FakeTelegram::default();
        let mut scheduler = Scheduler::new(api.clone(), telegram, settings(), 10);

        let mut watermarks = vec![scheduler.watermark()];
        for _ in 0..3 {
            watermarks.push(scheduler.run_cycle().await.watermark_after);
        }

        assert_eq!(watermarks, vec![10, 100, 100, 200]);
        assert_eq!(api.calls(), vec![10, 100, 100]);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_run_uses_poll_and_retry_intervals() {
        let api = FakeReviewApi::with([
            Err(WatchError::EndpointUnavailable("status 503".to_owned())),
            Ok(json!({ "homeworks": [], "current_date": 1_700_000_100_u64 })),
        ]);
        let telegram = FakeTelegram::default();
        let scheduler = scheduler(&api, &telegram, settings());
        let reader = scheduler.snapshot_reader(5);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel_token.clone()));

        // t=0 fails, t=60 succeeds, t=660 is the next poll
        tokio::time::sleep(Duration::from_secs(700)).await;
        cancel_token.cancel();
        handle.await.unwrap();

        assert_eq!(
            api.calls(),
            vec![1_700_000_000, 1_700_000_000, 1_700_000_100]
        );
        let snapshot = reader.latest();
        assert_eq!(snapshot.cycles, 3);
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_panic_in_cycle_is_survived() {
        let api = FakeReviewApi::default();
        api.panic_once.store(true, Ordering::SeqCst);
        let telegram = FakeTelegram::default();
        let scheduler = scheduler(&api, &telegram, settings());
        let reader = scheduler.snapshot_reader(1);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel_token.clone()));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let after_panic = reader.latest();
        assert_eq!(after_panic.consecutive_failures, 1);
        assert_eq!(
            after_panic.last_error.as_deref(),
            Some("review api fake exploded")
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        cancel_token.cancel();
        handle.await.unwrap();

        assert_eq!(api.calls().len(), 2);
        assert_eq!(reader.latest().consecutive_failures, 0);
    }

    #[test(tokio::test)]
    async fn test_cancelled_before_start_runs_nothing() {
        let api = FakeReviewApi::default();
        let telegram = FakeTelegram::default();
        let scheduler = scheduler(&api, &telegram, settings());
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();

        scheduler.run(cancel_token).await;

        assert!(api.calls().is_empty());
    }
}
