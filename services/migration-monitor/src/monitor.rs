// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Completion loop
//!
//! Drives the poll/evaluate/sleep cycle against a running pipeline:
//!
//! 1. Fetch a metrics payload (a failure is recorded and evaluation skipped)
//! 2. Feed the parsed values into the [`ProgressTracker`]
//! 3. Stop and shut the pipeline down once the tracker is terminal
//! 4. Otherwise sleep, waking early if the monitor is cancelled
//!
//! The loop is one-shot: once terminated it never polls again.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use migration_monitor_types::{MetricKind, MigrationStatus, MonitorExit, MonitorReport};

use crate::controller::PipelineController;
use crate::exposition::parse_exposition;
use crate::metrics;
use crate::progress::ProgressTracker;
use crate::source::MetricsSource;

/// State of the completion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Polling,
    Terminated,
}

/// Polling driver that watches a pipeline until the migration ends.
pub struct CompletionLoop<S, C> {
    source: S,
    controller: C,
    tracker: ProgressTracker,
    poll_interval: Duration,
    state: LoopState,
    cycles: u64,
}

impl<S, C> CompletionLoop<S, C>
where
    S: MetricsSource,
    C: PipelineController,
{
    pub fn new(source: S, controller: C, tracker: ProgressTracker, poll_interval: Duration) -> Self {
        Self {
            source,
            controller,
            tracker,
            poll_interval,
            state: LoopState::Polling,
            cycles: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Run until the migration reaches a terminal state or `cancel` is set.
    ///
    /// A terminal state always triggers one shutdown request; its failure is
    /// logged and otherwise ignored. Cancellation returns without shutting
    /// the pipeline down.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> MonitorReport {
        info!(
            target_doc_count = self.tracker.target_doc_count(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "Starting migration completion monitor"
        );

        loop {
            if let Some(status) = self.poll_once().await {
                self.terminate(status).await;
                return self.report(MonitorExit::Terminal(status), true);
            }

            if self.sleep_or_cancel(&mut cancel).await {
                info!(cycles = self.cycles, "Migration monitor cancelled");
                return self.report(MonitorExit::Cancelled, false);
            }
        }
    }

    /// Run one cycle. Returns the terminal status if the migration has ended.
    pub async fn poll_once(&mut self) -> Option<MigrationStatus> {
        debug_assert_eq!(self.state, LoopState::Polling);
        self.cycles += 1;

        match self.source.fetch().await {
            Ok(payload) => {
                metrics::record_poll_ok();
                self.tracker.reset_metric_api_failure();
                self.apply_payload(&payload);
            }
            Err(e) => {
                metrics::record_poll_api_failure();
                self.tracker.record_metric_api_failure();
                warn!(
                    cycle = self.cycles,
                    error = %e,
                    consecutive_failures = self.tracker.snapshot().consecutive_metric_api_failures,
                    "Failed to fetch pipeline metrics"
                );
            }
        }

        if self.tracker.is_in_terminal_state() {
            return Some(self.tracker.status());
        }

        // The roll-forward only happens on cycles that did not end the run.
        self.tracker.advance_no_partitions_count();
        None
    }

    fn apply_payload(&mut self, payload: &str) {
        let sample = parse_exposition(payload);

        for kind in [MetricKind::RecordsInFlight, MetricKind::NoPartitionsAcquired] {
            if sample.get(kind).is_none() {
                metrics::record_missing_value(kind);
                debug!(cycle = self.cycles, metric = %kind, "Metric missing from payload");
            }
        }
        if sample.success_doc_count.is_none() {
            metrics::record_missing_value(MetricKind::DocumentsSuccess);
            warn!(
                cycle = self.cycles,
                "Document success count missing from metrics payload"
            );
        }

        self.tracker.update_success_doc_count(sample.success_doc_count);
        self.tracker.update_records_in_flight_count(sample.records_in_flight);
        self.tracker.update_no_partitions_count(sample.no_partitions_acquired_count);

        // One value failure per cycle. A missing document count was already
        // recorded by its update above.
        let other_missing =
            sample.records_in_flight.is_none() || sample.no_partitions_acquired_count.is_none();
        if sample.success_doc_count.is_some() && other_missing {
            self.tracker.record_success_doc_value_failure();
        }

        let percentage = self.tracker.doc_completion_percentage();
        metrics::record_completion_percentage(percentage);
        info!(
            cycle = self.cycles,
            completion_percentage = percentage,
            success_doc_count = ?sample.success_doc_count,
            records_in_flight = ?sample.records_in_flight,
            no_partitions_acquired = ?sample.no_partitions_acquired_count,
            "Migration progress"
        );
    }

    /// Sleep for one poll interval. Returns true if cancelled.
    async fn sleep_or_cancel(&self, cancel: &mut watch::Receiver<bool>) -> bool {
        if *cancel.borrow_and_update() {
            return true;
        }

        let sleep = tokio::time::sleep(self.poll_interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = cancel.changed() => match changed {
                    Ok(()) if *cancel.borrow_and_update() => return true,
                    Ok(()) => {}
                    Err(_) => {
                        // Sender dropped; nobody can cancel any more.
                        (&mut sleep).await;
                        return false;
                    }
                },
            }
        }
    }

    /// Move to `Terminated` and ask the pipeline to stop.
    async fn terminate(&mut self, status: MigrationStatus) {
        self.state = LoopState::Terminated;
        let snapshot = self.tracker.snapshot();

        match status {
            MigrationStatus::CompleteSuccess => info!(
                cycles = self.cycles,
                success_doc_count = ?snapshot.success_doc_count,
                "Migration complete, shutting down pipeline"
            ),
            MigrationStatus::Idle => warn!(
                cycles = self.cycles,
                completion_percentage = snapshot.completion_percentage,
                idle_cycles = snapshot.idle_streak_count,
                "Migration idle, shutting down pipeline"
            ),
            _ => warn!(
                cycles = self.cycles,
                consecutive_failures = snapshot.consecutive_metric_api_failures,
                status = %status,
                "Metrics endpoint unreachable, shutting down pipeline"
            ),
        }

        match self.controller.shutdown().await {
            Ok(()) => {
                metrics::record_shutdown(true);
                info!("Pipeline shutdown requested");
            }
            Err(e) => {
                metrics::record_shutdown(false);
                warn!(error = %e, "Pipeline shutdown request failed");
            }
        }
    }

    fn report(&self, exit: MonitorExit, shutdown_requested: bool) -> MonitorReport {
        MonitorReport {
            exit,
            cycles: self.cycles,
            shutdown_requested,
            progress: self.tracker.snapshot(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::controller::ControllerError;
    use crate::source::SourceError;

    /// Source that replays a fixed script of fetch results, then keeps
    /// returning the last one.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<String, String>>>,
        last: Mutex<Option<Result<String, String>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<String, String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MetricsSource for ScriptedSource {
        async fn fetch(&self) -> Result<String, SourceError> {
            let next = self.script.lock().unwrap().pop_front();
            let result = match next {
                Some(r) => {
                    *self.last.lock().unwrap() = Some(r.clone());
                    r
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Err("script empty".to_string())),
            };
            result.map_err(SourceError::Unavailable)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingController {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl PipelineController for RecordingController {
        async fn shutdown(&self) -> Result<(), ControllerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ControllerError::Status(503))
            } else {
                Ok(())
            }
        }
    }

    fn payload(docs: Option<u64>, in_flight: Option<u64>, no_partitions: Option<u64>) -> String {
        let mut out = String::new();
        if let Some(v) = docs {
            out.push_str(&format!("p_opensearch_documentsSuccess_total {v}\n"));
        }
        if let Some(v) = in_flight {
            out.push_str(&format!("p_BlockingBuffer_recordsInFlight {v}\n"));
        }
        if let Some(v) = no_partitions {
            out.push_str(&format!("p_noPartitionsAcquired_total {v}\n"));
        }
        out
    }

    fn monitor(
        script: Vec<Result<String, String>>,
        controller: RecordingController,
        idle_threshold: u32,
        api_failure_budget: u32,
    ) -> CompletionLoop<ScriptedSource, RecordingController> {
        let tracker = ProgressTracker::new(100, idle_threshold, api_failure_budget).unwrap();
        CompletionLoop::new(
            ScriptedSource::new(script),
            controller,
            tracker,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn completes_on_fourth_cycle_and_shuts_down() {
        let controller = RecordingController::default();
        let script = vec![
            Ok(payload(Some(50), Some(5), None)),
            Ok(payload(Some(100), Some(3), Some(1))),
            Ok(payload(Some(100), Some(0), Some(1))),
            Ok(payload(Some(100), Some(0), Some(2))),
        ];
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let report = monitor(script, controller.clone(), 5, 5).run(cancel_rx).await;

        assert_eq!(
            report.exit,
            MonitorExit::Terminal(MigrationStatus::CompleteSuccess)
        );
        assert_eq!(report.cycles, 4);
        assert!(report.shutdown_requested);
        assert_eq!(report.progress.completion_percentage, 100);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn frozen_doc_count_ends_idle() {
        let controller = RecordingController::default();
        let script = vec![Ok(payload(Some(10), Some(4), Some(0)))];
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let report = monitor(script, controller.clone(), 3, 5).run(cancel_rx).await;

        assert_eq!(report.exit, MonitorExit::Terminal(MigrationStatus::Idle));
        // One cycle to observe the count, three more to build the streak.
        assert_eq!(report.cycles, 4);
        assert_eq!(report.progress.completion_percentage, 10);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_not_fatal() {
        let controller = RecordingController::default();
        let script = vec![
            Err("connection refused".to_string()),
            Err("connection refused".to_string()),
            Ok(payload(Some(100), Some(0), Some(3))),
            Err("timeout".to_string()),
            Ok(payload(Some(100), Some(0), Some(4))),
        ];
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let report = monitor(script, controller.clone(), 10, 3).run(cancel_rx).await;

        assert_eq!(
            report.exit,
            MonitorExit::Terminal(MigrationStatus::CompleteSuccess)
        );
        assert_eq!(report.cycles, 5);
        assert_eq!(report.progress.consecutive_metric_api_failures, 0);
    }

    #[tokio::test]
    async fn exhausted_failure_budget_still_shuts_down() {
        let controller = RecordingController::default();
        let script = vec![
            Ok(payload(Some(20), Some(5), Some(0))),
            Err("connection refused".to_string()),
        ];
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let report = monitor(script, controller.clone(), 10, 3).run(cancel_rx).await;

        assert_eq!(report.exit, MonitorExit::Terminal(MigrationStatus::Failed));
        assert_eq!(report.cycles, 4);
        assert_eq!(report.progress.consecutive_metric_api_failures, 3);
        assert!(report.shutdown_requested);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_values_do_not_exhaust_failure_budget() {
        let controller = RecordingController::default();
        let script = vec![
            Ok(String::new()),
            Ok(String::new()),
            Ok(String::new()),
            Ok(payload(Some(1), Some(1), Some(0))),
        ];

        let mut m = monitor(script, controller, 10, 2);
        for _ in 0..3 {
            assert_eq!(m.poll_once().await, None);
        }
        let snapshot = m.tracker().snapshot();
        assert_eq!(snapshot.consecutive_metric_value_failures, 3);
        assert_eq!(snapshot.consecutive_metric_api_failures, 0);
        assert_eq!(m.state(), LoopState::Polling);
    }

    #[tokio::test]
    async fn missing_secondary_metrics_are_value_failures() {
        let script = vec![
            Ok(payload(Some(10), None, None)),
            Ok(payload(Some(20), Some(3), Some(0))),
        ];

        let mut m = monitor(script, RecordingController::default(), 10, 2);

        assert_eq!(m.poll_once().await, None);
        let snapshot = m.tracker().snapshot();
        assert_eq!(snapshot.success_doc_count, Some(10));
        assert_eq!(snapshot.consecutive_metric_value_failures, 1);
        assert_eq!(snapshot.consecutive_metric_api_failures, 0);

        assert_eq!(m.poll_once().await, None);
        assert_eq!(m.tracker().snapshot().consecutive_metric_value_failures, 0);
    }

    #[tokio::test]
    async fn failed_shutdown_does_not_change_outcome() {
        let controller = RecordingController {
            fail: true,
            ..Default::default()
        };
        let script = vec![
            Ok(payload(Some(100), Some(0), Some(1))),
            Ok(payload(Some(100), Some(0), Some(2))),
        ];
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let report = monitor(script, controller.clone(), 5, 5).run(cancel_rx).await;

        assert_eq!(
            report.exit,
            MonitorExit::Terminal(MigrationStatus::CompleteSuccess)
        );
        assert!(report.shutdown_requested);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn terminal_cycle_does_not_roll_no_partitions_forward() {
        let controller = RecordingController::default();
        let script = vec![
            Ok(payload(Some(100), Some(0), Some(1))),
            Ok(payload(Some(100), Some(0), Some(2))),
        ];

        let mut m = monitor(script, controller, 5, 5);
        assert_eq!(m.poll_once().await, None);
        assert_eq!(
            m.poll_once().await,
            Some(MigrationStatus::CompleteSuccess)
        );
        // Still complete: the previous reading was kept at 1.
        assert!(m.tracker().is_migration_complete_success());
    }

    #[tokio::test]
    async fn cancellation_interrupts_sleep_without_shutdown() {
        let controller = RecordingController::default();
        let script = vec![Ok(payload(Some(1), Some(5), Some(0)))];
        let tracker = ProgressTracker::new(100, 1000, 5).unwrap();
        let m = CompletionLoop::new(
            ScriptedSource::new(script),
            controller.clone(),
            tracker,
            Duration::from_secs(3600),
        );
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(m.run(cancel_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_tx.send(true).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop should stop promptly")
            .unwrap();

        assert_eq!(report.exit, MonitorExit::Cancelled);
        assert!(!report.shutdown_requested);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn already_cancelled_stops_after_first_cycle() {
        let controller = RecordingController::default();
        let script = vec![Ok(payload(Some(1), Some(5), Some(0)))];
        let (_cancel_tx, cancel_rx) = watch::channel(true);

        let report = monitor(script, controller.clone(), 5, 5).run(cancel_rx).await;

        assert_eq!(report.exit, MonitorExit::Cancelled);
        assert_eq!(report.cycles, 1);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 0);
    }
}
