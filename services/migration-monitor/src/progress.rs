// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Migration progress tracking
//!
//! [`ProgressTracker`] turns a stream of metric observations into a
//! [`MigrationStatus`]. It performs no I/O; the completion loop feeds it one
//! cycle at a time.

use std::num::{NonZeroU32, NonZeroU64};

use thiserror::Error;

use migration_monitor_types::{MigrationStatus, ProgressSnapshot};

/// Default number of consecutive unchanged document counts before the
/// migration is considered idle.
pub const DEFAULT_IDLE_THRESHOLD: u32 = 5;

/// Default number of consecutive failed fetches before the migration is
/// considered failed.
pub const DEFAULT_API_FAILURE_BUDGET: u32 = 5;

/// Progress tracker errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Target document count must be greater than zero")]
    InvalidTargetDocCount,

    #[error("Idle threshold must be greater than zero")]
    InvalidIdleThreshold,

    #[error("API failure budget must be greater than zero")]
    InvalidApiFailureBudget,
}

/// Accumulated decision state for one migration run.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    target_doc_count: NonZeroU64,
    idle_threshold: NonZeroU32,
    api_failure_budget: NonZeroU32,

    last_success_doc_count: Option<u64>,
    idle_streak_count: u32,
    records_in_flight: Option<u64>,
    no_partitions_count: Option<u64>,
    prev_no_partitions_count: Option<u64>,
    consecutive_metric_api_failures: u32,
    consecutive_metric_value_failures: u32,
}

impl ProgressTracker {
    /// Create a tracker for a migration expected to move `target_doc_count`
    /// documents.
    ///
    /// All three limits must be non-zero; a zero threshold or budget would
    /// make a fresh tracker terminal before the first poll.
    pub fn new(
        target_doc_count: u64,
        idle_threshold: u32,
        api_failure_budget: u32,
    ) -> Result<Self, TrackerError> {
        let target_doc_count =
            NonZeroU64::new(target_doc_count).ok_or(TrackerError::InvalidTargetDocCount)?;
        let idle_threshold =
            NonZeroU32::new(idle_threshold).ok_or(TrackerError::InvalidIdleThreshold)?;
        let api_failure_budget =
            NonZeroU32::new(api_failure_budget).ok_or(TrackerError::InvalidApiFailureBudget)?;

        Ok(Self {
            target_doc_count,
            idle_threshold,
            api_failure_budget,
            last_success_doc_count: None,
            idle_streak_count: 0,
            records_in_flight: None,
            no_partitions_count: None,
            prev_no_partitions_count: None,
            consecutive_metric_api_failures: 0,
            consecutive_metric_value_failures: 0,
        })
    }

    pub fn target_doc_count(&self) -> u64 {
        self.target_doc_count.get()
    }

    // ------------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------------

    /// Record this cycle's successful document count.
    ///
    /// A missing value counts as a value failure and leaves the last count
    /// untouched. A repeated value extends the idle streak; a new value
    /// resets it.
    pub fn update_success_doc_count(&mut self, value: Option<u64>) {
        let Some(count) = value else {
            self.record_success_doc_value_failure();
            return;
        };

        self.consecutive_metric_value_failures = 0;
        if self.last_success_doc_count == Some(count) {
            self.idle_streak_count = self.idle_streak_count.saturating_add(1);
        } else {
            self.idle_streak_count = 0;
            self.last_success_doc_count = Some(count);
        }
    }

    /// Record this cycle's records-in-flight reading, including its absence.
    pub fn update_records_in_flight_count(&mut self, value: Option<u64>) {
        self.records_in_flight = value;
    }

    /// Record this cycle's no-partitions-acquired reading.
    ///
    /// The reading is compared against the previous cycle's value when the
    /// tracker is classified. The caller rolls it forward with
    /// [`advance_no_partitions_count`](Self::advance_no_partitions_count)
    /// once the cycle is known not to be terminal.
    pub fn update_no_partitions_count(&mut self, value: Option<u64>) {
        self.no_partitions_count = value;
    }

    /// Make this cycle's no-partitions reading the baseline for the next one.
    ///
    /// Called at most once per cycle. A cycle without a reading keeps the
    /// previous baseline.
    pub fn advance_no_partitions_count(&mut self) {
        if let Some(count) = self.no_partitions_count {
            self.prev_no_partitions_count = Some(count);
        }
    }

    /// The metrics fetch itself failed.
    pub fn record_metric_api_failure(&mut self) {
        self.consecutive_metric_api_failures =
            self.consecutive_metric_api_failures.saturating_add(1);
    }

    /// A payload was fetched but the document count could not be read from
    /// it. Does not count toward the API failure budget.
    pub fn record_success_doc_value_failure(&mut self) {
        self.consecutive_metric_value_failures =
            self.consecutive_metric_value_failures.saturating_add(1);
    }

    /// A metrics fetch succeeded.
    pub fn reset_metric_api_failure(&mut self) {
        self.consecutive_metric_api_failures = 0;
    }

    // ------------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------------

    /// Percentage of the target migrated so far, rounded down.
    ///
    /// Zero until a document count has been observed.
    pub fn doc_completion_percentage(&self) -> u64 {
        let Some(count) = self.last_success_doc_count else {
            return 0;
        };
        let percentage = u128::from(count) * 100 / u128::from(self.target_doc_count.get());
        u64::try_from(percentage).unwrap_or(u64::MAX)
    }

    pub fn all_docs_migrated(&self) -> bool {
        self.last_success_doc_count
            .is_some_and(|count| count >= self.target_doc_count.get())
    }

    /// All documents migrated, nothing in flight, and workers have been
    /// finding no partitions for at least one full cycle.
    ///
    /// A single snapshot is never enough: the no-partitions count must have
    /// been positive in the previous cycle and strictly larger in this one.
    /// A first `0 -> n` transition happens at pipeline startup too.
    pub fn is_migration_complete_success(&self) -> bool {
        if !self.all_docs_migrated() || self.records_in_flight != Some(0) {
            return false;
        }

        match (self.prev_no_partitions_count, self.no_partitions_count) {
            (Some(prev), Some(current)) => prev > 0 && current > prev,
            _ => false,
        }
    }

    /// The document count has not moved for `idle_threshold` consecutive
    /// cycles, whether or not the target was reached.
    pub fn is_migration_idle(&self) -> bool {
        self.idle_streak_count >= self.idle_threshold.get()
    }

    pub fn is_too_many_api_failures(&self) -> bool {
        self.consecutive_metric_api_failures >= self.api_failure_budget.get()
    }

    pub fn is_in_terminal_state(&self) -> bool {
        self.is_too_many_api_failures()
            || self.is_migration_idle()
            || self.is_migration_complete_success()
    }

    /// Classify the migration.
    ///
    /// When several terminal conditions hold at once, completion wins over
    /// failure, and failure over idleness.
    pub fn status(&self) -> MigrationStatus {
        if self.is_migration_complete_success() {
            MigrationStatus::CompleteSuccess
        } else if self.is_too_many_api_failures() {
            MigrationStatus::Failed
        } else if self.is_migration_idle() {
            MigrationStatus::Idle
        } else {
            MigrationStatus::InProgress
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            target_doc_count: self.target_doc_count.get(),
            success_doc_count: self.last_success_doc_count,
            completion_percentage: self.doc_completion_percentage(),
            records_in_flight: self.records_in_flight,
            no_partitions_acquired_count: self.no_partitions_count,
            idle_streak_count: self.idle_streak_count,
            consecutive_metric_api_failures: self.consecutive_metric_api_failures,
            consecutive_metric_value_failures: self.consecutive_metric_value_failures,
            status: self.status(),
        }
    }
}
