// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Shared types for the migration completion monitor.
//!
//! These are the observations the monitor takes from a running data-movement
//! pipeline and the classifications and reports it produces from them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, VariantNames};

// ============================================================================
// Metric Types
// ============================================================================

/// The pipeline metrics the monitor understands.
///
/// Each kind is recognized in a metrics payload by the suffix of its metric
/// family name, so the pipeline name prefix (e.g. `historical-data-migration`)
/// does not matter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    VariantNames,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Cumulative documents successfully written to the target
    DocumentsSuccess,
    /// Records currently buffered between the read and write stages
    RecordsInFlight,
    /// Cumulative count of worker polls that found no partition to claim
    NoPartitionsAcquired,
}

impl MetricKind {
    /// Family name suffix identifying this metric in a payload.
    pub fn suffix(self) -> &'static str {
        match self {
            MetricKind::DocumentsSuccess => "_opensearch_documentsSuccess",
            MetricKind::RecordsInFlight => "_BlockingBuffer_recordsInFlight",
            MetricKind::NoPartitionsAcquired => "_noPartitionsAcquired",
        }
    }

    /// Whether a metric family name identifies this kind.
    pub fn matches(self, family_name: &str) -> bool {
        family_name.ends_with(self.suffix())
    }
}

/// One observation of the pipeline's metrics.
///
/// Every field is independently optional: a payload may omit a metric family,
/// and nothing is known at all when the fetch itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Cumulative documents successfully written to the target
    pub success_doc_count: Option<u64>,
    /// Records currently in flight; zero means idle at sampling time
    pub records_in_flight: Option<u64>,
    /// Cumulative "no partitions acquired" count
    pub no_partitions_acquired_count: Option<u64>,
}

impl MetricSample {
    /// Read the value recorded for a metric kind.
    pub fn get(&self, kind: MetricKind) -> Option<u64> {
        match kind {
            MetricKind::DocumentsSuccess => self.success_doc_count,
            MetricKind::RecordsInFlight => self.records_in_flight,
            MetricKind::NoPartitionsAcquired => self.no_partitions_acquired_count,
        }
    }

    /// Record a value for a metric kind.
    pub fn set(&mut self, kind: MetricKind, value: u64) {
        let slot = match kind {
            MetricKind::DocumentsSuccess => &mut self.success_doc_count,
            MetricKind::RecordsInFlight => &mut self.records_in_flight,
            MetricKind::NoPartitionsAcquired => &mut self.no_partitions_acquired_count,
        };
        *slot = Some(value);
    }
}

// ============================================================================
// Classification Types
// ============================================================================

/// Overall classification of a running migration.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// No terminal condition has been reached yet
    #[default]
    InProgress,
    /// All documents migrated and the pipeline has drained
    CompleteSuccess,
    /// The document count stopped advancing
    Idle,
    /// The metrics endpoint failed too many consecutive times
    Failed,
}

impl MigrationStatus {
    /// Whether the monitor stops polling in this state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, MigrationStatus::InProgress)
    }
}

/// Point-in-time view of the progress tracker, for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Expected final document count
    pub target_doc_count: u64,
    /// Last observed successful document count
    pub success_doc_count: Option<u64>,
    /// Completion percentage, rounded down
    pub completion_percentage: u64,
    /// Latest records-in-flight reading
    pub records_in_flight: Option<u64>,
    /// Latest no-partitions-acquired reading
    pub no_partitions_acquired_count: Option<u64>,
    /// Consecutive cycles without document progress
    pub idle_streak_count: u32,
    /// Consecutive failed fetches
    pub consecutive_metric_api_failures: u32,
    /// Consecutive cycles without a document count in the payload
    pub consecutive_metric_value_failures: u32,
    /// Classification at the time of the snapshot
    pub status: MigrationStatus,
}

// ============================================================================
// Report Types
// ============================================================================

/// Why the monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorExit {
    /// A terminal classification was reached
    Terminal(MigrationStatus),
    /// An operator cancelled the monitor
    Cancelled,
}

impl MonitorExit {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            MonitorExit::Terminal(MigrationStatus::CompleteSuccess) => 0,
            MonitorExit::Terminal(MigrationStatus::Failed) => 1,
            MonitorExit::Terminal(MigrationStatus::Idle) => 2,
            // Not produced by the loop; treated like a failure
            MonitorExit::Terminal(MigrationStatus::InProgress) => 1,
            MonitorExit::Cancelled => 130,
        }
    }
}

/// Summary of one monitor run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorReport {
    /// Why the monitor stopped
    pub exit: MonitorExit,
    /// Number of poll cycles run
    pub cycles: u64,
    /// Whether a pipeline shutdown was requested
    pub shutdown_requested: bool,
    /// Final tracker state
    pub progress: ProgressSnapshot,
}

// ============================================================================
// Tests
// ============================================================================
