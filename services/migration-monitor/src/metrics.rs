// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Prometheus metrics for the migration monitor
//!
//! Exports metrics describing the monitor's own behavior:
//! - Poll cycles by result (ok, api_failure)
//! - Missing metric values by kind
//! - Shutdown requests by result
//! - Last observed document completion percentage

use prometheus::{CounterVec, IntGauge, Opts, Registry, TextEncoder};

use migration_monitor_types::MetricKind;

// Metric definitions below only fail on an invalid name or label set, which
// is a programming error; panicking at first use is acceptable. The module
// scopes the clippy allowance to these statics.
#[allow(clippy::expect_used)]
mod metrics_impl {
    use super::*;
    use lazy_static::lazy_static;

    lazy_static! {
        /// Registry for all monitor metrics
        pub static ref REGISTRY: Registry = Registry::new();

        /// Poll cycles by result
        pub static ref POLLS_TOTAL: CounterVec = CounterVec::new(
            Opts::new("migration_monitor_polls_total", "Poll cycles by result"),
            &["result"]
        ).expect("valid metric name and labels");

        /// Fetched payloads missing a metric, by metric kind
        pub static ref MISSING_VALUES_TOTAL: CounterVec = CounterVec::new(
            Opts::new(
                "migration_monitor_missing_values_total",
                "Fetched payloads missing a metric value, by metric"
            ),
            &["metric"]
        ).expect("valid metric name and labels");

        /// Pipeline shutdown requests by result
        pub static ref SHUTDOWNS_TOTAL: CounterVec = CounterVec::new(
            Opts::new("migration_monitor_shutdowns_total", "Pipeline shutdown requests by result"),
            &["result"]
        ).expect("valid metric name and labels");

        /// Last observed completion percentage
        pub static ref DOC_COMPLETION_PERCENT: IntGauge = IntGauge::with_opts(
            Opts::new(
                "migration_monitor_doc_completion_percent",
                "Last observed document completion percentage"
            )
        ).expect("valid metric name");
    }
}

pub use metrics_impl::{
    DOC_COMPLETION_PERCENT, MISSING_VALUES_TOTAL, POLLS_TOTAL, REGISTRY, SHUTDOWNS_TOTAL,
};

/// Register all metrics with the registry
///
/// Should be called once during application startup.
/// Panics if registration fails (indicates a programming error).
#[allow(clippy::expect_used)]
pub fn register_metrics() {
    REGISTRY
        .register(Box::new(POLLS_TOTAL.clone()))
        .expect("Failed to register POLLS_TOTAL");
    REGISTRY
        .register(Box::new(MISSING_VALUES_TOTAL.clone()))
        .expect("Failed to register MISSING_VALUES_TOTAL");
    REGISTRY
        .register(Box::new(SHUTDOWNS_TOTAL.clone()))
        .expect("Failed to register SHUTDOWNS_TOTAL");
    REGISTRY
        .register(Box::new(DOC_COMPLETION_PERCENT.clone()))
        .expect("Failed to register DOC_COMPLETION_PERCENT");
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Record a poll cycle whose fetch succeeded
pub fn record_poll_ok() {
    POLLS_TOTAL.with_label_values(&["ok"]).inc();
}

/// Record a poll cycle whose fetch failed
pub fn record_poll_api_failure() {
    POLLS_TOTAL.with_label_values(&["api_failure"]).inc();
}

/// Record a fetched payload that did not contain `kind`
pub fn record_missing_value(kind: MetricKind) {
    MISSING_VALUES_TOTAL
        .with_label_values(&[kind.to_string().as_str()])
        .inc();
}

/// Record the outcome of a shutdown request
pub fn record_shutdown(succeeded: bool) {
    let result = if succeeded { "ok" } else { "error" };
    SHUTDOWNS_TOTAL.with_label_values(&[result]).inc();
}

/// Record the latest completion percentage
pub fn record_completion_percentage(percentage: u64) {
    DOC_COMPLETION_PERCENT.set(i64::try_from(percentage).unwrap_or(i64::MAX));
}
