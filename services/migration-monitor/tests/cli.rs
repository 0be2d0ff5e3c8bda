// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Command-line tests for the migration-monitor binary

// Allow deprecated - cargo_bin is standard for CLI testing
#![allow(deprecated)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

const ENV_VARS: &[&str] = &[
    "CONFIG_FILE",
    "PIPELINE_ENDPOINT",
    "TARGET_DOC_COUNT",
    "POLL_INTERVAL_SECS",
    "IDLE_THRESHOLD",
    "API_FAILURE_BUDGET",
    "HTTP_TIMEOUT_SECS",
    "PIPELINE_USERNAME",
    "PIPELINE_PASSWORD",
];

fn monitor_cmd() -> Command {
    let mut cmd =
        Command::cargo_bin("migration-monitor").expect("Failed to find migration-monitor binary");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help() {
    monitor_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--target-doc-count"));
}

#[test]
fn test_version() {
    monitor_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("migration-monitor"));
}

#[test]
fn test_missing_endpoint_is_rejected() {
    monitor_cmd()
        .args(["--target-doc-count", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pipeline endpoint is required"));
}

#[test]
fn test_zero_target_is_rejected() {
    monitor_cmd()
        .args([
            "--pipeline-endpoint",
            "http://127.0.0.1:9",
            "--target-doc-count",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

#[test]
fn test_timeout_must_be_shorter_than_poll_interval() {
    monitor_cmd()
        .args([
            "--pipeline-endpoint",
            "http://127.0.0.1:9",
            "--target-doc-count",
            "10",
            "--poll-interval-secs",
            "5",
            "--http-timeout-secs",
            "5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("shorter than the poll interval"));
}

#[test]
fn test_unreachable_pipeline_reports_failure() {
    monitor_cmd()
        .args([
            "--pipeline-endpoint",
            "http://127.0.0.1:9",
            "--target-doc-count",
            "10",
            "--api-failure-budget",
            "1",
            "--poll-interval-secs",
            "2",
            "--http-timeout-secs",
            "1",
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"failed\""))
        .stdout(predicate::str::contains("\"cycles\": 1"));
}
