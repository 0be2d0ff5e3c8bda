// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Command-line arguments
//!
//! Every flag can also be given through an environment variable. Flags
//! override values loaded from `--config`, which override the defaults.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::MonitorConfig;

#[derive(Debug, Parser)]
#[command(name = "migration-monitor")]
#[command(about = "Watch a migration pipeline and shut it down once the migration ends")]
#[command(version)]
pub struct Cli {
    /// JSON config file providing defaults for the options below
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the pipeline (e.g. "http://localhost:4900")
    #[arg(long, env = "PIPELINE_ENDPOINT")]
    pub pipeline_endpoint: Option<String>,

    /// Number of documents expected in the target once the migration is done
    #[arg(long, env = "TARGET_DOC_COUNT")]
    pub target_doc_count: Option<u64>,

    /// Seconds between metric polls
    #[arg(long, env = "POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Unchanged polls before the migration is considered idle
    #[arg(long, env = "IDLE_THRESHOLD")]
    pub idle_threshold: Option<u32>,

    /// Consecutive failed polls before the migration is considered failed
    #[arg(long, env = "API_FAILURE_BUDGET")]
    pub api_failure_budget: Option<u32>,

    /// HTTP timeout in seconds for pipeline requests
    #[arg(long, env = "HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    /// Basic-auth user for the pipeline endpoint
    #[arg(long, env = "PIPELINE_USERNAME")]
    pub username: Option<String>,

    /// Basic-auth password for the pipeline endpoint
    #[arg(long, env = "PIPELINE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl Cli {
    /// Resolve the effective configuration. Does not validate it.
    pub async fn into_config(self) -> Result<MonitorConfig> {
        let base = match &self.config {
            Some(path) => MonitorConfig::from_file(path).await?,
            None => MonitorConfig::default(),
        };
        Ok(self.apply(base))
    }

    fn apply(self, mut config: MonitorConfig) -> MonitorConfig {
        if let Some(v) = self.pipeline_endpoint {
            config.pipeline_endpoint = v;
        }
        if let Some(v) = self.target_doc_count {
            config.target_doc_count = v;
        }
        if let Some(v) = self.poll_interval_secs {
            config.poll_interval_secs = v;
        }
        if let Some(v) = self.idle_threshold {
            config.idle_threshold = v;
        }
        if let Some(v) = self.api_failure_budget {
            config.api_failure_budget = v;
        }
        if let Some(v) = self.http_timeout_secs {
            config.http_timeout_secs = v;
        }
        if self.username.is_some() {
            config.username = self.username;
        }
        if self.password.is_some() {
            config.password = self.password;
        }
        config
    }
}
