// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Configuration for the migration monitor

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::http::BasicAuth;
use crate::progress::{DEFAULT_API_FAILURE_BUDGET, DEFAULT_IDLE_THRESHOLD};

/// Default seconds between poll cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default HTTP timeout for metrics and shutdown requests (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Monitor configuration
///
/// Loaded once before the loop starts, either from a JSON file (see
/// `from_file()`) or from defaults, then overridden by command-line flags.
/// It is never reloaded during a run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Base URL of the pipeline (metrics and shutdown endpoints live under it)
    pub pipeline_endpoint: String,

    /// Expected final document count; must be greater than zero
    pub target_doc_count: u64,

    /// Seconds to wait between poll cycles
    pub poll_interval_secs: u64,

    /// Consecutive unchanged document counts before the migration is idle
    pub idle_threshold: u32,

    /// Consecutive failed metrics fetches before the migration is failed
    pub api_failure_budget: u32,

    /// HTTP timeout in seconds; must be shorter than the poll interval
    pub http_timeout_secs: u64,

    /// Basic-auth user for the pipeline endpoint
    pub username: Option<String>,

    /// Basic-auth password for the pipeline endpoint
    pub password: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pipeline_endpoint: String::new(),
            target_doc_count: 0,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            api_failure_budget: DEFAULT_API_FAILURE_BUDGET,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            username: None,
            password: None,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a JSON file
    ///
    /// Fields missing from the file take their default values.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Check the configuration before any monitoring starts
    pub fn validate(&self) -> Result<()> {
        if self.pipeline_endpoint.trim().is_empty() {
            bail!("Pipeline endpoint is required");
        }
        url::Url::parse(&self.pipeline_endpoint)
            .with_context(|| format!("Invalid pipeline endpoint: {}", self.pipeline_endpoint))?;

        if self.target_doc_count == 0 {
            bail!("Target document count must be greater than zero");
        }
        if self.poll_interval_secs == 0 {
            bail!("Poll interval must be greater than zero");
        }
        if self.idle_threshold == 0 {
            bail!("Idle threshold must be greater than zero");
        }
        if self.api_failure_budget == 0 {
            bail!("API failure budget must be greater than zero");
        }
        if self.http_timeout_secs == 0 || self.http_timeout_secs >= self.poll_interval_secs {
            bail!(
                "HTTP timeout ({}s) must be non-zero and shorter than the poll interval ({}s)",
                self.http_timeout_secs,
                self.poll_interval_secs
            );
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Credentials for the pipeline endpoint, if a user is configured
    pub fn basic_auth(&self) -> Option<BasicAuth> {
        self.username.as_ref().map(|username| BasicAuth {
            username: username.clone(),
            password: self.password.clone(),
        })
    }

    /// Return a display-safe version of the pipeline endpoint (password masked)
    pub fn pipeline_endpoint_display(&self) -> String {
        match url::Url::parse(&self.pipeline_endpoint) {
            Ok(mut url) if url.password().is_some() => {
                // Only fails for URLs that cannot carry credentials.
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => self.pipeline_endpoint.clone(),
        }
    }
}
