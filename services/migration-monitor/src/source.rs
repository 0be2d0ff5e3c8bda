// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Metrics sources
//!
//! A [`MetricsSource`] returns the raw exposition payload of a running
//! pipeline. The completion loop only depends on the trait; the HTTP
//! implementation talks to the pipeline's metrics endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::http::{self, BasicAuth};

/// Path of the Prometheus exposition endpoint on the pipeline.
pub const METRICS_PATH: &str = "/metrics/prometheus";

/// Metrics source errors
///
/// Any error from [`MetricsSource::fetch`] counts toward the API failure
/// budget. `InvalidEndpoint` only occurs at construction.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pipeline endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Metrics endpoint returned status {0}")]
    Status(u16),

    #[error("Metrics source unavailable: {0}")]
    Unavailable(String),
}

/// Something that can be asked for the pipeline's current metrics.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch the raw metrics payload.
    async fn fetch(&self) -> Result<String, SourceError>;
}

/// Metrics source backed by the pipeline's HTTP endpoint.
pub struct HttpMetricsSource {
    client: Client,
    url: Url,
    auth: Option<BasicAuth>,
}

impl HttpMetricsSource {
    /// Create a source for the pipeline at `endpoint`.
    pub fn new(
        endpoint: &str,
        auth: Option<BasicAuth>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            url: http::endpoint_url(endpoint, METRICS_PATH)?,
            auth,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    async fn fetch(&self) -> Result<String, SourceError> {
        let request = http::with_auth(self.client.get(self.url.clone()), self.auth.as_ref());
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %self.url, status = %status, "Metrics endpoint error response");
            return Err(SourceError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
