// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Pipeline control
//!
//! The monitor's only outbound action is asking the pipeline to shut down
//! once the migration reaches a terminal state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::http::{self, BasicAuth};

/// Path of the shutdown endpoint on the pipeline.
pub const SHUTDOWN_PATH: &str = "/shutdown";

/// Pipeline controller errors
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pipeline endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Shutdown endpoint returned status {0}")]
    Status(u16),
}

/// Something that can stop the pipeline.
#[async_trait]
pub trait PipelineController: Send + Sync {
    /// Request a pipeline shutdown. Best effort.
    async fn shutdown(&self) -> Result<(), ControllerError>;
}

/// Pipeline controller backed by the pipeline's HTTP endpoint.
pub struct HttpPipelineController {
    client: Client,
    url: Url,
    auth: Option<BasicAuth>,
}

impl HttpPipelineController {
    /// Create a controller for the pipeline at `endpoint`.
    pub fn new(
        endpoint: &str,
        auth: Option<BasicAuth>,
        timeout: Duration,
    ) -> Result<Self, ControllerError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            url: http::endpoint_url(endpoint, SHUTDOWN_PATH)?,
            auth,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl PipelineController for HttpPipelineController {
    async fn shutdown(&self) -> Result<(), ControllerError> {
        let request = http::with_auth(self.client.post(self.url.clone()), self.auth.as_ref());
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ControllerError::Status(status.as_u16()))
        }
    }
}
