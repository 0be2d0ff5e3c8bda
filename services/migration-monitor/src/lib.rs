// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Migration Monitor Library
//!
//! This library decides when a data-movement pipeline has finished migrating
//! documents. It samples the pipeline's Prometheus metrics, classifies the
//! migration as complete, idle or failed, and then shuts the pipeline down.
//!
//! # Modules
//!
//! - [`cli`] - Command-line arguments
//! - [`config`] - Monitor configuration (endpoint, target count, tunables)
//! - [`controller`] - Pipeline shutdown
//! - [`exposition`] - Prometheus text format parsing
//! - [`metrics`] - The monitor's own Prometheus metrics
//! - [`monitor`] - The polling completion loop
//! - [`progress`] - Migration progress state machine
//! - [`source`] - Metrics sources

pub mod cli;
pub mod config;
pub mod controller;
pub mod exposition;
pub mod http;
pub mod metrics;
pub mod monitor;
pub mod progress;
pub mod source;

pub use controller::{ControllerError, HttpPipelineController, PipelineController};
pub use monitor::{CompletionLoop, LoopState};
pub use progress::{ProgressTracker, TrackerError};
pub use source::{HttpMetricsSource, MetricsSource, SourceError};
