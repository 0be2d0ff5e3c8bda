// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Migration Monitor
//!
//! Watches a running migration pipeline until the migration ends. It:
//!
//! - Polls the pipeline's Prometheus metrics endpoint
//! - Tracks document progress, records in flight and partition exhaustion
//! - Decides whether the migration is complete, idle or failed
//! - Shuts the pipeline down and prints a JSON report
//!
//! The exit code reflects the outcome: 0 complete, 1 failed, 2 idle,
//! 130 cancelled.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use migration_monitor::cli::Cli;
use migration_monitor::metrics;
use migration_monitor::{CompletionLoop, HttpMetricsSource, HttpPipelineController, ProgressTracker};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the final report.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "migration_monitor=info".to_string()),
        ))
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        buildstamp = option_env!("STAMP").unwrap_or("no-STAMP"),
        "migration-monitor starting"
    );

    let config = cli.into_config().await.context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(
        pipeline_endpoint = %config.pipeline_endpoint_display(),
        target_doc_count = config.target_doc_count,
        idle_threshold = config.idle_threshold,
        api_failure_budget = config.api_failure_budget,
        "Configuration loaded"
    );

    metrics::register_metrics();

    let tracker = ProgressTracker::new(
        config.target_doc_count,
        config.idle_threshold,
        config.api_failure_budget,
    )
    .context("Failed to create progress tracker")?;

    let source = HttpMetricsSource::new(
        &config.pipeline_endpoint,
        config.basic_auth(),
        config.http_timeout(),
    )
    .context("Failed to create metrics client")?;

    let controller = HttpPipelineController::new(
        &config.pipeline_endpoint,
        config.basic_auth(),
        config.http_timeout(),
    )
    .context("Failed to create pipeline client")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, cancelling monitor");
        let _ = cancel_tx.send(true);
    });

    let report = CompletionLoop::new(source, controller, tracker, config.poll_interval())
        .run(cancel_rx)
        .await;

    debug!(metrics = %metrics::gather_metrics(), "Final monitor metrics");

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", json);

    std::process::exit(report.exit.exit_code());
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let terminate = async move {
                    sigterm.recv().await;
                };
                first_signal(tokio::signal::ctrl_c(), terminate).await;
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
            }
        }
    }

    first_signal(tokio::signal::ctrl_c(), std::future::pending::<()>()).await;
}

/// Resolve on whichever signal arrives first.
///
/// A Ctrl+C listener that fails to register is logged and leaves only
/// `terminate` to wait on.
async fn first_signal<C, T>(ctrl_c: C, terminate: T)
where
    C: Future<Output = std::io::Result<()>>,
    T: Future<Output = ()>,
{
    tokio::pin!(terminate);

    tokio::select! {
        result = ctrl_c => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                (&mut terminate).await;
            }
        }
        _ = &mut terminate => {}
    }
}
