// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo serve` command implementation.
//!
//! Connects the memory stack, starts the stats sampler, and runs either the
//! HTTP gateway or the stdio transport until a shutdown signal arrives.

use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_gateway::GatewayConfig;
use tracing::{info, warn};

use crate::engine::Engine;
use crate::shutdown;

/// Transport selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Stdio,
}

/// Run the server until SIGINT/SIGTERM.
pub async fn run_serve(config: MnemoConfig, transport: Transport) -> Result<(), MnemoError> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?transport,
        "starting mnemo"
    );

    let cancel = shutdown::install_signal_handler();
    let engine = Engine::connect(&config, cancel.clone()).await?;

    let stats = engine.ctx.stats.clone();
    let stats_cancel = cancel.clone();
    let interval = config.memory.stats_interval();
    let stats_task = tokio::spawn(async move { stats.run(interval, stats_cancel).await });

    let result = match transport {
        Transport::Http => {
            let gateway_config = GatewayConfig {
                host: config.server.host.clone(),
                port: config.server.port,
                bearer_token: config.server.bearer_token.clone(),
                prometheus_render: prometheus_render(),
            };
            if gateway_config.bearer_token.is_none() {
                warn!("no server.bearer_token configured, /v1 API is unauthenticated");
            }
            mnemo_gateway::serve_http(engine.dispatcher.clone(), &gateway_config, cancel.clone())
                .await
        }
        Transport::Stdio => {
            mnemo_gateway::stdio::serve_stdio(engine.dispatcher.clone(), cancel.clone())
                .await
                .map(|handled| info!(handled, "stdio transport closed"))
        }
    };

    // Stdin EOF ends the stdio transport without a signal.
    cancel.cancel();
    if let Err(e) = stats_task.await {
        warn!(error = %e, "stats sampler task ended abnormally");
    }

    info!("mnemo serve shutdown complete");
    result
}

#[cfg(feature = "prometheus")]
fn prometheus_render() -> Option<std::sync::Arc<dyn Fn() -> String + Send + Sync>> {
    match mnemo_prometheus::PrometheusAdapter::new() {
        Ok(adapter) => Some(adapter.render_fn()),
        Err(e) => {
            warn!(error = %e, "prometheus exporter unavailable, /metrics disabled");
            None
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn prometheus_render() -> Option<std::sync::Arc<dyn Fn() -> String + Send + Sync>> {
    None
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr: stdout carries command output and stdio protocol frames.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mnemo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
