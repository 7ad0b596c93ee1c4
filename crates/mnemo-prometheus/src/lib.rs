// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus exporter for Mnemo.
//!
//! Installs the metrics-rs Prometheus recorder. Metrics are rendered as
//! Prometheus text through the gateway's `/metrics` endpoint.

pub mod recording;

use std::sync::Arc;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use mnemo_core::MnemoError;

pub use recording::register_metrics;

/// Handle to the process-wide Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, MnemoError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            MnemoError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Render closure for the gateway's `/metrics` route.
    pub fn render_fn(&self) -> Arc<dyn Fn() -> String + Send + Sync> {
        let handle = self.handle.clone();
        Arc::new(move || handle.render())
    }
}

#[cfg(test)]
mod tests {
    use super::recording::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn described_metrics_render_with_help_text() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            metrics::gauge!(VECTORS_TOTAL).set(7.0);
            metrics::gauge!(MESSAGES, "role" => "user").set(3.0);
            metrics::counter!(TOOL_CALLS_TOTAL, "tool" => "add_message", "status" => "ok")
                .increment(2);
        });

        let text = handle.render();
        assert!(text.contains("# HELP mnemo_vectors_total"), "{text}");
        assert!(text.contains("mnemo_vectors_total 7"), "{text}");
        assert!(text.contains(r#"mnemo_messages{role="user"} 3"#), "{text}");
        assert!(
            text.contains(r#"mnemo_tool_calls_total{tool="add_message",status="ok"} 2"#),
            "{text}"
        );
    }
}
