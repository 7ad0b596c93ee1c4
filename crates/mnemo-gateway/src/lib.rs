// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-call gateway for the Mnemo memory engine.
//!
//! Every operation is a [`tool::Tool`] in one registry. The [`dispatcher::Dispatcher`]
//! routes envelopes to tools and is shared by both transports: the axum HTTP
//! server and the line-delimited stdio loop.

pub mod auth;
pub mod context;
pub mod dispatcher;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod stdio;
pub mod tool;
pub mod tools;

use std::sync::Arc;

use mnemo_core::MnemoError;
use tokio_util::sync::CancellationToken;

pub use context::ToolContext;
pub use dispatcher::Dispatcher;
pub use protocol::{ToolCallRequest, ToolCallResponse};

use crate::auth::AuthConfig;
use crate::server::{GatewayState, HealthState, ServerConfig};

/// Settings for the HTTP transport.
#[derive(Clone, Default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on `/v1/*`; `None` leaves the API open.
    pub bearer_token: Option<String>,
    /// Optional Prometheus metrics render function for `/metrics`.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[redacted]"))
            .field(
                "prometheus_render",
                &self.prometheus_render.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

/// A dispatcher over every built-in tool.
pub fn build_dispatcher(ctx: &ToolContext) -> Arc<Dispatcher> {
    let registry = tools::builtin_registry(ctx);
    Arc::new(Dispatcher::new(registry, ctx.activity.clone()))
}

/// Axum state for a dispatcher and transport config.
pub fn gateway_state(dispatcher: Arc<Dispatcher>, config: &GatewayConfig) -> GatewayState {
    GatewayState {
        dispatcher,
        auth: AuthConfig {
            bearer_token: config.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render: config.prometheus_render.clone(),
        },
    }
}

/// Serve HTTP until `cancel` fires.
pub async fn serve_http(
    dispatcher: Arc<Dispatcher>,
    config: &GatewayConfig,
    cancel: CancellationToken,
) -> Result<(), MnemoError> {
    let state = gateway_state(dispatcher, config);
    let server_config = ServerConfig {
        host: config.host.clone(),
        port: config.port,
    };
    server::start_server(&server_config, state, cancel).await
}
