// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo status` command implementation.
//!
//! Probes a running server's `/health` endpoint and, when reachable, its
//! `/v1/stats` snapshot. Falls back gracefully when the server is down.

use std::io::IsTerminal;
use std::time::Duration;

use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    current: StatsSnapshot,
}

#[derive(Debug, Deserialize)]
struct StatsSnapshot {
    total_vectors: u64,
    project_files: u64,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub version: Option<String>,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub total_vectors: Option<u64>,
    pub project_files: Option<u64>,
    pub host: String,
    pub port: u16,
}

impl StatusResponse {
    fn offline(host: &str, port: u16) -> Self {
        Self {
            running: false,
            status: "not running".to_string(),
            version: None,
            uptime_secs: None,
            uptime_human: None,
            total_vectors: None,
            project_files: None,
            host: host.to_string(),
            port,
        }
    }
}

/// Format seconds into a human-readable duration string.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Query a server at `host:port`.
///
/// Connection failures and non-2xx health responses report "not running";
/// a missing or unauthorized stats response only leaves the counts empty.
pub async fn probe(
    host: &str,
    port: u16,
    bearer_token: Option<&str>,
) -> Result<StatusResponse, MnemoError> {
    let base = format!("http://{host}:{port}");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| MnemoError::Internal(format!("failed to create HTTP client: {e}")))?;

    let health = match client.get(format!("{base}/health")).send().await {
        Ok(resp) if resp.status().is_success() => resp.json::<HealthResponse>().await.map_err(
            |e| MnemoError::Internal(format!("failed to parse health response: {e}")),
        )?,
        _ => return Ok(StatusResponse::offline(host, port)),
    };

    let mut request = client.get(format!("{base}/v1/stats"));
    if let Some(token) = bearer_token {
        request = request.bearer_auth(token);
    }
    let stats = match request.send().await {
        Ok(resp) if resp.status().is_success() => resp.json::<StatsResponse>().await.ok(),
        _ => None,
    };

    Ok(StatusResponse {
        running: true,
        status: health.status,
        version: Some(health.version),
        uptime_secs: Some(health.uptime_secs),
        uptime_human: Some(format_uptime(health.uptime_secs)),
        total_vectors: stats.as_ref().map(|s| s.current.total_vectors),
        project_files: stats.as_ref().map(|s| s.current.project_files),
        host: host.to_string(),
        port,
    })
}

/// Run the `mnemo status` command against the configured server address.
pub async fn run_status(config: &MnemoConfig, json: bool, plain: bool) -> Result<(), MnemoError> {
    let status = probe(
        &config.server.host,
        config.server.port,
        config.server.bearer_token.as_deref(),
    )
    .await?;

    if json {
        let rendered = serde_json::to_string_pretty(&status)
            .map_err(|e| MnemoError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    if status.running {
        print_status_running(&status, use_color);
    } else {
        print_status_offline(&status.host, status.port, use_color);
    }
    Ok(())
}

fn print_status_running(status: &StatusResponse, use_color: bool) {
    let uptime = status.uptime_human.as_deref().unwrap_or("?");
    println!();
    println!("  mnemo status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!(
            "    State:    {} {} (uptime: {})",
            "✓".green(),
            status.status.green(),
            uptime
        );
    } else {
        println!("    State:    [OK] {} (uptime: {uptime})", status.status);
    }
    if let Some(version) = &status.version {
        println!("    Version:  {version}");
    }
    match (status.total_vectors, status.project_files) {
        (Some(vectors), Some(files)) => {
            println!("    Vectors:  {vectors} ({files} project files)");
        }
        _ => println!("    Vectors:  unavailable"),
    }
    println!();
}

fn print_status_offline(host: &str, port: u16, use_color: bool) {
    println!();
    println!("  mnemo status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!("    State:    {} {}", "✗".red(), "not running".red());
    } else {
        println!("    State:    [FAIL] not running");
    }

    println!("    Endpoint: http://{host}:{port}/health");
    println!();
    println!("  Start with: mnemo serve");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn format_uptime_ranges() {
        assert_eq!(format_uptime(120), "2m");
        assert_eq!(format_uptime(3720), "1h 2m");
        assert_eq!(format_uptime(90060), "1d 1h 1m");
    }

    fn split(server: &MockServer) -> (String, u16) {
        let addr = server.address();
        (addr.ip().to_string(), addr.port())
    }

    #[tokio::test]
    async fn probe_reads_health_and_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok", "version": "0.1.0", "uptime_secs": 3700
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/stats"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {
                    "total_vectors": 12,
                    "messages_by_role": {"user": 8},
                    "project_files": 4,
                    "sampled_at": "2026-03-11T15:00:00Z"
                },
                "total_messages": 8,
                "history": []
            })))
            .mount(&server)
            .await;

        let (host, port) = split(&server);
        let status = probe(&host, port, Some("tok")).await.unwrap();
        assert!(status.running);
        assert_eq!(status.uptime_human.as_deref(), Some("1h 1m"));
        assert_eq!(status.total_vectors, Some(12));
        assert_eq!(status.project_files, Some(4));
    }

    #[tokio::test]
    async fn unauthorized_stats_leave_counts_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok", "version": "0.1.0", "uptime_secs": 5
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/stats"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (host, port) = split(&server);
        let status = probe(&host, port, None).await.unwrap();
        assert!(status.running);
        assert_eq!(status.total_vectors, None);
    }

    #[tokio::test]
    async fn unreachable_server_is_not_running() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (host, port) = split(&server);
        let status = probe(&host, port, None).await.unwrap();
        assert!(!status.running);
        assert_eq!(status.status, "not running");

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"running\":false"));
    }
}
