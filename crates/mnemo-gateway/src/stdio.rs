// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-delimited JSON transport.
//!
//! One request per input line, one response per output line. Each request
//! runs on its own task, so responses are written in completion order and a
//! slow call never blocks a fast one; callers correlate by `id`.

use std::sync::Arc;

use mnemo_core::MnemoError;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::protocol::ToolCallResponse;

/// Outbound frame buffer between request tasks and the writer.
const RESPONSE_BUFFER: usize = 64;

/// Serve requests from `reader` until EOF or cancellation.
///
/// On EOF every in-flight request is allowed to finish and its response is
/// flushed before returning. Returns the number of lines handled.
pub async fn serve_lines<R, W>(
    dispatcher: Arc<Dispatcher>,
    reader: R,
    writer: W,
    cancel: CancellationToken,
) -> Result<u64, MnemoError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<String>(RESPONSE_BUFFER);
    let writer_task = tokio::spawn(write_frames(writer, rx));

    let mut lines = reader.lines();
    let mut in_flight = JoinSet::new();
    let mut handled = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel.cancelled() => {
                info!("stdio transport cancelled");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to read request line");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        handled += 1;

        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        let line: Arc<str> = line.into();
        in_flight.spawn(async move {
            let request = line.clone();
            let handler = tokio::spawn(async move { dispatcher.handle_line(&request).await });
            // A panicking tool still owes the caller a response.
            let response = match handler.await {
                Ok(response) => response,
                Err(e) => {
                    let id = request_id(&line);
                    warn!(id = %id, error = %e, "request task panicked");
                    let err = MnemoError::Internal("request handler panicked".into());
                    ToolCallResponse::error(id, &err)
                }
            };
            match serde_json::to_string(&response) {
                Ok(frame) => {
                    // A closed channel means the writer already failed.
                    let _ = tx.send(frame).await;
                }
                Err(e) => warn!(error = %e, "failed to serialize response"),
            }
        });

        // Reap finished tasks so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "request task failed");
        }
    }
    drop(tx);

    writer_task
        .await
        .map_err(|e| MnemoError::Internal(format!("stdio writer panicked: {e}")))?
        .map_err(|e| MnemoError::Internal(format!("failed to write response: {e}")))?;
    Ok(handled)
}

/// Best-effort `id` of a raw request line; empty when it has none.
fn request_id(line: &str) -> String {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

async fn write_frames<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Serve the process's stdin/stdout.
pub async fn serve_stdio(
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) -> Result<u64, MnemoError> {
    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    serve_lines(dispatcher, reader, tokio::io::stdout(), cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolRegistry};
    use async_trait::async_trait;
    use mnemo_memory::ActivityLog;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Sleeps for `ms` milliseconds, then echoes it.
    struct SleepTool;

    #[async_trait]
    impl Tool for SleepTool {
        fn name(&self) -> &str {
            "sleep"
        }

        fn description(&self) -> &str {
            "Sleeps"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
            let ms = arguments["ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!({"slept": ms}))
        }
    }

    struct PanicTool;

    #[async_trait]
    impl Tool for PanicTool {
        fn name(&self) -> &str {
            "panic"
        }

        fn description(&self) -> &str {
            "Panics"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, _arguments: Value) -> Result<Value, MnemoError> {
            panic!("tool blew up");
        }
    }

    fn dispatcher() -> Arc<Dispatcher> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SleepTool));
        registry.register(Arc::new(PanicTool));
        Arc::new(Dispatcher::new(registry, Arc::new(ActivityLog::new(10))))
    }

    fn parse_frames(bytes: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(bytes)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn responses_arrive_in_completion_order() {
        let input = concat!(
            r#"{"id":"slow","type":"tool_call","data":{"name":"sleep","arguments":{"ms":300}}}"#,
            "\n",
            r#"{"id":"fast","type":"tool_call","data":{"name":"sleep","arguments":{"ms":0}}}"#,
            "\n",
        );
        let (client, server) = tokio::io::duplex(4096);
        let handled = serve_lines(
            dispatcher(),
            input.as_bytes(),
            server,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(handled, 2);

        let mut out = Vec::new();
        let mut client = client;
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut out)
            .await
            .unwrap();
        let frames = parse_frames(&out);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["id"], "fast");
        assert_eq!(frames[1]["id"], "slow");
        assert_eq!(frames[1]["result"]["slept"], 300);
    }

    #[tokio::test]
    async fn malformed_line_gets_error_frame_and_loop_continues() {
        let input = concat!(
            "this is not json\n",
            "\n",
            r#"{"id":"ok","type":"tool_call","data":{"name":"sleep"}}"#,
            "\n",
        );
        let (mut client, server) = tokio::io::duplex(4096);
        let handled = serve_lines(
            dispatcher(),
            input.as_bytes(),
            server,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(handled, 2);

        let mut out = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut out)
            .await
            .unwrap();
        let frames = parse_frames(&out);
        let error = frames.iter().find(|f| f["status"] == "error").unwrap();
        assert!(error["error"].as_str().unwrap().starts_with("InvalidArgument:"));
        assert!(frames.iter().any(|f| f["id"] == "ok" && f["status"] == "ok"));
    }

    #[tokio::test]
    async fn panicking_tool_still_gets_an_error_frame() {
        let input = concat!(
            r#"{"id":"boom","type":"tool_call","data":{"name":"panic"}}"#,
            "\n",
            r#"{"id":"after","type":"tool_call","data":{"name":"sleep"}}"#,
            "\n",
        );
        let (mut client, server) = tokio::io::duplex(4096);
        let handled = serve_lines(
            dispatcher(),
            input.as_bytes(),
            server,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(handled, 2);

        let mut out = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut out)
            .await
            .unwrap();
        let frames = parse_frames(&out);
        assert_eq!(frames.len(), 2);
        let boom = frames.iter().find(|f| f["id"] == "boom").unwrap();
        assert_eq!(boom["status"], "error");
        assert!(boom["error"].as_str().unwrap().starts_with("Internal:"));
        assert!(frames.iter().any(|f| f["id"] == "after" && f["status"] == "ok"));
    }

    #[test]
    fn request_id_tolerates_garbage() {
        assert_eq!(request_id(r#"{"id":"7","type":"tool_call"}"#), "7");
        assert_eq!(request_id("not json"), "");
    }
}
