//! JSON-RPC over stdio transport.
//!
//! Low-level communication with the peer child process:
//! - Writing JSON-RPC requests to stdin
//! - Reading JSON-RPC responses from stdout
//! - Line-delimited JSON protocol (one JSON object per line)

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use super::errors::PeerError;
use super::types::{JsonRpcRequest, JsonRpcResponse};

// ─── Request ID Generator ────────────────────────────────────────────────────

/// Global monotonic request ID counter.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Bi-directional JSON-RPC transport over the peer process's stdio.
#[derive(Debug)]
pub struct StdioTransport {
    writer: Mutex<ChildStdin>,
    reader: Mutex<BufReader<ChildStdout>>,
}

impl StdioTransport {
    /// Create a new transport from the peer process's stdin/stdout.
    pub fn new(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            writer: Mutex::new(stdin),
            reader: Mutex::new(BufReader::new(stdout)),
        }
    }

    /// Send a JSON-RPC request and wait for the matching response.
    ///
    /// Simple request-response pattern: write one line of JSON, read lines
    /// until one parses as a response with a matching `id`.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, PeerError> {
        let id = next_request_id();
        let req = JsonRpcRequest::new(id, method, params);

        let mut json = serde_json::to_string(&req).map_err(|e| PeerError::TransportError {
            reason: format!("failed to serialize request: {e}"),
        })?;
        json.push('\n');

        {
            let mut writer = self.writer.lock().await;
            writer
                .write_all(json.as_bytes())
                .await
                .map_err(|e| PeerError::TransportError {
                    reason: format!("failed to write to stdin: {e}"),
                })?;
            writer.flush().await.map_err(|e| PeerError::TransportError {
                reason: format!("failed to flush stdin: {e}"),
            })?;
        }

        // Read response lines until we find one with matching id
        let mut line_buf = String::new();
        let mut reader = self.reader.lock().await;

        loop {
            line_buf.clear();
            let bytes_read =
                reader
                    .read_line(&mut line_buf)
                    .await
                    .map_err(|e| PeerError::TransportError {
                        reason: format!("failed to read from stdout: {e}"),
                    })?;

            if bytes_read == 0 {
                return Err(PeerError::TransportError {
                    reason: "peer stdout closed (process may have exited)".into(),
                });
            }

            let trimmed = line_buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(resp) if resp.id == id => return Ok(resp),
                Ok(_) => {
                    // Response for a different request ID — skip. The engine
                    // issues requests one at a time, but a peer may emit
                    // stale responses after a timeout.
                    continue;
                }
                Err(_) => {
                    // Not a JSON-RPC response — could be peer log output.
                    // Skip and keep reading.
                    continue;
                }
            }
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), PeerError> {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });

        let mut json =
            serde_json::to_string(&notification).map_err(|e| PeerError::TransportError {
                reason: format!("failed to serialize notification: {e}"),
            })?;
        json.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| PeerError::TransportError {
                reason: format!("failed to write notification: {e}"),
            })?;
        writer.flush().await.map_err(|e| PeerError::TransportError {
            reason: format!("failed to flush notification: {e}"),
        })?;

        Ok(())
    }
}

// ─── Response Helpers ────────────────────────────────────────────────────────

/// Extract the result from a JSON-RPC response, converting errors to `PeerError`.
pub fn extract_result(response: JsonRpcResponse) -> Result<serde_json::Value, PeerError> {
    if let Some(err) = response.error {
        return Err(PeerError::ProtocolError {
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }

    response.result.ok_or(PeerError::ProtocolError {
        code: -32603,
        message: "response missing both result and error".into(),
        data: None,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
