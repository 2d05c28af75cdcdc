//! Peer client — one live connection to a wrapped tool server.
//!
//! Spawns the peer as a child process, performs the initialize handshake,
//! and exposes the four protocol operations the engines need: listing
//! tools/resources/prompts and invoking a tool. The process and its
//! transport are owned exclusively by this client; dropping it without
//! calling [`PeerClient::shutdown`] leaves the child to the OS, so both
//! engines close explicitly on every exit path.

use std::time::Duration;

use tokio::process::{Child, Command};

use super::errors::PeerError;
use super::transport::{extract_result, StdioTransport};
use super::types::{
    ConnectionSpec, InitializeResult, PromptDescriptor, PromptListResult, ResourceDescriptor,
    ResourceListResult, ToolDescriptor, ToolListResult,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Timeout for the initialize handshake.
///
/// Generous because interpreter-hosted peers (Python, Node) can take
/// seconds to import their runtime before answering.
const INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single tool invocation.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a capability list request.
const LIST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for graceful shutdown before force-killing.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Protocol revision sent in the initialize handshake.
const PROTOCOL_VERSION: &str = "2024-11-05";

// ─── PeerClient ──────────────────────────────────────────────────────────────

/// A running peer process with its transport.
#[derive(Debug)]
pub struct PeerClient {
    /// The connection spec this client was spawned from.
    spec: ConnectionSpec,
    /// The child process handle.
    process: Child,
    /// JSON-RPC transport (stdin/stdout).
    transport: StdioTransport,
    /// Peer-reported identity, if it sent one during the handshake.
    peer_name: Option<String>,
}

impl PeerClient {
    /// Spawn the peer and perform the initialize handshake.
    ///
    /// Any failure here — spawn, handshake error, handshake timeout — is a
    /// connection-stage error; the child is killed before returning so no
    /// orphan process outlives a failed connect.
    pub async fn connect(spec: &ConnectionSpec) -> Result<Self, PeerError> {
        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args);

        // Windows: prevent a console window from appearing for the child
        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        // Wire stdio for JSON-RPC
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped()); // Capture stderr for diagnostics

        let mut child = cmd.spawn().map_err(|e| PeerError::SpawnFailed {
            command: spec.display(),
            reason: format!("{e}"),
        })?;

        let stdin = child.stdin.take().ok_or(PeerError::SpawnFailed {
            command: spec.display(),
            reason: "failed to capture stdin".into(),
        })?;

        let stdout = child.stdout.take().ok_or(PeerError::SpawnFailed {
            command: spec.display(),
            reason: "failed to capture stdout".into(),
        })?;

        let stderr_handle = child.stderr.take();

        let transport = StdioTransport::new(stdin, stdout);

        let peer_name = match tokio::time::timeout(INIT_TIMEOUT, initialize(&transport)).await {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                let stderr_ctx = read_stderr_on_failure(stderr_handle).await;
                let _ = child.kill().await;
                return Err(PeerError::HandshakeFailed {
                    command: spec.display(),
                    reason: format!("{e}{}", format_stderr_suffix(&stderr_ctx)),
                });
            }
            Err(_) => {
                let stderr_ctx = read_stderr_on_failure(stderr_handle).await;
                let _ = child.kill().await;
                return Err(PeerError::HandshakeFailed {
                    command: spec.display(),
                    reason: format!(
                        "handshake timed out after {}s{}",
                        INIT_TIMEOUT.as_secs(),
                        format_stderr_suffix(&stderr_ctx)
                    ),
                });
            }
        };

        tracing::info!(
            command = %spec.display(),
            peer = peer_name.as_deref().unwrap_or("unknown"),
            "connected to peer"
        );

        Ok(Self {
            spec: spec.clone(),
            process: child,
            transport,
            peer_name,
        })
    }

    /// The peer-reported identity from the handshake, if any.
    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref()
    }

    /// The connection spec this client was spawned from.
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    // ─── Capability Enumeration ──────────────────────────────────────────

    /// Request the peer's tool list.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, PeerError> {
        let result = self.list_request("tools/list").await?;
        let parsed: ToolListResult =
            serde_json::from_value(result).map_err(|e| PeerError::MalformedPayload {
                method: "tools/list".into(),
                reason: e.to_string(),
            })?;
        Ok(parsed.tools)
    }

    /// Request the peer's resource list.
    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, PeerError> {
        let result = self.list_request("resources/list").await?;
        let parsed: ResourceListResult =
            serde_json::from_value(result).map_err(|e| PeerError::MalformedPayload {
                method: "resources/list".into(),
                reason: e.to_string(),
            })?;
        Ok(parsed.resources)
    }

    /// Request the peer's prompt list.
    pub async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, PeerError> {
        let result = self.list_request("prompts/list").await?;
        let parsed: PromptListResult =
            serde_json::from_value(result).map_err(|e| PeerError::MalformedPayload {
                method: "prompts/list".into(),
                reason: e.to_string(),
            })?;
        Ok(parsed.prompts)
    }

    async fn list_request(&self, method: &str) -> Result<serde_json::Value, PeerError> {
        let response = tokio::time::timeout(LIST_TIMEOUT, self.transport.request(method, None))
            .await
            .map_err(|_| PeerError::Timeout {
                method: method.to_string(),
                timeout_ms: LIST_TIMEOUT.as_millis() as u64,
            })??;
        extract_result(response)
    }

    // ─── Tool Invocation ─────────────────────────────────────────────────

    /// Invoke a named tool with the supplied arguments.
    ///
    /// Returns the raw result payload on success. A JSON-RPC error, an
    /// `isError` result payload, and a timeout all surface as `Err` — the
    /// caller decides whether that aborts anything (at serve time it never
    /// aborts sibling calls).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, PeerError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });

        let response = tokio::time::timeout(
            CALL_TIMEOUT,
            self.transport.request("tools/call", Some(params)),
        )
        .await
        .map_err(|_| PeerError::Timeout {
            method: format!("tools/call({name})"),
            timeout_ms: CALL_TIMEOUT.as_millis() as u64,
        })??;

        let result = extract_result(response)?;

        // Tool-level failure reported inside a successful RPC envelope
        if result.get("isError").and_then(|v| v.as_bool()) == Some(true) {
            return Err(PeerError::ToolFailed {
                tool: name.to_string(),
                reason: error_text_from_content(&result),
            });
        }

        Ok(result)
    }

    // ─── Shutdown ────────────────────────────────────────────────────────

    /// Attempt to gracefully shut down the peer.
    pub async fn shutdown(mut self) -> Result<(), PeerError> {
        // Best-effort shutdown notification
        let _ = self.transport.notify("shutdown", None).await;

        let result = tokio::time::timeout(SHUTDOWN_TIMEOUT, self.process.wait()).await;

        match result {
            Ok(Ok(_)) => Ok(()),
            _ => {
                // Force kill if graceful shutdown failed/timed out
                let _ = self.process.kill().await;
                Ok(())
            }
        }
    }
}

// ─── Handshake ───────────────────────────────────────────────────────────────

/// Perform the initialize handshake, returning the peer-reported name.
async fn initialize(transport: &StdioTransport) -> Result<Option<String>, PeerError> {
    let params = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "toolsage",
            "version": env!("CARGO_PKG_VERSION"),
        },
    });

    let response = transport.request("initialize", Some(params)).await?;
    let result = extract_result(response)?;

    let init: InitializeResult =
        serde_json::from_value(result).map_err(|e| PeerError::MalformedPayload {
            method: "initialize".into(),
            reason: format!("failed to parse initialize response: {e}"),
        })?;

    // The peer may only issue requests after this notification
    transport.notify("notifications/initialized", None).await?;

    Ok(init.server_info.and_then(|info| info.name))
}

// ─── Diagnostics ─────────────────────────────────────────────────────────────

/// Read any available stderr output from a failed peer process.
///
/// Uses a short timeout to avoid blocking if stderr is empty or the process
/// is still writing. Truncates to 2000 chars to keep log messages readable.
async fn read_stderr_on_failure(stderr_handle: Option<tokio::process::ChildStderr>) -> String {
    use tokio::io::AsyncReadExt;

    let Some(mut stderr) = stderr_handle else {
        return String::new();
    };

    let mut buf = String::new();
    match tokio::time::timeout(Duration::from_millis(500), stderr.read_to_string(&mut buf)).await {
        Ok(Ok(_)) => {
            if buf.len() > 2000 {
                buf.truncate(2000);
                buf.push_str("...(truncated)");
            }
            buf
        }
        _ => String::new(),
    }
}

/// Format a stderr suffix for error messages (empty string if no stderr).
fn format_stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(" | stderr: {}", stderr.trim())
    }
}

/// Pull the first text block out of an `isError` result payload.
fn error_text_from_content(result: &serde_json::Value) -> String {
    result
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| {
            blocks
                .iter()
                .find_map(|b| b.get("text").and_then(|t| t.as_str()))
        })
        .unwrap_or("tool reported an error without details")
        .to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_text_from_content() {
        let result = serde_json::json!({
            "isError": true,
            "content": [{"type": "text", "text": "division by zero"}],
        });
        assert_eq!(error_text_from_content(&result), "division by zero");
    }

    #[test]
    fn test_error_text_missing_content() {
        let result = serde_json::json!({"isError": true});
        assert_eq!(
            error_text_from_content(&result),
            "tool reported an error without details"
        );
    }

    #[test]
    fn test_format_stderr_suffix() {
        assert_eq!(format_stderr_suffix(""), "");
        assert_eq!(
            format_stderr_suffix("boom\n"),
            " | stderr: boom".to_string()
        );
    }

    #[tokio::test]
    async fn test_connect_rejects_missing_executable() {
        let spec = ConnectionSpec::new("/nonexistent/peer-binary", vec![]);
        let err = PeerClient::connect(&spec).await.unwrap_err();
        assert!(matches!(err, PeerError::SpawnFailed { .. }));
    }
}
