//! Peer protocol error types.

use thiserror::Error;

/// Errors that can occur while talking to the wrapped peer.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The peer process failed to start.
    #[error("failed to spawn peer '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// The initialize handshake failed or timed out.
    #[error("peer '{command}' handshake failed: {reason}")]
    HandshakeFailed { command: String, reason: String },

    /// JSON-RPC communication error (malformed message, I/O error, EOF).
    #[error("peer transport error: {reason}")]
    TransportError { reason: String },

    /// The peer returned a JSON-RPC error response.
    #[error("peer error [{code}]: {message}")]
    ProtocolError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// A tool invocation reported failure in its result payload.
    #[error("tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// A request did not complete within the allowed time.
    #[error("peer request '{method}' timed out after {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },

    /// A response payload did not match the expected shape.
    #[error("unexpected payload from '{method}': {reason}")]
    MalformedPayload { method: String, reason: String },
}
