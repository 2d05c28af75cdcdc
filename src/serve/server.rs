//! Serving transport — line-delimited JSON-RPC over this process's stdio.
//!
//! Mirrors the peer-side transport discipline from the other end: one
//! request per line on stdin, one response per line on stdout, handled
//! strictly one at a time. Exactly one tool — the expert entry point — is
//! registered; anything else is rejected. Logs go to the tracing file
//! sink, never to stdout, which belongs to the protocol.

use std::future::Future;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::engine::CoordinationEngine;
use super::errors::ServeError;

// ─── JSON-RPC Error Codes ────────────────────────────────────────────────────

const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// Protocol revision echoed in the initialize response.
const PROTOCOL_VERSION: &str = "2024-11-05";

// ─── Serve Loop ──────────────────────────────────────────────────────────────

/// Serve the engine over stdio until stdin closes or `shutdown` resolves.
///
/// Shutdown order: stop reading, close the peer connection, then close the
/// serving transport. Both closes are attempted even if one errors.
pub async fn serve(
    engine: CoordinationEngine,
    shutdown: impl Future<Output = ()>,
) -> Result<(), ServeError> {
    let mut stdout = tokio::io::stdout();

    let outcome = read_loop(&engine, &mut stdout, shutdown).await;

    // Peer first, then transport — each best-effort.
    engine.shutdown().await;
    if let Err(e) = stdout.shutdown().await {
        tracing::warn!(error = %e, "serving transport close reported an error");
    }
    tracing::info!("serve session stopped");

    outcome
}

/// The Serving state: loop over queries until EOF or shutdown.
async fn read_loop(
    engine: &CoordinationEngine,
    stdout: &mut tokio::io::Stdout,
    shutdown: impl Future<Output = ()>,
) -> Result<(), ServeError> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line_buf = String::new();
    tokio::pin!(shutdown);

    tracing::info!(entry_point = %engine.entry_point(), "serving");

    loop {
        line_buf.clear();

        let bytes_read = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown requested");
                return Ok(());
            }
            read = reader.read_line(&mut line_buf) => {
                read.map_err(|e| ServeError::Transport {
                    reason: format!("failed to read from stdin: {e}"),
                })?
            }
        };

        if bytes_read == 0 {
            tracing::info!("stdin closed, stopping");
            return Ok(());
        }

        let trimmed = line_buf.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(response) = handle_line(engine, trimmed).await {
            let mut out = response.to_string();
            out.push('\n');
            stdout
                .write_all(out.as_bytes())
                .await
                .map_err(|e| ServeError::Transport {
                    reason: format!("failed to write to stdout: {e}"),
                })?;
            stdout.flush().await.map_err(|e| ServeError::Transport {
                reason: format!("failed to flush stdout: {e}"),
            })?;
        }
    }
}

// ─── Message Handling ────────────────────────────────────────────────────────

/// Handle one incoming line. Returns the response document, or `None` for
/// notifications and unparsable noise (which gets logged, not answered).
async fn handle_line(engine: &CoordinationEngine, line: &str) -> Option<serde_json::Value> {
    let message: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unparsable line on serving transport");
            return None;
        }
    };

    let method = message.get("method").and_then(|m| m.as_str());
    let id = message.get("id").cloned();
    let params = message
        .get("params")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    let Some(method) = method else {
        // A response or malformed frame — nothing we issue requests for.
        return id.map(|id| {
            error_response(&id, INVALID_REQUEST, "expected a request with a method")
        });
    };

    // Notifications get no response.
    let Some(id) = id else {
        tracing::debug!(method = %method, "notification received");
        return None;
    };

    match dispatch(engine, method, &params).await {
        Ok(result) => Some(success_response(&id, result)),
        Err((code, message)) => Some(error_response(&id, code, &message)),
    }
}

/// Route one request to its handler.
async fn dispatch(
    engine: &CoordinationEngine,
    method: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, (i32, String)> {
    match method {
        "initialize" => Ok(serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": "toolsage",
                "version": env!("CARGO_PKG_VERSION"),
            },
        })),

        "ping" => Ok(serde_json::json!({})),

        "tools/list" => Ok(serde_json::json!({
            "tools": [entry_point_tool(
                engine.entry_point(),
                &engine.descriptor().description,
            )],
        })),

        "tools/call" => {
            let requested = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
            if requested != engine.entry_point() {
                let err = ServeError::UnknownEntryPoint {
                    requested: requested.to_string(),
                    registered: engine.entry_point().to_string(),
                };
                return Err((INVALID_PARAMS, err.to_string()));
            }

            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or(serde_json::json!({}));

            match engine.handle_query(&arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result)
                        .unwrap_or_else(|_| result.to_string());
                    Ok(serde_json::json!({
                        "content": [{"type": "text", "text": text}],
                    }))
                }
                Err(e) => Err((error_code_for(&e), e.to_string())),
            }
        }

        other => Err((METHOD_NOT_FOUND, format!("unknown method '{other}'"))),
    }
}

// ─── Response Builders ───────────────────────────────────────────────────────

/// The single tool this server declares.
fn entry_point_tool(name: &str, description: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language request for this expert",
                },
                "mode": {
                    "type": "string",
                    "enum": ["discover", "execute", "explain"],
                    "description": "discover: list live capabilities; execute: plan and run tool calls (default); explain: describe this expert",
                },
            },
            "required": ["query"],
        },
    })
}

fn success_response(id: &serde_json::Value, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn error_response(id: &serde_json::Value, code: i32, message: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": code, "message": message},
    })
}

/// Map a per-query engine error to a JSON-RPC error code.
fn error_code_for(err: &ServeError) -> i32 {
    match err {
        ServeError::InvalidQuery { .. } | ServeError::UnknownEntryPoint { .. } => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_point_tool_shape() {
        let tool = entry_point_tool("calculator_expert", "Does arithmetic.");
        assert_eq!(tool["name"], "calculator_expert");
        assert_eq!(tool["inputSchema"]["required"], serde_json::json!(["query"]));
        let modes = &tool["inputSchema"]["properties"]["mode"]["enum"];
        assert_eq!(modes, &serde_json::json!(["discover", "execute", "explain"]));
    }

    #[test]
    fn test_success_response_echoes_id() {
        let resp = success_response(&serde_json::json!(7), serde_json::json!({"ok": true}));
        assert_eq!(resp["jsonrpc"], "2.0");
        assert_eq!(resp["id"], 7);
        assert_eq!(resp["result"]["ok"], true);
    }

    #[test]
    fn test_error_response_shape() {
        let resp = error_response(&serde_json::json!("abc"), METHOD_NOT_FOUND, "unknown");
        assert_eq!(resp["id"], "abc");
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(resp["error"]["message"], "unknown");
        assert!(resp.get("result").is_none());
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            error_code_for(&ServeError::InvalidQuery { reason: "x".into() }),
            INVALID_PARAMS
        );
        assert_eq!(
            error_code_for(&ServeError::UnknownEntryPoint {
                requested: "a".into(),
                registered: "b".into(),
            }),
            INVALID_PARAMS
        );
        assert_eq!(
            error_code_for(&ServeError::Coordination { reason: "x".into() }),
            INTERNAL_ERROR
        );
        assert_eq!(
            error_code_for(&ServeError::Enumeration { reason: "x".into() }),
            INTERNAL_ERROR
        );
    }
}
