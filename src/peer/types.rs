//! Shared types for the peer protocol.
//!
//! JSON-RPC 2.0 message types and the capability descriptors a peer
//! declares (tools, resources, prompts).

use serde::{Deserialize, Serialize};

// ─── JSON-RPC 2.0 ───────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: &str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response message (success or error).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: u64,
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ─── Connection Spec ────────────────────────────────────────────────────────

/// How to spawn (or re-spawn) a peer process.
///
/// Persisted inside the expert descriptor so a serve session can re-reach
/// the same peer the discovery run talked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ConnectionSpec {
    /// Build a spec from an executable path and its argument list.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Single-line rendering for logs and error messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

// ─── Capability Descriptors ─────────────────────────────────────────────────

/// A tool declared by the peer via `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "inputSchema", alias = "input_schema")]
    pub input_schema: serde_json::Value,
}

/// An addressable read-only item declared via `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A reusable prompt template declared via `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ─── List Payloads ──────────────────────────────────────────────────────────

/// `tools/list` response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolListResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// `resources/list` response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceListResult {
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// `prompts/list` response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptListResult {
    #[serde(default)]
    pub prompts: Vec<PromptDescriptor>,
}

/// `initialize` response payload. Only the server identity is interesting;
/// capability enumeration happens through the list methods afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(default)]
    pub capabilities: serde_json::Value,
    #[serde(default, alias = "serverInfo")]
    pub server_info: Option<ServerInfo>,
}

/// Peer identity returned in the initialize response.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_serialization() {
        let req = JsonRpcRequest::new(1, "initialize", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
        // params should be omitted when None
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_json_rpc_request_with_params() {
        let params = serde_json::json!({"name": "add", "arguments": {"a": 1, "b": 2}});
        let req = JsonRpcRequest::new(42, "tools/call", Some(params));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"id\":42"));
        assert!(json.contains("tools/call"));
        assert!(json.contains("arguments"));
    }

    #[test]
    fn test_json_rpc_response_deserialization() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, 1);
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_json_rpc_error_response() {
        let json = r#"{
            "jsonrpc": "2.0",
            "id": 2,
            "result": null,
            "error": {"code": -32601, "message": "Method not found"}
        }"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn test_tool_descriptor_accepts_camel_case_schema() {
        let json = r#"{"name": "echo", "description": "Echo back", "inputSchema": {"type": "object"}}"#;
        let tool: ToolDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "echo");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_descriptor_defaults() {
        let json = r#"{"name": "bare"}"#;
        let tool: ToolDescriptor = serde_json::from_str(json).unwrap();
        assert!(tool.description.is_empty());
        assert!(tool.input_schema.is_null());
    }

    #[test]
    fn test_list_payloads_default_empty() {
        let tools: ToolListResult = serde_json::from_str("{}").unwrap();
        assert!(tools.tools.is_empty());
        let resources: ResourceListResult = serde_json::from_str("{}").unwrap();
        assert!(resources.resources.is_empty());
        let prompts: PromptListResult = serde_json::from_str("{}").unwrap();
        assert!(prompts.prompts.is_empty());
    }

    #[test]
    fn test_connection_spec_display() {
        let spec = ConnectionSpec::new("python3", vec!["-m".into(), "server".into()]);
        assert_eq!(spec.display(), "python3 -m server");
        let bare = ConnectionSpec::new("my-peer", vec![]);
        assert_eq!(bare.display(), "my-peer");
    }

    #[test]
    fn test_connection_spec_camel_case_round_trip() {
        let spec = ConnectionSpec::new("npx", vec!["tsx".into(), "src/index.ts".into()]);
        let json = serde_json::to_string(&spec).unwrap();
        let back: ConnectionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.command, "npx");
        assert_eq!(back.args.len(), 2);
    }
}
