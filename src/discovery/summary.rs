//! Peer summarization — the planner-facing half of discovery.
//!
//! Builds the summarization prompt from a capability manifest and defines
//! the structured shape the planner is asked to return.

use serde::Deserialize;

use crate::expert::CapabilityManifest;
use crate::peer::ConnectionSpec;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Sampling temperature for summarization. Low — identity strings should
/// come out the same way twice for the same manifest.
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Per-tool schema budget inside the prompt. A single pathological schema
/// must not crowd out the rest of the manifest.
const SCHEMA_CHAR_BUDGET: usize = 2000;

// ─── Planner Output Shape ────────────────────────────────────────────────────

/// What the planner must return when asked to summarize a peer.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerSummary {
    /// Identity name, e.g. "Filesystem Expert".
    pub name: String,
    /// One-paragraph identity description.
    pub description: String,
    /// Free-text guidance for coordinating with this specific peer.
    pub guidance: String,
    /// Echo of the capability names the planner saw.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

// ─── Prompt Builder ──────────────────────────────────────────────────────────

/// Build the summarization prompt for a manifest.
pub fn summarization_prompt(spec: &ConnectionSpec, manifest: &CapabilityManifest) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are cataloging a tool server so it can be wrapped as a \
         natural-language expert.\n\n",
    );
    prompt.push_str(&format!("Server command: {}\n\n", spec.display()));
    prompt.push_str(&format!(
        "Declared capabilities: {} tools, {} resources, {} prompts.\n\n",
        manifest.tools.len(),
        manifest.resources.len(),
        manifest.prompts.len()
    ));

    prompt.push_str("Tools:\n");
    for tool in &manifest.tools {
        let schema = truncate_schema(&tool.input_schema);
        prompt.push_str(&format!(
            "- {}: {}\n  schema: {}\n",
            tool.name, tool.description, schema
        ));
    }

    if !manifest.resources.is_empty() {
        prompt.push_str("\nResources:\n");
        for resource in &manifest.resources {
            prompt.push_str(&format!(
                "- {} ({}){}\n",
                resource.name,
                resource.uri,
                resource
                    .description
                    .as_deref()
                    .map(|d| format!(": {d}"))
                    .unwrap_or_default()
            ));
        }
    }

    if !manifest.prompts.is_empty() {
        prompt.push_str("\nPrompt templates:\n");
        for p in &manifest.prompts {
            prompt.push_str(&format!(
                "- {}{}\n",
                p.name,
                p.description
                    .as_deref()
                    .map(|d| format!(": {d}"))
                    .unwrap_or_default()
            ));
        }
    }

    prompt.push_str(
        "\nReturn ONLY a JSON object with exactly these fields and no other text:\n\
         {\n\
         \x20 \"name\": \"<short expert name, 2-4 words ending in 'Expert'>\",\n\
         \x20 \"description\": \"<one paragraph: what this server does and when to use it>\",\n\
         \x20 \"guidance\": \"<instructions to a planner on how to pick tools and build \
         arguments for this server's capabilities>\",\n\
         \x20 \"capabilities\": [\"<tool name>\", ...]\n\
         }\n",
    );

    prompt
}

/// Render a tool schema compactly, truncating oversized ones.
fn truncate_schema(schema: &serde_json::Value) -> String {
    let mut rendered = schema.to_string();
    if rendered.len() > SCHEMA_CHAR_BUDGET {
        rendered.truncate(SCHEMA_CHAR_BUDGET);
        rendered.push_str("...(truncated)");
    }
    rendered
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{ResourceDescriptor, ToolDescriptor};

    fn manifest() -> CapabilityManifest {
        CapabilityManifest {
            tools: vec![ToolDescriptor {
                name: "read_file".into(),
                description: "Read a file".into(),
                input_schema: serde_json::json!({"type": "object", "properties": {"path": {"type": "string"}}}),
            }],
            resources: vec![ResourceDescriptor {
                uri: "file:///etc/hosts".into(),
                name: "hosts".into(),
                description: Some("host mappings".into()),
            }],
            prompts: vec![],
        }
    }

    #[test]
    fn test_prompt_mentions_tools_and_counts() {
        let spec = ConnectionSpec::new("fs-server", vec![]);
        let prompt = summarization_prompt(&spec, &manifest());
        assert!(prompt.contains("read_file"));
        assert!(prompt.contains("1 tools, 1 resources, 0 prompts"));
        assert!(prompt.contains("fs-server"));
        assert!(prompt.contains("file:///etc/hosts"));
        // empty prompt section is omitted entirely
        assert!(!prompt.contains("Prompt templates:"));
    }

    #[test]
    fn test_prompt_demands_json_only() {
        let spec = ConnectionSpec::new("fs-server", vec![]);
        let prompt = summarization_prompt(&spec, &manifest());
        assert!(prompt.contains("ONLY a JSON object"));
        assert!(prompt.contains("\"guidance\""));
    }

    #[test]
    fn test_schema_truncation() {
        let big = serde_json::json!({"description": "x".repeat(5000)});
        let rendered = truncate_schema(&big);
        assert!(rendered.len() < 2100);
        assert!(rendered.ends_with("...(truncated)"));
    }

    #[test]
    fn test_peer_summary_parses_without_capabilities() {
        let json = r#"{"name":"FS Expert","description":"d","guidance":"g"}"#;
        let summary: PeerSummary = serde_json::from_str(json).unwrap();
        assert!(summary.capabilities.is_empty());
        assert_eq!(summary.name, "FS Expert");
    }
}
