//! Invocation plans — the planner's per-query output and its execution.
//!
//! A plan is transient: produced for one query, executed strictly in
//! sequence, never persisted. Calls do not receive the outputs of earlier
//! calls; the coordination prompt says so explicitly, so the planner can
//! supply every argument up front.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::peer::{PeerError, ToolDescriptor};
use crate::planner::{parse_structured, PlannerError};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Sampling temperature for coordination. Lower than summarization — plan
/// output feeds a parser, not a reader.
pub const PLAN_TEMPERATURE: f32 = 0.2;

/// Per-tool schema budget inside the coordination prompt.
const SCHEMA_CHAR_BUDGET: usize = 2000;

// ─── Plan Types ──────────────────────────────────────────────────────────────

/// One planned tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannedCall {
    /// Tool name, as declared in the peer's manifest.
    pub name: String,
    /// Arguments the planner supplied up front.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// The planner's answer to one query: zero or more calls, in authoritative
/// order, plus a human-readable explanation.
#[derive(Debug, Clone, Deserialize)]
pub struct InvocationPlan {
    #[serde(default)]
    pub calls: Vec<PlannedCall>,
    #[serde(default)]
    pub explanation: String,
}

/// Result of one planned call: success carries the raw result payload,
/// failure carries the error message. A failure never aborts its siblings.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InvocationOutcome {
    Success {
        tool: String,
        result: serde_json::Value,
    },
    Failure {
        tool: String,
        error: String,
    },
}

impl InvocationOutcome {
    /// The tool this outcome belongs to.
    pub fn tool(&self) -> &str {
        match self {
            InvocationOutcome::Success { tool, .. } => tool,
            InvocationOutcome::Failure { tool, .. } => tool,
        }
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success { .. })
    }
}

// ─── Prompt Builder ──────────────────────────────────────────────────────────

/// Build the coordination prompt: per-peer guidance, the current tool list
/// with schemas, the user's query, and a strict output-shape instruction.
pub fn coordination_prompt(guidance: &str, tools: &[ToolDescriptor], query: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(guidance);
    prompt.push_str("\n\nAvailable tools:\n");
    for tool in tools {
        let mut schema = tool.input_schema.to_string();
        if schema.len() > SCHEMA_CHAR_BUDGET {
            schema.truncate(SCHEMA_CHAR_BUDGET);
            schema.push_str("...(truncated)");
        }
        prompt.push_str(&format!(
            "- {}: {}\n  schema: {}\n",
            tool.name, tool.description, schema
        ));
    }

    prompt.push_str(&format!("\nUser request: {query}\n"));
    prompt.push_str(
        "\nDecide which tools to call, in order, to satisfy the request. \
         Calls run in the order you list them, but no call sees the output \
         of an earlier one — supply every argument up front. \
         Return ONLY a JSON object with exactly these fields and no other text:\n\
         {\n\
         \x20 \"calls\": [{\"name\": \"<tool name>\", \"arguments\": {<arguments object>}}, ...],\n\
         \x20 \"explanation\": \"<one or two sentences on what the calls do>\"\n\
         }\n\
         Use an empty calls array if no tool is needed.\n",
    );

    prompt
}

/// Parse the planner's text output into an invocation plan.
pub fn parse_invocation_plan(text: &str) -> Result<InvocationPlan, PlannerError> {
    parse_structured(text)
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Execute a plan's calls strictly in sequence.
///
/// Each call is isolated: a failure is recorded in that call's outcome and
/// the next call still runs. The returned sequence has one entry per
/// planned call, in plan order.
pub async fn run_plan<F, Fut>(plan: &InvocationPlan, mut invoke: F) -> Vec<InvocationOutcome>
where
    F: FnMut(String, serde_json::Value) -> Fut,
    Fut: Future<Output = Result<serde_json::Value, PeerError>>,
{
    let mut outcomes = Vec::with_capacity(plan.calls.len());

    for call in &plan.calls {
        match invoke(call.name.clone(), call.arguments.clone()).await {
            Ok(result) => {
                tracing::debug!(tool = %call.name, "planned call succeeded");
                outcomes.push(InvocationOutcome::Success {
                    tool: call.name.clone(),
                    result,
                });
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "planned call failed, continuing");
                outcomes.push(InvocationOutcome::Failure {
                    tool: call.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    outcomes
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object"}),
        }
    }

    // ─── Plan parsing ────────────────────────────────────────────────────

    #[test]
    fn parse_plan_happy_path() {
        let text = r#"{"calls":[{"name":"add","arguments":{"a":15,"b":27}}],"explanation":"Adds the two numbers."}"#;
        let plan = parse_invocation_plan(text).unwrap();
        assert_eq!(plan.calls.len(), 1);
        assert_eq!(plan.calls[0].name, "add");
        assert_eq!(plan.calls[0].arguments, serde_json::json!({"a": 15, "b": 27}));
        assert_eq!(plan.explanation, "Adds the two numbers.");
    }

    #[test]
    fn parse_plan_wrapped_in_prose() {
        let text = "Sure, here's the plan:\n```json\n{\"calls\":[],\"explanation\":\"Nothing to do.\"}\n```";
        let plan = parse_invocation_plan(text).unwrap();
        assert!(plan.calls.is_empty());
    }

    #[test]
    fn parse_plan_missing_arguments_defaults_to_null() {
        let text = r#"{"calls":[{"name":"get_current_time"}],"explanation":"Reads the clock."}"#;
        let plan = parse_invocation_plan(text).unwrap();
        assert!(plan.calls[0].arguments.is_null());
    }

    #[test]
    fn parse_plan_rejects_plain_text() {
        let err = parse_invocation_plan("I'll add those numbers for you!").unwrap_err();
        assert!(matches!(err, PlannerError::StructuredOutputError { .. }));
    }

    #[test]
    fn parse_plan_preserves_call_order() {
        let text = r#"{"calls":[{"name":"first","arguments":{}},{"name":"second","arguments":{}},{"name":"third","arguments":{}}],"explanation":"x"}"#;
        let plan = parse_invocation_plan(text).unwrap();
        let names: Vec<_> = plan.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    // ─── Prompt builder ──────────────────────────────────────────────────

    #[test]
    fn prompt_contains_guidance_tools_and_query() {
        let tools = vec![tool("add", "Add two numbers"), tool("echo", "Echo back")];
        let prompt = coordination_prompt("You run a calculator.", &tools, "add 1 and 2");
        assert!(prompt.starts_with("You run a calculator."));
        assert!(prompt.contains("- add: Add two numbers"));
        assert!(prompt.contains("- echo: Echo back"));
        assert!(prompt.contains("User request: add 1 and 2"));
        assert!(prompt.contains("no call sees the output"));
    }

    // ─── Execution ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn run_plan_executes_in_order_with_arguments() {
        let text = r#"{"calls":[{"name":"add","arguments":{"a":15,"b":27}}],"explanation":"add"}"#;
        let plan = parse_invocation_plan(text).unwrap();

        let mut seen: Vec<(String, serde_json::Value)> = Vec::new();
        let outcomes = run_plan(&plan, |name, args| {
            seen.push((name, args));
            async { Ok(serde_json::json!({"content": [{"type": "text", "text": "42"}]})) }
        })
        .await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[0].tool(), "add");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "add");
        assert_eq!(seen[0].1, serde_json::json!({"a": 15, "b": 27}));
    }

    #[tokio::test]
    async fn run_plan_isolates_failures() {
        let text = r#"{"calls":[{"name":"bogus","arguments":{}},{"name":"echo","arguments":{"message":"hi"}}],"explanation":"x"}"#;
        let plan = parse_invocation_plan(text).unwrap();

        let outcomes = run_plan(&plan, |name, _args| async move {
            if name == "bogus" {
                Err(PeerError::ProtocolError {
                    code: -32602,
                    message: format!("unknown tool: {name}"),
                    data: None,
                })
            } else {
                Ok(serde_json::json!({"ok": true}))
            }
        })
        .await;

        // Both calls were attempted; the first failed, the second ran anyway.
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_success());
        assert!(outcomes[1].is_success());

        let json = serde_json::to_value(&outcomes).unwrap();
        assert!(json[0]["error"].is_string());
        assert!(json[0].get("result").is_none());
        assert!(json[1].get("error").is_none());
    }

    #[tokio::test]
    async fn run_plan_empty_calls() {
        let plan = parse_invocation_plan(r#"{"calls":[],"explanation":"nothing"}"#).unwrap();
        let mut invoked = 0;
        let outcomes = run_plan(&plan, |_name, _args| {
            invoked += 1;
            async { Ok(serde_json::Value::Null) }
        })
        .await;
        assert!(outcomes.is_empty());
        assert_eq!(invoked, 0);
    }

    // ─── Outcome serialization ───────────────────────────────────────────

    #[test]
    fn outcome_serializes_to_wire_shape() {
        let ok = InvocationOutcome::Success {
            tool: "add".into(),
            result: serde_json::json!(42),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json, serde_json::json!({"tool": "add", "result": 42}));

        let failed = InvocationOutcome::Failure {
            tool: "sub".into(),
            error: "unknown tool".into(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"tool": "sub", "error": "unknown tool"}));
    }
}
