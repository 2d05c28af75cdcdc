//! Coordination engine — one serve session over one wrapped peer.
//!
//! Owns the session's two outbound connections (peer + planner) and
//! answers queries through a single entry point in three modes. Queries
//! are handled one at a time to completion; the peer connection is never
//! exposed for direct external use.

use std::path::Path;

use uuid::Uuid;

use super::errors::ServeError;
use super::plan::{
    coordination_prompt, parse_invocation_plan, run_plan, PLAN_TEMPERATURE,
};
use crate::expert::ExpertDescriptor;
use crate::peer::PeerClient;
use crate::planner::{PlannerClient, PlannerConfig, PlannerError};

// ─── Query Arguments ─────────────────────────────────────────────────────────

/// The three ways to address an expert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Re-enumerate the peer's live capabilities. No planner involved.
    Discover,
    /// Plan and run tool calls for the query (the default).
    Execute,
    /// Describe the expert and how to use it. No planner involved.
    Explain,
}

impl QueryMode {
    /// Parse an optional mode string. Absent defaults to `Execute`;
    /// anything outside the three known modes is a caller error, rejected
    /// before any peer or planner activity.
    pub fn parse(mode: Option<&str>) -> Result<Self, ServeError> {
        match mode {
            None => Ok(QueryMode::Execute),
            Some("discover") => Ok(QueryMode::Discover),
            Some("execute") => Ok(QueryMode::Execute),
            Some("explain") => Ok(QueryMode::Explain),
            Some(other) => Err(ServeError::InvalidQuery {
                reason: format!(
                    "unknown mode '{other}' (expected discover, execute, or explain)"
                ),
            }),
        }
    }
}

/// Parsed `{query, mode}` arguments of one entry-point invocation.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub query: String,
    pub mode: QueryMode,
}

impl QueryArgs {
    /// Pull query + mode out of the raw arguments object.
    pub fn from_value(args: &serde_json::Value) -> Result<Self, ServeError> {
        let query = args
            .get("query")
            .and_then(|q| q.as_str())
            .ok_or(ServeError::InvalidQuery {
                reason: "missing required string field 'query'".into(),
            })?
            .to_string();

        let mode = match args.get("mode") {
            None | Some(serde_json::Value::Null) => QueryMode::parse(None)?,
            Some(serde_json::Value::String(s)) => QueryMode::parse(Some(s.as_str()))?,
            Some(other) => {
                return Err(ServeError::InvalidQuery {
                    reason: format!("'mode' must be a string, got {other}"),
                })
            }
        };

        Ok(Self { query, mode })
    }
}

// ─── CoordinationEngine ──────────────────────────────────────────────────────

/// One serve session: descriptor + live peer connection + planner client.
pub struct CoordinationEngine {
    descriptor: ExpertDescriptor,
    entry_point: String,
    session_id: Uuid,
    peer: PeerClient,
    planner: PlannerClient,
}

impl CoordinationEngine {
    /// Load a descriptor and bring the session to the Connected state.
    ///
    /// Order matters: credential check (no network), descriptor load and
    /// validation (no network), peer connect. Any failure here terminates
    /// the session before it ever serves.
    pub async fn load(
        descriptor_path: &Path,
        planner_config: PlannerConfig,
    ) -> Result<Self, ServeError> {
        let planner = PlannerClient::new(planner_config).map_err(|e| match e {
            PlannerError::MissingCredential { .. } => ServeError::MissingCredential {
                reason: e.to_string(),
            },
            other => ServeError::ConfigLoad {
                reason: other.to_string(),
            },
        })?;

        let descriptor =
            ExpertDescriptor::load(descriptor_path).map_err(|e| ServeError::ConfigLoad {
                reason: e.to_string(),
            })?;

        let entry_point = descriptor.entry_point_name();

        let peer = PeerClient::connect(&descriptor.connection_spec)
            .await
            .map_err(|e| ServeError::PeerConnect {
                reason: e.to_string(),
            })?;

        let session_id = Uuid::new_v4();
        tracing::info!(
            session = %session_id,
            expert = %descriptor.name,
            entry_point = %entry_point,
            tools = descriptor.provenance.tool_count,
            "coordination session connected"
        );

        Ok(Self {
            descriptor,
            entry_point,
            session_id,
            peer,
            planner,
        })
    }

    /// The single entry-point name this session registers.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// The descriptor this session serves (read-only for the session's life).
    pub fn descriptor(&self) -> &ExpertDescriptor {
        &self.descriptor
    }

    /// This session's log-correlation id.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    // ─── Query Handling ──────────────────────────────────────────────────

    /// Answer one entry-point invocation. Argument problems are rejected
    /// before any peer or planner activity.
    pub async fn handle_query(
        &self,
        args: &serde_json::Value,
    ) -> Result<serde_json::Value, ServeError> {
        let args = QueryArgs::from_value(args)?;

        tracing::info!(
            session = %self.session_id,
            mode = ?args.mode,
            query_chars = args.query.len(),
            "handling query"
        );

        match args.mode {
            QueryMode::Discover => self.discover_mode().await,
            QueryMode::Explain => self.explain_mode().await,
            QueryMode::Execute => self.execute_mode(&args.query).await,
        }
    }

    /// Re-enumerate the peer's live capabilities. A fresh read each call —
    /// the manifest is not assumed stable across the session. The three
    /// enumerations are independent reads and run concurrently; tools are
    /// mandatory, the other two degrade to empty.
    async fn discover_mode(&self) -> Result<serde_json::Value, ServeError> {
        let (tools, resources, prompts) = tokio::join!(
            self.peer.list_tools(),
            self.peer.list_resources(),
            self.peer.list_prompts(),
        );

        let tools = tools.map_err(|e| ServeError::Enumeration {
            reason: e.to_string(),
        })?;

        let resources = resources.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "peer does not list resources");
            Vec::new()
        });
        let prompts = prompts.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "peer does not list prompts");
            Vec::new()
        });

        Ok(serde_json::json!({
            "summary": format!(
                "{} tools, {} resources, {} prompts",
                tools.len(),
                resources.len(),
                prompts.len()
            ),
            "tools": tools,
            "resources": resources,
            "prompts": prompts,
        }))
    }

    /// Describe the expert: identity, guidance, current tool names, usage.
    async fn explain_mode(&self) -> Result<serde_json::Value, ServeError> {
        let tools = self
            .peer
            .list_tools()
            .await
            .map_err(|e| ServeError::Enumeration {
                reason: e.to_string(),
            })?;

        let tool_names = tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(serde_json::json!({
            "description": self.descriptor.description,
            "guidance": self.descriptor.guidance,
            "tools": tool_names,
            "usage": format!(
                "Call '{}' with {{\"query\": \"<natural language request>\"}} and an \
                 optional \"mode\" of \"discover\", \"execute\", or \"explain\" \
                 (default: execute).",
                self.entry_point
            ),
        }))
    }

    /// Plan tool calls for the query and run them strictly in sequence.
    async fn execute_mode(&self, query: &str) -> Result<serde_json::Value, ServeError> {
        // Fresh tool list — the plan must target what the peer serves now,
        // not what discovery saw.
        let tools = self
            .peer
            .list_tools()
            .await
            .map_err(|e| ServeError::Enumeration {
                reason: e.to_string(),
            })?;

        let prompt = coordination_prompt(&self.descriptor.guidance, &tools, query);

        let raw = self
            .planner
            .generate(&prompt, PLAN_TEMPERATURE)
            .await
            .map_err(|e| ServeError::Coordination {
                reason: e.to_string(),
            })?;

        let plan = parse_invocation_plan(&raw).map_err(|e| {
            tracing::warn!(
                session = %self.session_id,
                raw = %e.raw_response().unwrap_or(""),
                "planner output did not parse into a plan"
            );
            ServeError::Coordination {
                reason: e.to_string(),
            }
        })?;

        tracing::info!(
            session = %self.session_id,
            calls = plan.calls.len(),
            "executing invocation plan"
        );

        let results = run_plan(&plan, |name, args| async move {
            self.peer.call_tool(&name, args).await
        })
        .await;

        Ok(serde_json::json!({
            "explanation": plan.explanation,
            "results": results,
        }))
    }

    // ─── Shutdown ────────────────────────────────────────────────────────

    /// Close the peer connection. Best-effort: a close failure is logged,
    /// never propagated, so the rest of shutdown proceeds.
    pub async fn shutdown(self) {
        tracing::info!(session = %self.session_id, "closing peer connection");
        if let Err(e) = self.peer.shutdown().await {
            tracing::warn!(error = %e, "peer shutdown reported an error");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_execute() {
        assert_eq!(QueryMode::parse(None).unwrap(), QueryMode::Execute);
    }

    #[test]
    fn test_mode_accepts_known_values() {
        assert_eq!(QueryMode::parse(Some("discover")).unwrap(), QueryMode::Discover);
        assert_eq!(QueryMode::parse(Some("execute")).unwrap(), QueryMode::Execute);
        assert_eq!(QueryMode::parse(Some("explain")).unwrap(), QueryMode::Explain);
    }

    #[test]
    fn test_mode_rejects_unknown_value() {
        let err = QueryMode::parse(Some("summarize")).unwrap_err();
        match err {
            ServeError::InvalidQuery { reason } => assert!(reason.contains("summarize")),
            other => panic!("expected InvalidQuery, got {other:?}"),
        }
    }

    #[test]
    fn test_args_require_query_string() {
        let err = QueryArgs::from_value(&serde_json::json!({"mode": "execute"})).unwrap_err();
        assert!(matches!(err, ServeError::InvalidQuery { .. }));

        let err = QueryArgs::from_value(&serde_json::json!({"query": 42})).unwrap_err();
        assert!(matches!(err, ServeError::InvalidQuery { .. }));
    }

    #[test]
    fn test_args_default_mode() {
        let args = QueryArgs::from_value(&serde_json::json!({"query": "list files"})).unwrap();
        assert_eq!(args.mode, QueryMode::Execute);
        assert_eq!(args.query, "list files");
    }

    #[test]
    fn test_args_null_mode_is_default() {
        let args =
            QueryArgs::from_value(&serde_json::json!({"query": "q", "mode": null})).unwrap();
        assert_eq!(args.mode, QueryMode::Execute);
    }

    #[test]
    fn test_args_non_string_mode_rejected() {
        let err =
            QueryArgs::from_value(&serde_json::json!({"query": "q", "mode": 3})).unwrap_err();
        assert!(matches!(err, ServeError::InvalidQuery { .. }));
    }

    #[test]
    fn test_args_unknown_mode_rejected_before_any_io() {
        // No peer or planner exists in this test; rejection must not need one.
        let err = QueryArgs::from_value(&serde_json::json!({"query": "q", "mode": "summarize"}))
            .unwrap_err();
        assert!(matches!(err, ServeError::InvalidQuery { .. }));
    }
}
