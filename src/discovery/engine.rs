//! Discovery engine — from a connection spec to a persisted expert descriptor.
//!
//! Pipeline: credential precondition → connect → enumerate → summarize →
//! persist. The peer connection opened in the connect step is closed exactly
//! once on every path out of this function, including every failure after
//! connect — the fallible middle of the pipeline runs in an inner function
//! and the single caller owns the close.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::errors::DiscoveryError;
use super::summary::{summarization_prompt, PeerSummary, SUMMARY_TEMPERATURE};
use crate::expert::{descriptor_path, CapabilityManifest, ExpertDescriptor};
use crate::peer::{ConnectionSpec, PeerClient};
use crate::planner::{parse_structured, PlannerClient, PlannerConfig, PlannerError};

// ─── Report ──────────────────────────────────────────────────────────────────

/// What a successful discovery run hands back to the caller.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// Where the descriptor was written.
    pub path: PathBuf,
    /// Planner-authored identity name.
    pub name: String,
    /// Planner-authored identity description.
    pub description: String,
    pub tool_count: usize,
    pub resource_count: usize,
    pub prompt_count: usize,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Run one discovery pass against a peer and persist the resulting
/// expert descriptor under `output_dir`.
pub async fn discover(
    spec: &ConnectionSpec,
    planner_config: PlannerConfig,
    output_dir: &Path,
) -> Result<DiscoveryReport, DiscoveryError> {
    // Credential precondition — fail fast before any connection is opened.
    let planner = PlannerClient::new(planner_config).map_err(|e| match e {
        PlannerError::MissingCredential { .. } => DiscoveryError::MissingCredential {
            reason: e.to_string(),
        },
        other => DiscoveryError::AnalysisFailed {
            reason: other.to_string(),
        },
    })?;

    // Step 1 — connect.
    let client = PeerClient::connect(spec)
        .await
        .map_err(|e| DiscoveryError::Connection {
            reason: e.to_string(),
        })?;

    // Steps 2–4 — enumerate, summarize, persist. Whatever happens, the
    // connection is released exactly once before the result propagates.
    let outcome = enumerate_and_summarize(&client, &planner, spec, output_dir).await;

    if let Err(e) = client.shutdown().await {
        tracing::warn!(error = %e, "peer shutdown after discovery reported an error");
    }

    outcome
}

/// The fallible middle of the pipeline. Borrows the client; never closes it.
async fn enumerate_and_summarize(
    client: &PeerClient,
    planner: &PlannerClient,
    spec: &ConnectionSpec,
    output_dir: &Path,
) -> Result<DiscoveryReport, DiscoveryError> {
    // Step 2 — enumerate. Tools are mandatory; resources and prompts are
    // protocol extensions and degrade to empty on failure.
    let tools = client
        .list_tools()
        .await
        .map_err(|e| DiscoveryError::Enumeration {
            reason: e.to_string(),
        })?;

    let resources = match client.list_resources().await {
        Ok(resources) => resources,
        Err(e) => {
            tracing::warn!(error = %e, "peer does not list resources, continuing without");
            Vec::new()
        }
    };

    let prompts = match client.list_prompts().await {
        Ok(prompts) => prompts,
        Err(e) => {
            tracing::warn!(error = %e, "peer does not list prompts, continuing without");
            Vec::new()
        }
    };

    let manifest = CapabilityManifest {
        tools,
        resources,
        prompts,
    };

    tracing::info!(
        tools = manifest.tools.len(),
        resources = manifest.resources.len(),
        prompts = manifest.prompts.len(),
        "enumerated peer capabilities"
    );

    // Step 3 — summarize.
    let prompt = summarization_prompt(spec, &manifest);
    let raw = planner
        .generate(&prompt, SUMMARY_TEMPERATURE)
        .await
        .map_err(|e| DiscoveryError::AnalysisFailed {
            reason: e.to_string(),
        })?;

    let summary: PeerSummary =
        parse_structured(&raw).map_err(|e| DiscoveryError::AnalysisFailed {
            reason: e.to_string(),
        })?;

    tracing::info!(
        expert = %summary.name,
        echoed_capabilities = summary.capabilities.len(),
        "planner summarized peer"
    );

    // Step 4 — persist.
    let discovered_at = Utc::now();
    let descriptor = ExpertDescriptor::new(
        summary.name,
        summary.description,
        spec.clone(),
        summary.guidance,
        manifest,
        discovered_at,
    );

    std::fs::create_dir_all(output_dir).map_err(|e| DiscoveryError::Persist {
        reason: format!("cannot create '{}': {e}", output_dir.display()),
    })?;

    let path = descriptor_path(output_dir, &descriptor.name, discovered_at);
    descriptor.save(&path).map_err(|e| DiscoveryError::Persist {
        reason: e.to_string(),
    })?;

    tracing::info!(path = %path.display(), "expert descriptor written");

    Ok(DiscoveryReport {
        path,
        name: descriptor.name,
        description: descriptor.description,
        tool_count: descriptor.provenance.tool_count,
        resource_count: descriptor.provenance.resource_count,
        prompt_count: descriptor.provenance.prompt_count,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_credential_fails_before_connecting() {
        let tmp = TempDir::new().unwrap();
        // A spawnable-looking but nonexistent peer: if discovery tried to
        // connect first, this would come back as a Connection error.
        let spec = ConnectionSpec::new("/nonexistent/peer-binary", vec![]);
        let config = PlannerConfig::new("", "http://localhost:9/v1", "test-model");

        let err = discover(&spec, config, tmp.path()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_connection_error() {
        let tmp = TempDir::new().unwrap();
        let spec = ConnectionSpec::new("/nonexistent/peer-binary", vec![]);
        let config = PlannerConfig::new("sk-test", "http://localhost:9/v1", "test-model");

        let err = discover(&spec, config, tmp.path()).await.unwrap_err();
        match err {
            DiscoveryError::Connection { reason } => {
                assert!(reason.contains("peer-binary"));
            }
            other => panic!("expected Connection error, got {other:?}"),
        }
    }
}
