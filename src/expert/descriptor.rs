//! The expert descriptor — the persisted unit of configuration.
//!
//! Created once by the discovery engine, immutable thereafter, read (never
//! mutated) by the coordination engine for the lifetime of one serve
//! session. The provenance block denormalizes the manifest counts for fast
//! display; the load path re-checks that invariant so a hand-edited file
//! cannot smuggle in a mismatch.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DescriptorError;
use crate::peer::{ConnectionSpec, PromptDescriptor, ResourceDescriptor, ToolDescriptor};

// ─── Capability Manifest ─────────────────────────────────────────────────────

/// The declared surface of a peer: tools, resources, prompts.
///
/// Resources and prompts may legitimately be empty — a peer that does not
/// implement those sub-protocols degrades to `[]`, never to an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityManifest {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
    #[serde(default)]
    pub prompts: Vec<PromptDescriptor>,
}

impl CapabilityManifest {
    /// Comma-joined tool name listing, for explain-mode output and logs.
    pub fn tool_names(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ─── Provenance ──────────────────────────────────────────────────────────────

/// When the descriptor was created and what it counted at the time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub discovered_at: DateTime<Utc>,
    pub tool_count: usize,
    pub resource_count: usize,
    pub prompt_count: usize,
}

// ─── Expert Descriptor ───────────────────────────────────────────────────────

/// Persisted identity + guidance + manifest + provenance for one wrapped peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertDescriptor {
    /// Planner-authored identity name (e.g. "Filesystem Expert").
    pub name: String,
    /// Planner-authored one-paragraph description.
    pub description: String,
    /// How to re-reach the peer at serve time.
    pub connection_spec: ConnectionSpec,
    /// Planner-authored system guidance for coordinating with this peer.
    pub guidance: String,
    /// The capability manifest captured at discovery time.
    pub capabilities: CapabilityManifest,
    /// Discovery timestamp and denormalized counts.
    pub provenance: Provenance,
}

impl ExpertDescriptor {
    /// Assemble a descriptor, deriving provenance from the manifest so the
    /// count invariant holds by construction.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        connection_spec: ConnectionSpec,
        guidance: impl Into<String>,
        capabilities: CapabilityManifest,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        let provenance = Provenance {
            discovered_at,
            tool_count: capabilities.tools.len(),
            resource_count: capabilities.resources.len(),
            prompt_count: capabilities.prompts.len(),
        };
        Self {
            name: name.into(),
            description: description.into(),
            connection_spec,
            guidance: guidance.into(),
            capabilities,
            provenance,
        }
    }

    /// Check the provenance/manifest count invariant.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let checks: [(&'static str, usize, usize); 3] = [
            ("toolCount", self.provenance.tool_count, self.capabilities.tools.len()),
            (
                "resourceCount",
                self.provenance.resource_count,
                self.capabilities.resources.len(),
            ),
            (
                "promptCount",
                self.provenance.prompt_count,
                self.capabilities.prompts.len(),
            ),
        ];

        for (kind, declared, actual) in checks {
            if declared != actual {
                return Err(DescriptorError::CountMismatch {
                    kind,
                    declared,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// The single entry point name a serve session registers for this
    /// descriptor: identity lower-cased, whitespace runs collapsed to one
    /// underscore. Deterministic, so repeated sessions present the same name.
    pub fn entry_point_name(&self) -> String {
        self.name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Write the descriptor as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), DescriptorError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| DescriptorError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        std::fs::write(path, json).map_err(|e| DescriptorError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load and validate a descriptor.
    ///
    /// Missing file, malformed JSON, and a count mismatch are all distinct
    /// failures — the message names which one happened.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let raw = std::fs::read_to_string(path).map_err(|e| DescriptorError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let descriptor: ExpertDescriptor =
            serde_json::from_str(&raw).map_err(|e| DescriptorError::Malformed {
                reason: e.to_string(),
            })?;

        descriptor.validate()?;
        Ok(descriptor)
    }
}

// ─── File Naming ─────────────────────────────────────────────────────────────

/// Slugify an identity name for use in a filename: lowercase, runs of
/// non-alphanumerics collapsed to single hyphens, trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "expert".to_string()
    } else {
        slug
    }
}

/// Build the unique descriptor path for an identity name: slug plus a
/// point-in-time value, so repeated discovery runs against the same peer
/// never collide.
pub fn descriptor_path(output_dir: &Path, name: &str, discovered_at: DateTime<Utc>) -> PathBuf {
    let stamp = discovered_at.format("%Y%m%d-%H%M%S");
    output_dir.join(format!("{}-{stamp}.json", slugify(name)))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
