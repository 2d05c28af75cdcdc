//! Planner configuration.
//!
//! The credential is resolved from the environment exactly once, in the
//! binary, and threaded into both engines as an explicit value — the
//! engines never read process state themselves, which keeps them testable
//! without environment mutation.

use serde::Deserialize;

use super::errors::PlannerError;

// ─── Environment Keys ────────────────────────────────────────────────────────

/// Environment variable holding the planner API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Optional override for the planner endpoint base URL.
pub const BASE_URL_ENV: &str = "TOOLSAGE_BASE_URL";

/// Optional override for the planner model name.
pub const MODEL_ENV: &str = "TOOLSAGE_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ─── PlannerConfig ───────────────────────────────────────────────────────────

/// Everything needed to reach the planner endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// API credential. Empty means "absent" — both engines fail fast on it
    /// before opening any connection.
    pub api_key: String,
    /// Chat-completions base URL (no trailing slash).
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
}

impl PlannerConfig {
    /// Build a config from explicit values (tests, embedding callers).
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: trim_trailing_slash(base_url.into()),
            model: model.into(),
        }
    }

    /// Resolve the config from the process environment.
    ///
    /// A missing credential is NOT an error here — validation happens at
    /// engine entry so the error can name the operation that needed it.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var(MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(api_key, base_url, model)
    }

    /// Fail-fast credential check. Both engines call this before any
    /// network activity (peer or planner).
    pub fn require_credential(&self) -> Result<(), PlannerError> {
        if self.api_key.trim().is_empty() {
            return Err(PlannerError::MissingCredential {
                env_var: API_KEY_ENV.to_string(),
            });
        }
        Ok(())
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_credential_present() {
        let cfg = PlannerConfig::new("sk-test", DEFAULT_BASE_URL, DEFAULT_MODEL);
        assert!(cfg.require_credential().is_ok());
    }

    #[test]
    fn test_require_credential_empty() {
        let cfg = PlannerConfig::new("", DEFAULT_BASE_URL, DEFAULT_MODEL);
        let err = cfg.require_credential().unwrap_err();
        assert!(matches!(err, PlannerError::MissingCredential { .. }));
    }

    #[test]
    fn test_require_credential_whitespace_only() {
        let cfg = PlannerConfig::new("   ", DEFAULT_BASE_URL, DEFAULT_MODEL);
        assert!(cfg.require_credential().is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let cfg = PlannerConfig::new("k", "https://example.com/v1///", "m");
        assert_eq!(cfg.base_url, "https://example.com/v1");
    }
}
