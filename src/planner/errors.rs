//! Planner error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured
//! logging is the caller's responsibility — these types carry the context
//! needed to build meaningful log entries.

use thiserror::Error;

/// Errors that can occur during planner operations.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// No API credential was provided. Raised before any network activity.
    #[error("missing planner credential: set {env_var}")]
    MissingCredential { env_var: String },

    /// TCP/HTTP connection to the planner endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// Non-2xx HTTP response from the planner endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response envelope could not be read or decoded.
    #[error("malformed planner response: {reason}")]
    MalformedResponse { reason: String },

    /// The planner's text output did not parse into the expected shape.
    #[error("structured output parse error: {reason}")]
    StructuredOutputError { raw_response: String, reason: String },
}

impl PlannerError {
    /// The raw planner text behind a structured-output failure, if any.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PlannerError::StructuredOutputError { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}
