//! Coordination engine error types.
//!
//! Startup failures (`ConfigLoad`, `PeerConnect`, `MissingCredential`)
//! terminate the session before it serves anything. Per-query failures
//! (`InvalidQuery`, `Enumeration`, `Coordination`) fail that one query and
//! leave the session running.

use thiserror::Error;

/// Errors raised by the coordination engine.
#[derive(Debug, Error)]
pub enum ServeError {
    /// No planner credential — raised before any connection is opened.
    #[error("missing credential: {reason}")]
    MissingCredential { reason: String },

    /// The descriptor file is missing, malformed, or schema-violating.
    #[error("failed to load expert configuration: {reason}")]
    ConfigLoad { reason: String },

    /// The peer named in the descriptor could not be reached.
    #[error("failed to connect to wrapped peer: {reason}")]
    PeerConnect { reason: String },

    /// The caller's query arguments were unusable (missing query string,
    /// unknown mode). Rejected before any peer or planner activity.
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// An invocation request named something other than the registered
    /// entry point.
    #[error("unknown entry point: '{requested}' (serving '{registered}')")]
    UnknownEntryPoint {
        requested: String,
        registered: String,
    },

    /// A required capability enumeration failed mid-query.
    #[error("tool enumeration failed: {reason}")]
    Enumeration { reason: String },

    /// The planner call failed or produced an unusable plan.
    #[error("failed to coordinate with wrapped peer: {reason}")]
    Coordination { reason: String },

    /// The serving transport broke (stdin closed, write failure).
    #[error("serving transport error: {reason}")]
    Transport { reason: String },
}

impl ServeError {
    /// Whether this error ends the session (startup/transport) or only the
    /// query that triggered it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ServeError::MissingCredential { .. }
                | ServeError::ConfigLoad { .. }
                | ServeError::PeerConnect { .. }
                | ServeError::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_split() {
        assert!(ServeError::ConfigLoad { reason: "x".into() }.is_fatal());
        assert!(ServeError::PeerConnect { reason: "x".into() }.is_fatal());
        assert!(!ServeError::InvalidQuery { reason: "x".into() }.is_fatal());
        assert!(!ServeError::Coordination { reason: "x".into() }.is_fatal());
        assert!(!ServeError::UnknownEntryPoint {
            requested: "a".into(),
            registered: "b".into()
        }
        .is_fatal());
    }
}
