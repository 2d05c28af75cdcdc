//! Discovery engine error types.
//!
//! One variant per pipeline stage, so a caller can tell "can't reach peer"
//! from "can't reach planner" from "bad credential" without string matching.

use thiserror::Error;

/// Errors that can occur during a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No planner credential — raised before any connection is opened.
    #[error("missing credential: {reason}")]
    MissingCredential { reason: String },

    /// The peer could not be reached or did not complete its handshake.
    #[error("connection failed: {reason}")]
    Connection { reason: String },

    /// The mandatory tool enumeration failed.
    #[error("tool enumeration failed: {reason}")]
    Enumeration { reason: String },

    /// The planner call failed or its output did not parse into a summary.
    #[error("analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    /// The descriptor could not be written.
    #[error("failed to persist expert descriptor: {reason}")]
    Persist { reason: String },
}
