//! Expert descriptor error types.

use thiserror::Error;

/// Errors that can occur reading, writing, or validating a descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor file could not be read.
    #[error("cannot read descriptor at '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    /// The descriptor file could not be written.
    #[error("cannot write descriptor to '{path}': {reason}")]
    WriteFailed { path: String, reason: String },

    /// The file's contents were not a well-formed descriptor document.
    #[error("malformed descriptor: {reason}")]
    Malformed { reason: String },

    /// A provenance count disagrees with the manifest it denormalizes.
    #[error("provenance count mismatch: {kind} declares {declared} but manifest has {actual}")]
    CountMismatch {
        kind: &'static str,
        declared: usize,
        actual: usize,
    },
}
