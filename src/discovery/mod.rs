//! Discovery engine — turn a running peer into a persisted expert descriptor.
//!
//! Submodules:
//! - `engine`: The setup-time pipeline (connect, enumerate, summarize, persist)
//! - `summary`: Summarization prompt + the planner's expected output shape
//! - `errors`: Stage-tagged discovery error types

pub mod engine;
pub mod errors;
pub mod summary;

// Re-exports for convenience
pub use engine::{discover, DiscoveryReport};
pub use errors::DiscoveryError;
pub use summary::PeerSummary;
