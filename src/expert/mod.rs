//! Expert descriptor — the data contract shared by both engines.
//!
//! Submodules:
//! - `descriptor`: Capability manifest, expert descriptor, provenance
//!   invariant, persistence, slug + entry-point name derivation
//! - `errors`: Descriptor-level error types

pub mod descriptor;
pub mod errors;

// Re-exports for convenience
pub use descriptor::{descriptor_path, slugify, CapabilityManifest, ExpertDescriptor, Provenance};
pub use errors::DescriptorError;
