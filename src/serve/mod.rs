//! Coordination engine — serve one expert over one wrapped peer.
//!
//! Submodules:
//! - `engine`: Session state (descriptor + peer + planner) and the three
//!   query modes (discover / execute / explain)
//! - `plan`: Invocation plan shape, coordination prompt, sequential
//!   execution with per-call failure isolation
//! - `server`: The single-entry-point JSON-RPC stdio loop and shutdown
//! - `errors`: Startup-fatal vs per-query error types

pub mod engine;
pub mod errors;
pub mod plan;
pub mod server;

// Re-exports for convenience
pub use engine::{CoordinationEngine, QueryArgs, QueryMode};
pub use errors::ServeError;
pub use plan::{InvocationOutcome, InvocationPlan, PlannedCall};
pub use server::serve;
