//! Peer protocol — JSON-RPC over stdio to the wrapped tool server.
//!
//! This module handles:
//! - Spawning the peer child process and the initialize handshake
//! - JSON-RPC 2.0 communication over process stdio
//! - Capability enumeration (`tools/list`, `resources/list`, `prompts/list`)
//! - Tool invocation (`tools/call`) with per-call timeouts
//! - Graceful shutdown (notify, wait, force-kill)
//!
//! Both engines go through [`PeerClient`]; the raw transport is not
//! exposed outside this module.

pub mod client;
pub mod errors;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::PeerClient;
pub use errors::PeerError;
pub use types::{
    ConnectionSpec, JsonRpcError, JsonRpcRequest, JsonRpcResponse, PromptDescriptor,
    ResourceDescriptor, ToolDescriptor,
};
