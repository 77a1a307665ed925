//! Core shared types for the toolgate broker.

#![warn(missing_docs, clippy::pedantic)]

mod context;
mod error;
mod ids;
mod name;
mod risk;

/// Caller identity and the per-invocation execution context.
pub use context::{CallerIdentity, ExecutionContext, SessionInfo};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Unique identifier attached to every tool call.
pub use ids::RequestId;
/// Validated tool name.
pub use name::ToolName;
/// Coarse risk classification of a tool.
pub use risk::RiskLevel;
