//! Tool registration, admission control, and bounded execution.
//!
//! [`registry::ToolRegistry`] is the entry point: it owns the catalog of
//! [`definition::ToolDefinition`]s admitted by its allowlist and runs every
//! call through parameter validation, the permission checker, the per-caller
//! rate limiter, and the timeout-bounded [`engine::ExecutionEngine`], emitting
//! one [`audit::AuditEvent`] per terminal disposition.

#![warn(missing_docs, clippy::pedantic)]

pub mod audit;
pub mod clock;
pub mod definition;
pub mod engine;
pub mod error;
pub mod rate_limit;
pub mod registry;
pub mod schema;

pub use audit::{
    AuditDetails, AuditEvent, AuditOutcome, AuditSink, CollectingAuditSink, CompositeAuditSink,
    NoopAuditSink, TracingAuditSink,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use definition::{
    DEFAULT_TIMEOUT_MS, RateLimit, ToolDefinition, ToolDescriptor, ToolEffect, ToolSummary,
};
pub use engine::{ExecutionEngine, ExecutionFailure, TimeoutPolicy};
pub use error::{CallError, DefinitionError, RegistrationError, ToolError, ToolResult};
pub use rate_limit::{RateLimitDecision, SlidingWindow};
pub use registry::{ExecutionMetrics, ExecutionOutcome, ToolCall, ToolMetrics, ToolRegistry};
pub use schema::{
    AnyParameters, FieldError, InvalidSchema, JsonSchemaParameters, ParameterSchema, SchemaErrors,
    TypedParameters,
};
