//! Errors produced by registration, admission, and tool effects.

use gate_policy::DenialReason;
use thiserror::Error;

use crate::schema::SchemaErrors;

/// Result alias for tool effects.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors returned by a tool's effect.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },

    /// Any other error raised inside the effect.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

/// Structural problems found in a tool definition.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// Description missing or blank.
    #[error("description cannot be empty")]
    MissingDescription,
    /// Version missing or blank.
    #[error("version cannot be empty")]
    MissingVersion,
    /// No parameter schema supplied.
    #[error("parameter schema must be provided")]
    MissingParameters,
    /// No effect supplied.
    #[error("execute effect must be provided")]
    MissingEffect,
    /// No risk level declared.
    #[error("risk level must be declared")]
    MissingRiskLevel,
    /// Timeout of zero.
    #[error("timeout must be a positive number of milliseconds")]
    NonPositiveTimeout,
    /// Rate limit with zero calls or a zero window.
    #[error("rate limit needs a positive call budget and window")]
    InvalidRateLimit,
    /// A required role is empty or whitespace.
    #[error("required roles cannot be blank")]
    BlankRole,
}

/// Reasons a definition is refused by [`crate::ToolRegistry::try_register`].
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Name does not match `^[a-z][a-z0-9_]*$`.
    #[error(transparent)]
    InvalidName(#[from] gate_primitives::Error),

    /// Name is well formed but not permitted in this registry.
    #[error("tool `{name}` is not in the allowlist")]
    NotAllowlisted {
        /// Refused name.
        name: String,
    },

    /// Definition is structurally incomplete.
    #[error("invalid definition for tool `{name}`: {source}")]
    InvalidDefinition {
        /// Name of the offending tool.
        name: String,
        /// What was wrong with it.
        #[source]
        source: DefinitionError,
    },
}

/// Rejections raised before a tool's effect runs.
#[derive(Debug, Error)]
pub enum CallError {
    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// Parameters were rejected by the tool's schema.
    #[error("invalid parameters for tool `{name}`: {errors}")]
    InvalidParameters {
        /// Name of the tool.
        name: String,
        /// Field-level validation errors.
        errors: SchemaErrors,
    },

    /// Caller failed the permission check.
    #[error("permission denied for tool `{name}`: {reason}")]
    PermissionDenied {
        /// Name of the tool.
        name: String,
        /// Why the caller was rejected.
        reason: DenialReason,
    },

    /// Caller exhausted the tool's rate limit.
    #[error("rate limit exceeded for tool `{name}`, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Name of the tool.
        name: String,
        /// Milliseconds until the oldest call leaves the window.
        retry_after_ms: u64,
    },
}

impl CallError {
    /// Returns the tool name the rejection refers to.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::UnknownTool { name }
            | Self::InvalidParameters { name, .. }
            | Self::PermissionDenied { name, .. }
            | Self::RateLimited { name, .. } => name,
        }
    }
}
