//! Shared error definitions for broker primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the broker.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided request identifier could not be parsed.
    #[error("invalid request id: {source}")]
    InvalidRequestId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Tool name failed validation.
    #[error("invalid tool name `{name}`: {reason}")]
    InvalidToolName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Risk level string was not recognised.
    #[error("unrecognized risk level `{0}`")]
    UnknownRiskLevel(String),
}
