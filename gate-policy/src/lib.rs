//! Permission evaluation for tool calls.
//!
//! A tool declares [`AccessRequirements`]; a [`PermissionChecker`] compares
//! them against the caller's identity and yields a [`PermissionDecision`].

#![warn(missing_docs, clippy::pedantic)]

pub mod contracts;
pub mod decision;
pub mod engine;

pub use contracts::AccessRequirements;
pub use decision::{DecisionKind, DenialReason, PermissionDecision};
pub use engine::{PermissionChecker, RoleMfaChecker};
