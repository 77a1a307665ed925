//! Permission decision types returned by checkers.

use std::fmt::{self, Display, Formatter};

use gate_primitives::RiskLevel;
use serde::{Deserialize, Serialize};

/// Describes the outcome of a permission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Call is permitted.
    Allow,
    /// Call is rejected.
    Deny,
}

/// Why a call was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// The tool is not registered.
    UnknownTool {
        /// Requested tool name.
        name: String,
    },
    /// The caller holds none of the required roles.
    MissingRole {
        /// Roles of which at least one was required.
        required: Vec<String>,
    },
    /// The tool's risk level demands a verified second factor.
    MfaRequired {
        /// Risk level of the tool.
        risk_level: RiskLevel,
    },
    /// Custom checker rejection.
    Other {
        /// Human-readable explanation.
        message: String,
    },
}

impl Display for DenialReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { name } => write!(f, "tool `{name}` is not registered"),
            Self::MissingRole { required } => {
                write!(f, "requires one of roles: {}", required.join(", "))
            }
            Self::MfaRequired { risk_level } => {
                write!(f, "MFA verification required for {risk_level}-risk tools")
            }
            Self::Other { message } => f.write_str(message),
        }
    }
}

/// Structured decision emitted by a permission checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    kind: DecisionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<DenialReason>,
}

impl PermissionDecision {
    /// Returns an allow decision.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            kind: DecisionKind::Allow,
            reason: None,
        }
    }

    /// Returns a deny decision carrying the supplied reason.
    #[must_use]
    pub fn deny(reason: DenialReason) -> Self {
        Self {
            kind: DecisionKind::Deny,
            reason: Some(reason),
        }
    }

    /// Returns the decision kind.
    #[must_use]
    pub fn kind(&self) -> DecisionKind {
        self.kind
    }

    /// Returns true when the decision allows the call.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        self.kind == DecisionKind::Allow
    }

    /// Returns true when the decision denies the call.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        self.kind == DecisionKind::Deny
    }

    /// Returns the structured denial reason.
    #[must_use]
    pub fn reason(&self) -> Option<&DenialReason> {
        self.reason.as_ref()
    }
}
