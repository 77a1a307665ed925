//! Risk classification for tools.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Coarse classification driving MFA and approval requirements.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Read-only or otherwise harmless operations.
    Low,
    /// Operations with bounded, recoverable side effects.
    Medium,
    /// Operations with significant side effects.
    High,
    /// Operations that can cause irreversible damage.
    Critical,
}

impl RiskLevel {
    /// Returns `true` for levels that require a verified second factor.
    #[must_use]
    pub const fn requires_mfa(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns the lowercase label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::UnknownRiskLevel(other.to_owned())),
        }
    }
}
