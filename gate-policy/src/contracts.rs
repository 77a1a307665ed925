//! Access requirements declared by a tool.

use std::collections::BTreeSet;

use gate_primitives::RiskLevel;
use serde::{Deserialize, Serialize};

/// Requirements a caller must meet before a tool may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirements {
    risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    required_roles: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    required_permissions: BTreeSet<String>,
}

impl AccessRequirements {
    /// Creates requirements for the given risk level with no role restrictions.
    #[must_use]
    pub fn new(risk_level: RiskLevel) -> Self {
        Self {
            risk_level,
            required_roles: BTreeSet::new(),
            required_permissions: BTreeSet::new(),
        }
    }

    /// Restricts the tool to callers holding at least one of `roles`.
    ///
    /// Roles are stored verbatim; blank entries are not dropped.
    #[must_use]
    pub fn with_required_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Declares permissions associated with the tool.
    #[must_use]
    pub fn with_required_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_non_blank(&mut self.required_permissions, permissions);
        self
    }

    /// Returns the tool's risk level.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Returns the roles of which a caller must hold at least one.
    #[must_use]
    pub fn required_roles(&self) -> &BTreeSet<String> {
        &self.required_roles
    }

    /// Returns the declared permissions. These are descriptive only.
    #[must_use]
    pub fn required_permissions(&self) -> &BTreeSet<String> {
        &self.required_permissions
    }
}

fn extend_non_blank<I, S>(target: &mut BTreeSet<String>, values: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for value in values {
        let value = value.into();
        if !value.trim().is_empty() {
            target.insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_roles_still_restrict_access() {
        let requirements = AccessRequirements::new(RiskLevel::Medium)
            .with_required_roles(["admin", "  ", "admin"])
            .with_required_permissions(["fs:write", " "]);

        assert_eq!(requirements.required_roles().len(), 2);
        assert!(requirements.required_roles().contains("  "));
        assert_eq!(requirements.required_permissions().len(), 1);

        let blank_only = AccessRequirements::new(RiskLevel::Low).with_required_roles([""]);
        assert!(!blank_only.required_roles().is_empty());
    }

    #[test]
    fn serializes_compactly() {
        let value = serde_json::to_value(AccessRequirements::new(RiskLevel::Low)).unwrap();
        assert_eq!(value, serde_json::json!({ "risk_level": "low" }));
    }
}
