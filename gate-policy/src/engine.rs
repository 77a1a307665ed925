//! Permission checker trait and the role/MFA implementation.

use gate_primitives::CallerIdentity;
use tracing::debug;

use crate::contracts::AccessRequirements;
use crate::decision::{DenialReason, PermissionDecision};

/// Trait implemented by permission checkers.
///
/// Checkers are pure: the same requirements and identity always produce the
/// same decision.
pub trait PermissionChecker: Send + Sync {
    /// Evaluates whether `identity` satisfies `requirements`.
    fn check(
        &self,
        requirements: &AccessRequirements,
        identity: &CallerIdentity,
    ) -> PermissionDecision;
}

impl<F> PermissionChecker for F
where
    F: Send + Sync + Fn(&AccessRequirements, &CallerIdentity) -> PermissionDecision,
{
    fn check(
        &self,
        requirements: &AccessRequirements,
        identity: &CallerIdentity,
    ) -> PermissionDecision {
        (self)(requirements, identity)
    }
}

/// Checker enforcing two independent gates that must both pass:
///
/// - role membership: when roles are required, the caller must hold at least
///   one of them;
/// - MFA: high and critical risk tools require a verified second factor,
///   whatever roles the caller holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleMfaChecker;

impl PermissionChecker for RoleMfaChecker {
    fn check(
        &self,
        requirements: &AccessRequirements,
        identity: &CallerIdentity,
    ) -> PermissionDecision {
        let required = requirements.required_roles();
        if !required.is_empty() && !required.iter().any(|role| identity.has_role(role)) {
            debug!(user_id = identity.user_id(), "caller lacks required role");
            return PermissionDecision::deny(DenialReason::MissingRole {
                required: required.iter().cloned().collect(),
            });
        }

        let risk_level = requirements.risk_level();
        if risk_level.requires_mfa() && !identity.mfa_verified() {
            debug!(user_id = identity.user_id(), %risk_level, "caller lacks MFA");
            return PermissionDecision::deny(DenialReason::MfaRequired { risk_level });
        }

        PermissionDecision::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionKind;
    use gate_primitives::RiskLevel;

    fn admin_only(risk: RiskLevel) -> AccessRequirements {
        AccessRequirements::new(risk).with_required_roles(["admin", "ops"])
    }

    #[test]
    fn no_roles_required_allows_anyone_for_low_risk() {
        let decision = RoleMfaChecker.check(
            &AccessRequirements::new(RiskLevel::Low),
            &CallerIdentity::new("u1"),
        );
        assert!(decision.is_allow());
    }

    #[test]
    fn any_single_role_is_enough() {
        let identity = CallerIdentity::new("u1").with_role("ops");
        let decision = RoleMfaChecker.check(&admin_only(RiskLevel::Medium), &identity);
        assert!(decision.is_allow());
    }

    #[test]
    fn missing_role_is_denied() {
        let identity = CallerIdentity::new("u1").with_role("viewer");
        let decision = RoleMfaChecker.check(&admin_only(RiskLevel::Low), &identity);
        assert_eq!(decision.kind(), DecisionKind::Deny);
        assert!(matches!(
            decision.reason(),
            Some(DenialReason::MissingRole { required }) if required == &["admin", "ops"]
        ));
    }

    #[test]
    fn critical_tool_requires_mfa_even_with_roles() {
        let identity = CallerIdentity::new("u1").with_roles(["admin", "ops"]);
        let decision = RoleMfaChecker.check(&admin_only(RiskLevel::Critical), &identity);
        assert!(matches!(
            decision.reason(),
            Some(DenialReason::MfaRequired {
                risk_level: RiskLevel::Critical
            })
        ));

        let decision = RoleMfaChecker.check(
            &admin_only(RiskLevel::Critical),
            &identity.with_mfa_verified(true),
        );
        assert!(decision.is_allow());
    }

    #[test]
    fn high_risk_without_roles_still_needs_mfa() {
        let requirements = AccessRequirements::new(RiskLevel::High);
        let identity = CallerIdentity::new("u1");
        assert!(RoleMfaChecker.check(&requirements, &identity).is_deny());
        assert!(
            RoleMfaChecker
                .check(&requirements, &identity.with_mfa_verified(true))
                .is_allow()
        );
    }

    #[test]
    fn closures_act_as_checkers() {
        let deny_all = |_: &AccessRequirements, _: &CallerIdentity| {
            PermissionDecision::deny(DenialReason::Other {
                message: "maintenance".into(),
            })
        };
        let decision = deny_all.check(
            &AccessRequirements::new(RiskLevel::Low),
            &CallerIdentity::new("u1"),
        );
        assert!(decision.is_deny());
    }
}
