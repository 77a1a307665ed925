//! Caller identity and execution context supplied with every call.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Already-authenticated identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    user_id: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    roles: BTreeSet<String>,
    #[serde(default)]
    mfa_verified: bool,
}

impl CallerIdentity {
    /// Creates an identity with no roles and no verified second factor.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: BTreeSet::new(),
            mfa_verified: false,
        }
    }

    /// Adds a role, ignoring empty or whitespace-only strings.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        if !role.trim().is_empty() {
            self.roles.insert(role);
        }
        self
    }

    /// Adds multiple roles.
    #[must_use]
    pub fn with_roles<I, S>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        roles
            .into_iter()
            .fold(self, |identity, role| identity.with_role(role))
    }

    /// Marks whether the identity completed multi-factor authentication.
    #[must_use]
    pub fn with_mfa_verified(mut self, verified: bool) -> Self {
        self.mfa_verified = verified;
        self
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the roles held by the identity.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Returns `true` if the identity holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns `true` if multi-factor authentication was completed.
    #[must_use]
    pub fn mfa_verified(&self) -> bool {
        self.mfa_verified
    }
}

/// Session data forwarded to tool effects untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl SessionInfo {
    /// Creates session info bound to the supplied session identifier.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            metadata: Map::new(),
        }
    }

    /// Adds a metadata entry and returns the updated session.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the session identifier, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the session metadata.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// Per-call bundle of caller identity and session/environment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    identity: CallerIdentity,
    #[serde(default)]
    session: SessionInfo,
    #[serde(default)]
    sandboxed: bool,
}

impl ExecutionContext {
    /// Creates a context for the supplied identity with an empty session.
    #[must_use]
    pub fn new(identity: CallerIdentity) -> Self {
        Self {
            identity,
            session: SessionInfo::default(),
            sandboxed: false,
        }
    }

    /// Attaches session data.
    #[must_use]
    pub fn with_session(mut self, session: SessionInfo) -> Self {
        self.session = session;
        self
    }

    /// Sets whether the call must run inside a sandbox.
    #[must_use]
    pub fn with_sandboxed(mut self, sandboxed: bool) -> Self {
        self.sandboxed = sandboxed;
        self
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Returns the session data.
    #[must_use]
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Returns `true` if the effect must run sandboxed.
    #[must_use]
    pub fn sandboxed(&self) -> bool {
        self.sandboxed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_blank_roles() {
        let identity = CallerIdentity::new("u1").with_roles(["admin", " ", "ops", "admin"]);
        assert_eq!(identity.roles().len(), 2);
        assert!(identity.has_role("admin"));
        assert!(!identity.mfa_verified());
    }

    #[test]
    fn context_deserializes_with_defaults() {
        let ctx: ExecutionContext = serde_json::from_value(serde_json::json!({
            "identity": { "user_id": "u1", "roles": ["dev"], "mfa_verified": true }
        }))
        .expect("context");

        assert_eq!(ctx.identity().user_id(), "u1");
        assert!(ctx.identity().mfa_verified());
        assert!(!ctx.sandboxed());
        assert!(ctx.session().session_id().is_none());
    }
}
