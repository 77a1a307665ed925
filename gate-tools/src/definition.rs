//! Tool definitions: the immutable descriptor a tool author registers.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gate_policy::AccessRequirements;
use gate_primitives::{ExecutionContext, RiskLevel, ToolName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::as_millis;
use crate::error::{DefinitionError, ToolResult};
use crate::schema::ParameterSchema;

/// Timeout applied when a definition does not set one.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// The side effect a tool performs once admitted.
#[async_trait]
pub trait ToolEffect: Send + Sync {
    /// Runs the tool with validated parameters.
    async fn execute(&self, params: Value, context: ExecutionContext) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> ToolEffect for F
where
    F: Send + Sync + Fn(Value, ExecutionContext) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn execute(&self, params: Value, context: ExecutionContext) -> ToolResult<Value> {
        (self)(params, context).await
    }
}

/// At most `max_calls` admissions per caller in any trailing `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    max_calls: u32,
    window_ms: u64,
}

impl RateLimit {
    /// Creates a rate limit.
    #[must_use]
    pub const fn new(max_calls: u32, window_ms: u64) -> Self {
        Self {
            max_calls,
            window_ms,
        }
    }

    /// Returns the call budget per window.
    #[must_use]
    pub const fn max_calls(self) -> u32 {
        self.max_calls
    }

    /// Returns the window length in milliseconds.
    #[must_use]
    pub const fn window_ms(self) -> u64 {
        self.window_ms
    }

    pub(crate) fn max_calls_usize(self) -> usize {
        usize::try_from(self.max_calls).unwrap_or(usize::MAX)
    }
}

/// Descriptor supplied to [`crate::ToolRegistry::register`].
///
/// Fields are checked at registration; a definition missing its schema,
/// effect, description, version, or risk level is refused there.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    version: String,
    parameters: Option<Arc<dyn ParameterSchema>>,
    effect: Option<Arc<dyn ToolEffect>>,
    risk_level: Option<RiskLevel>,
    requires_approval: bool,
    sandboxed: bool,
    timeout_ms: u64,
    required_roles: Vec<String>,
    required_permissions: Vec<String>,
    rate_limit: Option<RateLimit>,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("risk_level", &self.risk_level)
            .field("timeout_ms", &self.timeout_ms)
            .field("rate_limit", &self.rate_limit)
            .field("has_parameters", &self.parameters.is_some())
            .field("has_effect", &self.effect.is_some())
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    /// Starts a definition for the named tool.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: String::new(),
            parameters: None,
            effect: None,
            risk_level: None,
            requires_approval: false,
            sandboxed: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            required_roles: Vec::new(),
            required_permissions: Vec::new(),
            rate_limit: None,
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the parameter schema.
    #[must_use]
    pub fn with_parameters<S>(mut self, schema: S) -> Self
    where
        S: ParameterSchema + 'static,
    {
        self.parameters = Some(Arc::new(schema));
        self
    }

    /// Sets the effect run once a call is admitted.
    #[must_use]
    pub fn with_effect<E>(mut self, effect: E) -> Self
    where
        E: ToolEffect + 'static,
    {
        self.effect = Some(Arc::new(effect));
        self
    }

    /// Sets the risk level.
    #[must_use]
    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = Some(risk_level);
        self
    }

    /// Marks the tool as needing human approval. Exposed, not enforced.
    #[must_use]
    pub fn with_requires_approval(mut self, requires_approval: bool) -> Self {
        self.requires_approval = requires_approval;
        self
    }

    /// Marks the tool as sandboxed; its effect always sees a sandboxed context.
    #[must_use]
    pub fn with_sandboxed(mut self, sandboxed: bool) -> Self {
        self.sandboxed = sandboxed;
        self
    }

    /// Sets the execution timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Restricts the tool to callers holding at least one of `roles`.
    #[must_use]
    pub fn with_required_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Declares permissions associated with the tool.
    #[must_use]
    pub fn with_required_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Applies a per-caller rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Returns the requested name, unvalidated.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks structure and freezes the definition.
    pub(crate) fn into_spec(self, name: ToolName) -> Result<ToolSpec, DefinitionError> {
        if self.description.trim().is_empty() {
            return Err(DefinitionError::MissingDescription);
        }
        if self.version.trim().is_empty() {
            return Err(DefinitionError::MissingVersion);
        }
        let parameters = self.parameters.ok_or(DefinitionError::MissingParameters)?;
        let effect = self.effect.ok_or(DefinitionError::MissingEffect)?;
        let risk_level = self.risk_level.ok_or(DefinitionError::MissingRiskLevel)?;
        if self.timeout_ms == 0 {
            return Err(DefinitionError::NonPositiveTimeout);
        }
        if self
            .rate_limit
            .is_some_and(|limit| limit.max_calls() == 0 || limit.window_ms() == 0)
        {
            return Err(DefinitionError::InvalidRateLimit);
        }
        if self.required_roles.iter().any(|role| role.trim().is_empty()) {
            return Err(DefinitionError::BlankRole);
        }

        let access = AccessRequirements::new(risk_level)
            .with_required_roles(self.required_roles)
            .with_required_permissions(self.required_permissions);

        Ok(ToolSpec {
            name,
            description: self.description,
            version: self.version,
            parameters,
            effect,
            access,
            requires_approval: self.requires_approval,
            sandboxed: self.sandboxed,
            timeout: Duration::from_millis(self.timeout_ms),
            rate_limit: self.rate_limit,
        })
    }
}

/// A definition that passed registration checks.
pub(crate) struct ToolSpec {
    pub(crate) name: ToolName,
    pub(crate) description: String,
    pub(crate) version: String,
    pub(crate) parameters: Arc<dyn ParameterSchema>,
    pub(crate) effect: Arc<dyn ToolEffect>,
    pub(crate) access: AccessRequirements,
    pub(crate) requires_approval: bool,
    pub(crate) sandboxed: bool,
    pub(crate) timeout: Duration,
    pub(crate) rate_limit: Option<RateLimit>,
}

impl ToolSpec {
    pub(crate) fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.to_string(),
            description: self.description.clone(),
            risk_level: self.access.risk_level(),
            requires_approval: self.requires_approval,
            sandboxed: self.sandboxed,
        }
    }

    pub(crate) fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            summary: self.summary(),
            version: self.version.clone(),
            timeout_ms: as_millis(self.timeout),
            required_roles: self.access.required_roles().clone(),
            required_permissions: self.access.required_permissions().clone(),
            rate_limit: self.rate_limit,
            parameters: self.parameters.json_schema(),
        }
    }
}

/// Public catalog entry returned by [`crate::ToolRegistry::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Whether a human must approve calls.
    pub requires_approval: bool,
    /// Whether the effect runs sandboxed.
    pub sandboxed: bool,
}

/// Full descriptor returned by [`crate::ToolRegistry::describe`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Catalog fields.
    #[serde(flatten)]
    pub summary: ToolSummary,
    /// Version string.
    pub version: String,
    /// Execution timeout.
    pub timeout_ms: u64,
    /// Roles of which a caller must hold at least one.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_roles: BTreeSet<String>,
    /// Declared permissions.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_permissions: BTreeSet<String>,
    /// Per-caller rate limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    /// JSON Schema of the parameters, when the schema exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}
