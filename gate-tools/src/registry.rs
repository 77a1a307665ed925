//! Tool catalog and the admission pipeline every call goes through.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::{Duration, Instant};

use gate_config::BrokerConfig;
use gate_policy::{DenialReason, PermissionChecker, PermissionDecision, RoleMfaChecker};
use gate_primitives::{CallerIdentity, ExecutionContext, RequestId, ToolName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::audit::{AuditDetails, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use crate::clock::{Clock, SystemClock, as_millis};
use crate::definition::{ToolDefinition, ToolDescriptor, ToolSpec, ToolSummary};
use crate::engine::{ExecutionEngine, ExecutionFailure, TimeoutPolicy};
use crate::error::{CallError, RegistrationError};
use crate::rate_limit::{RateLimitDecision, SlidingWindow};
use crate::schema::{FieldError, SchemaErrors};

/// A request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Target tool.
    pub tool_name: String,
    /// Untrusted parameters.
    #[serde(default)]
    pub parameters: Value,
    /// Correlation id carried into the audit event.
    #[serde(default)]
    pub request_id: RequestId,
}

impl ToolCall {
    /// Creates a call with a fresh request id.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            request_id: RequestId::random(),
        }
    }

    /// Overrides the request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Timing of a single admitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Milliseconds from the permission check to the effect settling.
    pub duration_ms: u64,
}

/// Result of a call whose effect was started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ExecutionFailure>,
    metrics: ExecutionMetrics,
}

impl ExecutionOutcome {
    fn settled(result: Result<Value, ExecutionFailure>, metrics: ExecutionMetrics) -> Self {
        match result {
            Ok(value) => Self {
                success: true,
                result: Some(value),
                error: None,
                metrics,
            },
            Err(failure) => Self {
                success: false,
                result: None,
                error: Some(failure),
                metrics,
            },
        }
    }

    /// Returns true when the effect produced a value.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Returns the effect's value.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns why the effect failed.
    #[must_use]
    pub fn error(&self) -> Option<&ExecutionFailure> {
        self.error.as_ref()
    }

    /// Returns timing information.
    #[must_use]
    pub fn metrics(&self) -> ExecutionMetrics {
        self.metrics
    }
}

/// Runtime statistics kept per registered tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetrics {
    /// Admitted calls whose effect settled.
    pub call_count: u64,
    /// Wall-clock time the last admitted call settled, in epoch milliseconds.
    pub last_call_time: Option<u64>,
    /// Calls whose effect returned a value.
    pub successes: u64,
    /// Calls whose effect errored or panicked.
    pub failures: u64,
    /// Calls that missed their deadline.
    pub timeouts: u64,
}

impl ToolMetrics {
    fn record(&mut self, result: &Result<Value, ExecutionFailure>, now_ms: u64) {
        self.call_count += 1;
        self.last_call_time = Some(now_ms);
        match result {
            Ok(_) => self.successes += 1,
            Err(ExecutionFailure::TimedOut { .. }) => self.timeouts += 1,
            Err(_) => self.failures += 1,
        }
    }
}

#[derive(Debug, Default)]
struct ToolState {
    metrics: ToolMetrics,
    window: SlidingWindow,
}

struct RegisteredTool {
    spec: ToolSpec,
    state: Mutex<ToolState>,
}

impl RegisteredTool {
    fn new(spec: ToolSpec) -> Self {
        Self {
            spec,
            state: Mutex::new(ToolState::default()),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ToolState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn admit(&self, caller_id: &str, now_ms: u64) -> RateLimitDecision {
        match self.spec.rate_limit {
            Some(limit) => self.with_state(|state| state.window.check(caller_id, limit, now_ms)),
            None => RateLimitDecision::Allowed,
        }
    }
}

/// Catalog of admitted tools and the single entry point for invoking them.
///
/// Share it behind an [`Arc`]; every method takes `&self`. Per-tool state is
/// guarded by a short synchronous lock that is never held across an await.
pub struct ToolRegistry {
    allowlist: BTreeSet<ToolName>,
    tools: RwLock<HashMap<String, Arc<RegisteredTool>>>,
    permissions: Arc<dyn PermissionChecker>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    engine: ExecutionEngine,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut registered: Vec<_> = tools.keys().cloned().collect();
        registered.sort();
        f.debug_struct("ToolRegistry")
            .field("allowlist", &self.allowlist)
            .field("registered", &registered)
            .field("clock", &self.clock)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl ToolRegistry {
    /// Creates an empty registry that only accepts the supplied names.
    #[must_use]
    pub fn new<I>(allowlist: I) -> Self
    where
        I: IntoIterator<Item = ToolName>,
    {
        Self {
            allowlist: allowlist.into_iter().collect(),
            tools: RwLock::new(HashMap::new()),
            permissions: Arc::new(RoleMfaChecker),
            audit: Arc::new(TracingAuditSink),
            clock: Arc::new(SystemClock),
            engine: ExecutionEngine::default(),
        }
    }

    /// Creates a registry from unvalidated allowlist names.
    ///
    /// # Errors
    ///
    /// Returns [`gate_primitives::Error::InvalidToolName`] for the first name
    /// that is not lowercase snake case.
    pub fn from_names<I, S>(names: I) -> gate_primitives::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowlist = names
            .into_iter()
            .map(ToolName::new)
            .collect::<gate_primitives::Result<Vec<_>>>()?;
        Ok(Self::new(allowlist))
    }

    /// Creates a registry from broker configuration.
    #[must_use]
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new(config.allowlist.iter().cloned())
            .with_timeout_policy(config.execution.on_timeout)
    }

    /// Replaces the permission checker.
    #[must_use]
    pub fn with_permission_checker(mut self, checker: Arc<dyn PermissionChecker>) -> Self {
        self.permissions = checker;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Replaces the clock used for rate limiting and metrics.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Chooses what happens to effects that outlive their timeout.
    #[must_use]
    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.engine = ExecutionEngine::new(policy);
        self
    }

    /// Returns the names this registry accepts.
    #[must_use]
    pub fn allowlist(&self) -> &BTreeSet<ToolName> {
        &self.allowlist
    }

    /// Registers a tool, replacing any previous definition of the same name
    /// and resetting its runtime state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the name is malformed or not
    /// allowlisted, or the definition is incomplete.
    pub fn try_register(&self, definition: ToolDefinition) -> Result<(), RegistrationError> {
        let name = ToolName::new(definition.name())?;
        if !self.allowlist.contains(&name) {
            return Err(RegistrationError::NotAllowlisted {
                name: name.to_string(),
            });
        }
        let spec = definition
            .into_spec(name.clone())
            .map_err(|source| RegistrationError::InvalidDefinition {
                name: name.to_string(),
                source,
            })?;

        let replaced = self
            .write_tools()
            .insert(name.to_string(), Arc::new(RegisteredTool::new(spec)))
            .is_some();
        info!(tool = %name, replaced, "tool registered");
        Ok(())
    }

    /// Registers a tool, returning false (and logging why) on rejection.
    pub fn register(&self, definition: ToolDefinition) -> bool {
        match self.try_register(definition) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "tool registration rejected");
                false
            }
        }
    }

    /// Removes a tool, returning true if it existed.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.write_tools().remove(name).is_some();
        if removed {
            info!(tool = name, "tool unregistered");
        }
        removed
    }

    /// Returns true when `name` is both allowlisted and registered.
    #[must_use]
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowlist.contains(name) && self.read_tools().contains_key(name)
    }

    /// Validates parameters against the tool's schema.
    ///
    /// # Errors
    ///
    /// Returns the schema's field errors, or a single root error when the
    /// tool is not registered.
    pub fn validate_call(&self, name: &str, params: &Value) -> Result<Value, SchemaErrors> {
        match self.lookup(name) {
            Some(tool) => tool.spec.parameters.parse(params),
            None => Err(SchemaErrors::single(FieldError::root(format!(
                "tool `{name}` is not registered"
            )))),
        }
    }

    /// Evaluates whether `identity` may invoke the tool. Unknown tools are
    /// denied.
    #[must_use]
    pub fn check_permission(&self, name: &str, identity: &CallerIdentity) -> PermissionDecision {
        match self.lookup(name) {
            Some(tool) => self.permissions.check(&tool.spec.access, identity),
            None => PermissionDecision::deny(DenialReason::UnknownTool {
                name: name.to_owned(),
            }),
        }
    }

    /// Admits or rejects a call by `caller_id`, recording admissions.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnknownTool`] when the tool is not registered.
    pub fn check_rate_limit(
        &self,
        name: &str,
        caller_id: &str,
    ) -> Result<RateLimitDecision, CallError> {
        let tool = self.lookup(name).ok_or_else(|| CallError::UnknownTool {
            name: name.to_owned(),
        })?;
        Ok(tool.admit(caller_id, self.clock.now_ms()))
    }

    /// Runs a call through validation, permission, rate limiting, and the
    /// timeout-bounded effect.
    ///
    /// Calls rejected by the permission checker or the rate limiter produce
    /// one `blocked` audit event; admitted calls produce one `success` or
    /// `failure` event. Unknown tools and invalid parameters are not audited.
    ///
    /// # Errors
    ///
    /// Returns [`CallError`] when the call is rejected before the effect
    /// starts. Failures of the effect itself are reported through
    /// [`ExecutionOutcome::error`].
    pub async fn execute(
        &self,
        call: ToolCall,
        context: ExecutionContext,
    ) -> Result<ExecutionOutcome, CallError> {
        let tool = self
            .lookup(&call.tool_name)
            .ok_or_else(|| CallError::UnknownTool {
                name: call.tool_name.clone(),
            })?;
        let spec = &tool.spec;
        let params = spec
            .parameters
            .parse(&call.parameters)
            .map_err(|errors| CallError::InvalidParameters {
                name: call.tool_name.clone(),
                errors,
            })?;

        let started = Instant::now();
        let record = CallRecord {
            request_id: call.request_id,
            tool_name: call.tool_name,
            user_id: context.identity().user_id().to_owned(),
        };
        let risk_level = spec.access.risk_level();

        let decision = self.permissions.check(&spec.access, context.identity());
        if decision.is_deny() {
            let reason = decision
                .reason()
                .cloned()
                .unwrap_or_else(|| DenialReason::Other {
                    message: "permission denied".into(),
                });
            let mut details = AuditDetails::new(risk_level, as_millis(started.elapsed()));
            details.reason = Some(reason.to_string());
            self.emit(&record, AuditOutcome::Blocked, details);
            return Err(CallError::PermissionDenied {
                name: record.tool_name,
                reason,
            });
        }

        if let RateLimitDecision::Limited { retry_after_ms } =
            tool.admit(&record.user_id, self.clock.now_ms())
        {
            let mut details = AuditDetails::new(risk_level, as_millis(started.elapsed()));
            details.reason = Some("rate limit exceeded".into());
            details.retry_after_ms = Some(retry_after_ms);
            self.emit(&record, AuditOutcome::Blocked, details);
            return Err(CallError::RateLimited {
                name: record.tool_name,
                retry_after_ms,
            });
        }

        let context = if spec.sandboxed {
            context.with_sandboxed(true)
        } else {
            context
        };
        debug!(
            tool = %spec.name,
            user_id = %record.user_id,
            request_id = %record.request_id,
            "tool call admitted"
        );

        // Metrics and the terminal audit event are settled on their own task
        // so they survive the caller dropping this future.
        let settlement = Settlement {
            tool: Arc::clone(&tool),
            audit: Arc::clone(&self.audit),
            clock: Arc::clone(&self.clock),
            engine: self.engine,
            record,
            started,
        };
        match tokio::spawn(settlement.run(params, context)).await {
            Ok(outcome) => Ok(outcome),
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(_) => Ok(ExecutionOutcome::settled(
                Err(ExecutionFailure::Cancelled),
                ExecutionMetrics {
                    duration_ms: as_millis(started.elapsed()),
                },
            )),
        }
    }

    /// Lists registered tools sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ToolSummary> {
        let mut summaries: Vec<_> = self
            .read_tools()
            .values()
            .map(|tool| tool.spec.summary())
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Returns the full descriptor of a registered tool.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<ToolDescriptor> {
        self.lookup(name).map(|tool| tool.spec.descriptor())
    }

    /// Returns runtime statistics for every registered tool.
    #[must_use]
    pub fn metrics(&self) -> BTreeMap<String, ToolMetrics> {
        self.read_tools()
            .iter()
            .map(|(name, tool)| (name.clone(), tool.with_state(|state| state.metrics)))
            .collect()
    }

    /// Forgets callers with no admissions inside their tool's window,
    /// returning how many entries were dropped.
    pub fn sweep_idle_callers(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let tools: Vec<_> = self.read_tools().values().cloned().collect();
        let removed: usize = tools
            .iter()
            .filter_map(|tool| {
                let limit = tool.spec.rate_limit?;
                Some(tool.with_state(|state| state.window.sweep(limit.window_ms(), now_ms)))
            })
            .sum();
        if removed > 0 {
            debug!(removed, "swept idle rate-limit callers");
        }
        removed
    }

    /// Sweeps idle callers every `interval` until the registry is dropped.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    debug!("registry dropped, stopping sweeper");
                    break;
                };
                registry.sweep_idle_callers();
            }
        })
    }

    fn lookup(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.read_tools().get(name).cloned()
    }

    fn read_tools(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<RegisteredTool>>> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tools(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<RegisteredTool>>> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, record: &CallRecord, outcome: AuditOutcome, details: AuditDetails) {
        self.audit.tool_execution(&record.event(self.clock.as_ref(), outcome, details));
    }
}

struct CallRecord {
    request_id: RequestId,
    tool_name: String,
    user_id: String,
}

impl CallRecord {
    fn event(
        &self,
        clock: &dyn Clock,
        outcome: AuditOutcome,
        details: AuditDetails,
    ) -> AuditEvent {
        AuditEvent {
            request_id: self.request_id,
            user_id: self.user_id.clone(),
            tool_name: self.tool_name.clone(),
            outcome,
            details,
            recorded_at_ms: clock.now_ms(),
        }
    }
}

/// Bookkeeping for an admitted call, owned by the task that runs its effect.
struct Settlement {
    tool: Arc<RegisteredTool>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    engine: ExecutionEngine,
    record: CallRecord,
    started: Instant,
}

impl Settlement {
    async fn run(self, params: Value, context: ExecutionContext) -> ExecutionOutcome {
        let spec = &self.tool.spec;
        let result = self
            .engine
            .run(Arc::clone(&spec.effect), params, context, spec.timeout)
            .await;
        let metrics = ExecutionMetrics {
            duration_ms: as_millis(self.started.elapsed()),
        };
        let now_ms = self.clock.now_ms();
        self.tool.with_state(|state| state.metrics.record(&result, now_ms));

        let mut details = AuditDetails::new(spec.access.risk_level(), metrics.duration_ms);
        let outcome = match &result {
            Ok(_) => AuditOutcome::Success,
            Err(failure) => {
                details.error = Some(failure.to_string());
                AuditOutcome::Failure
            }
        };
        self.audit.tool_execution(&self.record.event(self.clock.as_ref(), outcome, details));

        ExecutionOutcome::settled(result, metrics)
    }
}
