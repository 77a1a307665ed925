//! Audit events and the sinks that receive them.

use std::sync::{Arc, Mutex, PoisonError};

use gate_primitives::{RequestId, RiskLevel};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Terminal disposition of a call that reached the permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Rejected by the permission checker or the rate limiter.
    Blocked,
    /// Effect returned a value.
    Success,
    /// Effect failed, panicked, or timed out.
    Failure,
}

impl AuditOutcome {
    /// Returns the lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Outcome-specific fields of an [`AuditEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDetails {
    /// Denial reason for blocked calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Retry hint for rate-limited calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    /// Time spent from admission start to disposition.
    pub duration_ms: u64,
    /// Failure message for failed executions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Risk level of the tool.
    pub risk_level: RiskLevel,
}

impl AuditDetails {
    /// Creates details with no reason, retry hint, or error.
    #[must_use]
    pub fn new(risk_level: RiskLevel, duration_ms: u64) -> Self {
        Self {
            reason: None,
            retry_after_ms: None,
            duration_ms,
            error: None,
            risk_level,
        }
    }
}

/// One structured record per terminal call state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Identifier of the call.
    pub request_id: RequestId,
    /// Caller the call was made on behalf of.
    pub user_id: String,
    /// Target tool.
    pub tool_name: String,
    /// Disposition.
    pub outcome: AuditOutcome,
    /// Disposition details.
    pub details: AuditDetails,
    /// Wall-clock time of the disposition, in milliseconds since the epoch.
    pub recorded_at_ms: u64,
}

/// Receives audit events. Implementations must not block for long; they run
/// on the caller's task.
pub trait AuditSink: Send + Sync {
    /// Records the terminal state of one call.
    fn tool_execution(&self, event: &AuditEvent);
}

/// Sink that writes events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn tool_execution(&self, event: &AuditEvent) {
        let details = &event.details;
        match event.outcome {
            AuditOutcome::Success => info!(
                request_id = %event.request_id,
                user_id = %event.user_id,
                tool = %event.tool_name,
                risk = %details.risk_level,
                duration_ms = details.duration_ms,
                "tool execution succeeded"
            ),
            AuditOutcome::Failure => warn!(
                request_id = %event.request_id,
                user_id = %event.user_id,
                tool = %event.tool_name,
                risk = %details.risk_level,
                duration_ms = details.duration_ms,
                error = details.error.as_deref().unwrap_or_default(),
                "tool execution failed"
            ),
            AuditOutcome::Blocked => warn!(
                request_id = %event.request_id,
                user_id = %event.user_id,
                tool = %event.tool_name,
                risk = %details.risk_level,
                duration_ms = details.duration_ms,
                reason = details.reason.as_deref().unwrap_or_default(),
                retry_after_ms = ?details.retry_after_ms,
                "tool execution blocked"
            ),
        }
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn tool_execution(&self, _event: &AuditEvent) {}
}

/// Sink that keeps events in memory.
#[derive(Debug, Default)]
pub struct CollectingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl CollectingAuditSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a copy of the collected events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the collected events.
    #[must_use]
    pub fn drain(&self) -> Vec<AuditEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.drain(..).collect()
    }
}

impl AuditSink for CollectingAuditSink {
    fn tool_execution(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Default)]
pub struct CompositeAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl CompositeAuditSink {
    /// Creates a composite from the supplied sinks.
    #[must_use]
    pub fn new<I>(sinks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn AuditSink>>,
    {
        Self {
            sinks: sinks.into_iter().collect(),
        }
    }

    /// Adds a sink.
    pub fn push(&mut self, sink: Arc<dyn AuditSink>) {
        self.sinks.push(sink);
    }
}

impl AuditSink for CompositeAuditSink {
    fn tool_execution(&self, event: &AuditEvent) {
        for sink in &self.sinks {
            sink.tool_execution(event);
        }
    }
}
