//! Periodic reporting of per-tool execution statistics.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use gate_tools::{ToolMetrics, ToolRegistry};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Point-in-time copy of a registry's statistics with workspace totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Statistics per registered tool.
    pub tools: BTreeMap<String, ToolMetrics>,
    /// Sum of `call_count` across tools.
    pub total_calls: u64,
    /// Sum of `failures` across tools.
    pub total_failures: u64,
    /// Sum of `timeouts` across tools.
    pub total_timeouts: u64,
}

impl MetricsSnapshot {
    /// Captures the current statistics of `registry`.
    #[must_use]
    pub fn capture(registry: &ToolRegistry) -> Self {
        let tools = registry.metrics();
        let (total_calls, total_failures, total_timeouts) =
            tools.values().fold((0, 0, 0), |(calls, failures, timeouts), m| {
                (
                    calls + m.call_count,
                    failures + m.failures,
                    timeouts + m.timeouts,
                )
            });
        Self {
            tools,
            total_calls,
            total_failures,
            total_timeouts,
        }
    }

    /// Emits one `info!` record per tool plus a summary record.
    pub fn log(&self) {
        for (tool, metrics) in &self.tools {
            info!(
                tool = %tool,
                calls = metrics.call_count,
                successes = metrics.successes,
                failures = metrics.failures,
                timeouts = metrics.timeouts,
                last_call_time = ?metrics.last_call_time,
                "tool metrics"
            );
        }
        info!(
            tools = self.tools.len(),
            calls = self.total_calls,
            failures = self.total_failures,
            timeouts = self.total_timeouts,
            "registry metrics"
        );
    }
}

/// Logs a [`MetricsSnapshot`] every `interval` until the registry is dropped.
#[must_use]
pub fn spawn_metrics_reporter(registry: &Arc<ToolRegistry>, interval: Duration) -> JoinHandle<()> {
    let registry: Weak<ToolRegistry> = Arc::downgrade(registry);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(registry) = registry.upgrade() else {
                debug!("registry dropped, stopping metrics reporter");
                break;
            };
            MetricsSnapshot::capture(&registry).log();
        }
    })
}

#[cfg(test)]
mod tests {
    use gate_primitives::{CallerIdentity, ExecutionContext, RiskLevel};
    use gate_tools::{AnyParameters, NoopAuditSink, ToolCall, ToolDefinition, ToolError};
    use serde_json::{Value, json};

    use super::*;

    fn registry() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::from_names(["echo_tool", "broken"])
            .unwrap()
            .with_audit_sink(Arc::new(NoopAuditSink));
        let base = |name: &str| {
            ToolDefinition::new(name)
                .with_description("metrics fixture")
                .with_version("1.0.0")
                .with_parameters(AnyParameters)
                .with_risk_level(RiskLevel::Low)
        };
        assert!(registry.register(base("echo_tool").with_effect(
            |params: Value, _ctx: ExecutionContext| async move { Ok::<_, ToolError>(params) }
        )));
        assert!(registry.register(base("broken").with_effect(
            |_params: Value, _ctx: ExecutionContext| async move {
                Err::<Value, _>(ToolError::execution("nope"))
            }
        )));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn snapshot_totals_every_tool() {
        let registry = registry();
        let ctx = || ExecutionContext::new(CallerIdentity::new("u1"));
        for name in ["echo_tool", "echo_tool", "broken"] {
            registry
                .execute(ToolCall::new(name, json!({})), ctx())
                .await
                .unwrap();
        }

        let snapshot = MetricsSnapshot::capture(&registry);
        assert_eq!(snapshot.tools.len(), 2);
        assert_eq!(snapshot.total_calls, 3);
        assert_eq!(snapshot.total_failures, 1);
        assert_eq!(snapshot.total_timeouts, 0);
        snapshot.log();

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["tools"]["echo_tool"]["successes"], 2);
    }

    #[tokio::test]
    async fn reporter_exits_with_the_registry() {
        let registry = registry();
        let handle = spawn_metrics_reporter(&registry, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(registry);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reporter should exit")
            .unwrap();
    }
}
