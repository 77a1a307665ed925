//! Timeout-bounded execution of tool effects.

use std::sync::Arc;
use std::time::Duration;

use gate_primitives::ExecutionContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::as_millis;
use crate::definition::ToolEffect;

pub use gate_config::TimeoutPolicy;

/// Why an admitted effect did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionFailure {
    /// The effect did not settle before its deadline.
    #[error("tool execution timed out after {timeout_ms}ms")]
    TimedOut {
        /// Deadline that elapsed.
        timeout_ms: u64,
    },
    /// The effect returned an error.
    #[error("{message}")]
    Failed {
        /// Rendered error.
        message: String,
    },
    /// The effect panicked.
    #[error("tool execution panicked")]
    Panicked,
    /// The effect's task was cancelled by the runtime.
    #[error("tool execution was cancelled")]
    Cancelled,
}

/// Races effects against a wall-clock deadline.
///
/// Each effect runs on its own spawned task, so dropping the caller's future
/// never cancels an effect that was already started.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionEngine {
    policy: TimeoutPolicy,
}

impl ExecutionEngine {
    /// Creates an engine applying `policy` to effects that miss their deadline.
    #[must_use]
    pub fn new(policy: TimeoutPolicy) -> Self {
        Self { policy }
    }

    /// Returns the timeout policy.
    #[must_use]
    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Runs `effect`, returning no later than `timeout` after the call.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionFailure`] when the effect errors, panics, or misses
    /// the deadline.
    pub async fn run(
        &self,
        effect: Arc<dyn ToolEffect>,
        params: Value,
        context: ExecutionContext,
        timeout: Duration,
    ) -> Result<Value, ExecutionFailure> {
        let mut handle = tokio::spawn(async move { effect.execute(params, context).await });

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(ExecutionFailure::Failed {
                message: err.to_string(),
            }),
            Ok(Err(join)) if join.is_panic() => Err(ExecutionFailure::Panicked),
            Ok(Err(_)) => Err(ExecutionFailure::Cancelled),
            Err(_elapsed) => {
                let timeout_ms = as_millis(timeout);
                match self.policy {
                    TimeoutPolicy::Detach => {
                        debug!(timeout_ms, "deadline elapsed, effect left running");
                        drop(handle);
                    }
                    TimeoutPolicy::Abort => {
                        warn!(timeout_ms, "deadline elapsed, aborting effect");
                        handle.abort();
                    }
                }
                Err(ExecutionFailure::TimedOut { timeout_ms })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use gate_primitives::CallerIdentity;
    use serde_json::json;
    use tokio::time::{Instant, sleep};

    use super::*;
    use crate::error::{ToolError, ToolResult};

    fn context() -> ExecutionContext {
        ExecutionContext::new(CallerIdentity::new("u1"))
    }

    fn sleeper(delay: Duration, done: Arc<AtomicBool>) -> Arc<dyn ToolEffect> {
        Arc::new(move |params: Value, _ctx: ExecutionContext| {
            let done = Arc::clone(&done);
            async move {
                sleep(delay).await;
                done.store(true, Ordering::SeqCst);
                ToolResult::Ok(params)
            }
        })
    }

    #[tokio::test]
    async fn returns_effect_value() {
        let engine = ExecutionEngine::default();
        let effect = sleeper(Duration::ZERO, Arc::new(AtomicBool::new(false)));
        let value = engine
            .run(effect, json!({ "x": 1 }), context(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(value, json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn maps_effect_errors() {
        let engine = ExecutionEngine::default();
        let effect: Arc<dyn ToolEffect> =
            Arc::new(|_params: Value, _ctx: ExecutionContext| async move {
                ToolResult::<Value>::Err(ToolError::execution("disk full"))
            });
        let err = engine
            .run(effect, Value::Null, context(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExecutionFailure::Failed {
                message: "tool execution failed: disk full".into()
            }
        );
    }

    #[tokio::test]
    async fn maps_panics() {
        let engine = ExecutionEngine::default();
        let effect: Arc<dyn ToolEffect> =
            Arc::new(|_params: Value, _ctx: ExecutionContext| async move {
                if true {
                    panic!("boom");
                }
                ToolResult::Ok(Value::Null)
            });
        let err = engine
            .run(effect, Value::Null, context(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionFailure::Panicked);
    }

    #[tokio::test]
    async fn never_resolving_effect_is_bounded() {
        let engine = ExecutionEngine::default();
        let effect: Arc<dyn ToolEffect> =
            Arc::new(|_params: Value, _ctx: ExecutionContext| async move {
                std::future::pending::<()>().await;
                ToolResult::Ok(Value::Null)
            });

        let started = Instant::now();
        let err = engine
            .run(effect, Value::Null, context(), Duration::from_millis(50))
            .await
            .unwrap_err();

        assert_eq!(err, ExecutionFailure::TimedOut { timeout_ms: 50 });
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn detached_effect_keeps_running() {
        let engine = ExecutionEngine::new(TimeoutPolicy::Detach);
        let done = Arc::new(AtomicBool::new(false));
        let effect = sleeper(Duration::from_millis(80), Arc::clone(&done));

        let err = engine
            .run(effect, Value::Null, context(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionFailure::TimedOut { .. }));
        assert!(!done.load(Ordering::SeqCst));

        sleep(Duration::from_millis(200)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn aborted_effect_stops() {
        let engine = ExecutionEngine::new(TimeoutPolicy::Abort);
        let done = Arc::new(AtomicBool::new(false));
        let effect = sleeper(Duration::from_millis(80), Arc::clone(&done));

        let err = engine
            .run(effect, Value::Null, context(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionFailure::TimedOut { .. }));

        sleep(Duration::from_millis(200)).await;
        assert!(!done.load(Ordering::SeqCst));
    }
}
