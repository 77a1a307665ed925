//! Capability-gated tool broker facade.
//!
//! Bundles the broker crates behind feature flags so embedders can depend on
//! just the pieces they need. With default features, [`launch`] turns a
//! [`config::BrokerConfig`] into a shared [`tools::ToolRegistry`].

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use gate_primitives as primitives;

/// Access requirements and permission checking (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use gate_policy as policy;

/// Broker configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use gate_config as config;

/// Tool registry and execution (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use gate_tools as tools;

/// Tracing and metrics (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use gate_telemetry as telemetry;

#[cfg(feature = "tools")]
use std::sync::Arc;

#[cfg(feature = "tools")]
use anyhow::Context;

/// Validates `config` and builds a shared registry from it, starting the
/// idle-caller sweeper when `rate_limits.sweep_interval_ms` is set.
///
/// The sweeper stops once the registry is dropped.
///
/// # Errors
///
/// Fails when the configuration is invalid, or when a sweep interval is set
/// and no tokio runtime is running on the current thread.
#[cfg(feature = "tools")]
pub fn launch(config: &gate_config::BrokerConfig) -> anyhow::Result<Arc<gate_tools::ToolRegistry>> {
    launch_with(config, |registry| registry)
}

/// Like [`launch`], letting `configure` install sinks, checkers, or a clock
/// before the registry is shared.
///
/// # Errors
///
/// Same as [`launch`].
#[cfg(feature = "tools")]
pub fn launch_with<F>(
    config: &gate_config::BrokerConfig,
    configure: F,
) -> anyhow::Result<Arc<gate_tools::ToolRegistry>>
where
    F: FnOnce(gate_tools::ToolRegistry) -> gate_tools::ToolRegistry,
{
    config.validate()?;
    let sweep_interval = config.rate_limits.sweep_interval();
    if sweep_interval.is_some() {
        tokio::runtime::Handle::try_current()
            .context("rate_limits.sweep_interval_ms requires a running tokio runtime")?;
    }

    let registry = Arc::new(configure(gate_tools::ToolRegistry::from_config(config)));
    if let Some(interval) = sweep_interval {
        drop(registry.spawn_sweeper(interval));
    }
    Ok(registry)
}
