//! Strongly typed configuration schemas.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Result, bail};
use gate_primitives::ToolName;
use serde::{Deserialize, Serialize};

/// Top-level broker configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Tool names permitted to exist in a registry built from this config.
    #[serde(default)]
    pub allowlist: BTreeSet<ToolName>,
    /// Execution engine settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Rate limiter housekeeping.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BrokerConfig {
    /// Creates a configuration permitting exactly the supplied tool names.
    #[must_use]
    pub fn with_allowlist<I>(allowlist: I) -> Self
    where
        I: IntoIterator<Item = ToolName>,
    {
        Self {
            allowlist: allowlist.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Checks constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Fails when the sweep interval is zero or the log filter is blank.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limits.sweep_interval_ms == Some(0) {
            bail!("rate_limits.sweep_interval_ms must be positive");
        }
        if self.logging.filter.trim().is_empty() {
            bail!("logging.filter cannot be empty");
        }
        Ok(())
    }
}

/// What the execution engine does with an effect that outlives its timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Leave the effect running in the background and discard its result.
    #[default]
    Detach,
    /// Abort the effect's task at the next suspension point.
    Abort,
}

/// Execution engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Behaviour for effects that exceed their timeout.
    #[serde(default)]
    pub on_timeout: TimeoutPolicy,
}

/// Rate limiter housekeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Interval for purging idle caller windows. Disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_ms: Option<u64>,
}

impl RateLimitConfig {
    /// Returns the sweep interval as a [`Duration`].
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit ANSI colour codes.
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: default_ansi(),
        }
    }
}

fn default_filter() -> String {
    "info".to_owned()
}

fn default_ansi() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BrokerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.execution.on_timeout, TimeoutPolicy::Detach);
        assert!(config.rate_limits.sweep_interval().is_none());
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let mut config = BrokerConfig::default();
        config.rate_limits.sweep_interval_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn with_allowlist_collects_names() {
        let config = BrokerConfig::with_allowlist([
            ToolName::new("data_hash").unwrap(),
            ToolName::new("file_read").unwrap(),
        ]);
        assert_eq!(config.allowlist.len(), 2);
    }
}
