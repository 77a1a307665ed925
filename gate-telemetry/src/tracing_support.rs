//! Structured tracing helpers.

use anyhow::{Context, Result};
use gate_config::LoggingConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`. Returns `Ok(false)` when
/// a global subscriber was already installed, leaving it in place.
///
/// # Errors
///
/// Fails when the effective filter directives cannot be parsed.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(directives.as_deref(), &config.filter)?;

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(false)
        .try_init()
    {
        Ok(()) => Ok(true),
        Err(err) => {
            debug!(error = %err, "tracing subscriber already installed");
            Ok(false)
        }
    }
}

fn build_filter(env_directives: Option<&str>, fallback: &str) -> Result<EnvFilter> {
    match env_directives.filter(|directives| !directives.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {} directives `{directives}`", EnvFilter::DEFAULT_ENV)),
        None => EnvFilter::try_new(fallback)
            .with_context(|| format!("invalid log filter `{fallback}`")),
    }
}
