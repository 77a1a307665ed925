//! Configuration loader implementations.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::schema::BrokerConfig;

/// Parses and validates a configuration from a JSON document.
///
/// # Errors
///
/// Fails on malformed JSON, unknown fields, invalid tool names in the
/// allowlist, or values rejected by [`BrokerConfig::validate`].
pub fn from_json_str(document: &str) -> Result<BrokerConfig> {
    let config: BrokerConfig =
        serde_json::from_str(document).context("failed to parse broker config")?;
    config.validate().context("invalid broker config")?;
    Ok(config)
}

/// Reads, parses, and validates a configuration file.
///
/// # Errors
///
/// Fails when the file cannot be read or [`from_json_str`] rejects it.
pub fn load(path: impl AsRef<Path>) -> Result<BrokerConfig> {
    let path = path.as_ref();
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config =
        from_json_str(&document).with_context(|| format!("in config file {}", path.display()))?;
    info!(
        path = %path.display(),
        allowlisted = config.allowlist.len(),
        "broker config loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TimeoutPolicy;

    fn temp_path() -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("gate-config-{}.json", std::process::id()));
        path
    }

    #[test]
    fn parses_full_document() {
        let config = from_json_str(
            r#"{
                "allowlist": ["data_hash", "file_read"],
                "execution": { "on_timeout": "abort" },
                "rate_limits": { "sweep_interval_ms": 30000 },
                "logging": { "filter": "gate_tools=debug", "ansi": false }
            }"#,
        )
        .unwrap();

        assert_eq!(config.allowlist.len(), 2);
        assert_eq!(config.execution.on_timeout, TimeoutPolicy::Abort);
        assert_eq!(config.rate_limits.sweep_interval_ms, Some(30_000));
        assert!(!config.logging.ansi);
    }

    #[test]
    fn rejects_malformed_tool_names() {
        let err = from_json_str(r#"{ "allowlist": ["Bad-Name"] }"#).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse broker config"));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(from_json_str(r#"{ "allowlist": [], "extra": true }"#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let path = temp_path();
        std::fs::write(&path, r#"{ "allowlist": ["shell_exec"] }"#).unwrap();

        let config = load(&path).unwrap();
        assert!(config.allowlist.iter().any(|name| name.as_str() == "shell_exec"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
