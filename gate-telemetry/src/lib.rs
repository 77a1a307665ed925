//! Observability for the tool broker.
//!
//! [`init_tracing`] installs the process-wide subscriber from
//! [`gate_config::LoggingConfig`]; [`metrics`] turns registry statistics into
//! periodic structured log records. Audit events reach `tracing` through
//! [`TracingAuditSink`], the registry's default sink.

#![warn(missing_docs, clippy::pedantic)]

pub mod metrics;
pub mod tracing_support;

pub use gate_tools::TracingAuditSink;
pub use metrics::{MetricsSnapshot, spawn_metrics_reporter};
pub use tracing_support::init_tracing;
