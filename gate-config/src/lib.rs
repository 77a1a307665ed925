//! Configuration management for the broker.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{from_json_str, load};
pub use schema::{BrokerConfig, ExecutionConfig, LoggingConfig, RateLimitConfig, TimeoutPolicy};
