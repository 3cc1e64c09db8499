//! Timestream write sink configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the sink, write client, and failure policy
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Config snapshots for startup logging

pub mod resolve;
pub mod sink;
pub mod snapshot;
pub mod validate;

pub use resolve::{
    apply_env_overrides, load_config_file, resolve_config, ConfigError, ConfigSource,
};
pub use sink::{FailurePolicyConfig, SinkConfig, WriteClientConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
