//! Bowtie network engine configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the engine thresholds and default CPT parameters
//! - Config resolution (CLI → env → defaults)
//! - Semantic validation (probability sums, positive thresholds)

pub mod engine;
pub mod resolve;
pub mod validate;

pub use engine::{CptDefaults, EngineConfig, RootPriors};
pub use resolve::{load_config, resolve_config, ConfigSource, ResolvedConfig};
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
