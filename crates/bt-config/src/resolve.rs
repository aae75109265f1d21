//! Configuration resolution.
//!
//! Resolution order: CLI argument → `BT_CONFIG` environment variable → defaults.

use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;
use crate::validate::{validate_config, ValidationResult};

/// Environment variable naming a configuration file.
pub const ENV_CONFIG_PATH: &str = "BT_CONFIG";

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// A loaded, validated configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Resolve the configuration file path.
///
/// A CLI path is returned even when missing so the loader can report it;
/// an environment path that does not exist is ignored.
pub fn resolve_config(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    (None, ConfigSource::BuiltinDefault)
}

/// Resolve, load and validate the engine configuration.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<ResolvedConfig> {
    let (path, source) = resolve_config(cli_path);
    let config = match &path {
        Some(p) => EngineConfig::from_file(p)?,
        None => EngineConfig::default(),
    };
    validate_config(&config)?;
    Ok(ResolvedConfig {
        config,
        path,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    #[test]
    fn test_cli_path_wins() {
        let (path, source) = resolve_config(Some(Path::new("/nonexistent/bt.json")));
        assert_eq!(path, Some(PathBuf::from("/nonexistent/bt.json")));
        assert_eq!(source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_missing_cli_file_is_io_error() {
        let err = load_config(Some(Path::new("/nonexistent/bt.json"))).unwrap_err();
        assert!(matches!(err, ValidationError::IoError(_)));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ConfigSource::BuiltinDefault.to_string(), "builtin default");
    }
}
