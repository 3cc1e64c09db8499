//! Config resolution: explicit path → `TSW_CONFIG` → XDG → defaults.
//!
//! Failure-policy flags can additionally be overridden from the environment,
//! applied after the file is loaded.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::sink::SinkConfig;

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "TSW_CONFIG";

const ENV_FAIL_ON_DEFAULT_FAULT: &str = "TSW_FAIL_ON_DEFAULT_FAULT";
const ENV_FAIL_ON_VALIDATION_FAILURE: &str = "TSW_FAIL_ON_VALIDATION_FAILURE";
const ENV_FAIL_ON_PARTIAL_REJECTION: &str = "TSW_FAIL_ON_PARTIAL_REJECTION";
const ENV_LOG_FULL_REQUEST_ON_FAILURE: &str = "TSW_LOG_FULL_REQUEST_ON_FAILURE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("invalid boolean for {var}: {value:?}")]
    InvalidEnvBool { var: &'static str, value: String },
}

impl From<ConfigError> for tsw_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, source } => tsw_common::Error::InvalidConfigFile {
                path: path.display().to_string(),
                message: source.to_string(),
            },
            ConfigError::Json { path, source } => tsw_common::Error::InvalidConfigFile {
                path: path.display().to_string(),
                message: source.to_string(),
            },
            ConfigError::Toml { path, source } => tsw_common::Error::InvalidConfigFile {
                path: path.display().to_string(),
                message: source.to_string(),
            },
            other => tsw_common::Error::Config(other.to_string()),
        }
    }
}

/// Where the resolved config came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Env(PathBuf),
    Xdg(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "explicit:{}", p.display()),
            ConfigSource::Env(p) => write!(f, "env:{}", p.display()),
            ConfigSource::Xdg(p) => write!(f, "xdg:{}", p.display()),
            ConfigSource::Defaults => write!(f, "defaults"),
        }
    }
}

/// Load a config file, choosing the format from its extension.
pub fn load_config_file(path: &Path) -> Result<SinkConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Default XDG location: `$XDG_CONFIG_HOME/tsw/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tsw").join("config.toml"))
}

/// Resolve the effective config from the process environment.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(SinkConfig, ConfigSource), ConfigError> {
    resolve_config_with(explicit, |var| std::env::var(var).ok(), default_config_path())
}

/// Resolution with an injectable environment, used by tests.
pub fn resolve_config_with<F>(
    explicit: Option<&Path>,
    env: F,
    xdg_path: Option<PathBuf>,
) -> Result<(SinkConfig, ConfigSource), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (mut config, source) = if let Some(path) = explicit {
        (load_config_file(path)?, ConfigSource::Explicit(path.to_path_buf()))
    } else if let Some(path) = env(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(path);
        (load_config_file(&path)?, ConfigSource::Env(path))
    } else if let Some(path) = xdg_path.filter(|p| p.exists()) {
        (load_config_file(&path)?, ConfigSource::Xdg(path))
    } else {
        (SinkConfig::default(), ConfigSource::Defaults)
    };

    apply_env_overrides(&mut config, env)?;
    debug!(source = %source, "resolved sink config");
    Ok((config, source))
}

/// Apply the failure-policy environment overrides on top of `config`.
pub fn apply_env_overrides<F>(config: &mut SinkConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let policy = &mut config.failure_policy;
    let overrides: [(&'static str, &mut bool); 4] = [
        (ENV_FAIL_ON_DEFAULT_FAULT, &mut policy.fail_on_default_fault),
        (
            ENV_FAIL_ON_VALIDATION_FAILURE,
            &mut policy.fail_on_validation_failure,
        ),
        (
            ENV_FAIL_ON_PARTIAL_REJECTION,
            &mut policy.fail_on_partial_rejection,
        ),
        (
            ENV_LOG_FULL_REQUEST_ON_FAILURE,
            &mut policy.log_full_request_on_failure,
        ),
    ];

    for (var, slot) in overrides {
        if let Some(value) = env(var) {
            *slot = parse_bool(var, &value)?;
        }
    }
    Ok(())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvBool {
            var,
            value: value.to_string(),
        }),
    }
}
