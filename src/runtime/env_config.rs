//! Environment variable and config file support for [`ContextBuilder`](super::builder::ContextBuilder).
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`unobserved_failure(..)`)
//! 2. **Environment variables**: values from `TETHER_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`ContextConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `TETHER_UNOBSERVED_FAILURE` | `log` / `panic` / `silent` | `unobserved_failure` |
//! | `TETHER_THREAD_NAME_PREFIX` | `String` | `thread_name_prefix` |

use crate::error::Error;
use crate::runtime::config::{ContextConfig, UnobservedFailure};

/// Environment variable name for the unobserved failure policy.
pub const ENV_UNOBSERVED_FAILURE: &str = "TETHER_UNOBSERVED_FAILURE";
/// Environment variable name for thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "TETHER_THREAD_NAME_PREFIX";

/// Apply environment variable overrides to a [`ContextConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut ContextConfig) -> Result<(), Error> {
    if let Some(val) = read_env(ENV_UNOBSERVED_FAILURE) {
        config.unobserved_failure = parse_policy(ENV_UNOBSERVED_FAILURE, &val)?;
    }
    if let Some(val) = read_env(ENV_THREAD_NAME_PREFIX) {
        config.thread_name_prefix = parse_prefix(ENV_THREAD_NAME_PREFIX, &val)?;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// A rejected configuration source or value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting was present but could not be parsed.
    #[error("invalid value for {setting}: expected {expected}, got {value:?}")]
    InvalidValue {
        /// Environment variable or TOML key.
        setting: String,
        /// What the setting accepts.
        expected: &'static str,
        /// The rejected raw value.
        value: String,
    },
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`ContextTomlConfig`].
    #[cfg(feature = "config-file")]
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    fn invalid(setting: &str, expected: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            setting: setting.to_string(),
            expected,
            value: value.to_string(),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        Self::invalid_configuration(message).with_source(err)
    }
}

fn parse_policy(var_name: &str, val: &str) -> Result<UnobservedFailure, Error> {
    val.parse::<UnobservedFailure>()
        .map_err(|_| ConfigError::invalid(var_name, "log, panic or silent", val).into())
}

fn parse_prefix(var_name: &str, val: &str) -> Result<String, Error> {
    let trimmed = val.trim();
    if trimmed.is_empty() || trimmed.contains('\0') {
        return Err(ConfigError::invalid(var_name, "a non-empty thread name", val).into());
    }
    Ok(trimmed.to_string())
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable context configuration.
///
/// ```toml
/// [context]
/// unobserved_failure = "panic"
/// thread_name_prefix = "io"
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ContextTomlConfig {
    /// Context settings.
    #[serde(default)]
    pub context: ContextToml,
}

/// Context section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ContextToml {
    /// Unobserved failure policy (`log`, `panic` or `silent`).
    pub unobserved_failure: Option<String>,
    /// Name prefix for worker threads.
    pub thread_name_prefix: Option<String>,
}

/// Apply a parsed TOML config to a [`ContextConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut ContextConfig, toml: &ContextTomlConfig) -> Result<(), Error> {
    if let Some(ref v) = toml.context.unobserved_failure {
        config.unobserved_failure = parse_policy("context.unobserved_failure", v)?;
    }
    if let Some(ref v) = toml.context.thread_name_prefix {
        config.thread_name_prefix = parse_prefix("context.thread_name_prefix", v)?;
    }
    Ok(())
}

/// Parse a TOML string into a [`ContextTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<ContextTomlConfig, Error> {
    toml::from_str(toml_str).map_err(|e| ConfigError::from(e).into())
}

/// Read and parse a TOML file into a [`ContextTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<ContextTomlConfig, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_toml_str(&content)
}

// =========================================================================
// Tests
// =========================================================================


#[cfg(all(test, feature = "config-file"))]
mod toml_tests {
    use super::*;

    #[test]
    fn parse_toml_full_config() {
        let parsed = parse_toml_str(
            r#"
[context]
unobserved_failure = "panic"
thread_name_prefix = "io"
"#,
        )
        .unwrap();
        assert_eq!(parsed.context.unobserved_failure.as_deref(), Some("panic"));
        assert_eq!(parsed.context.thread_name_prefix.as_deref(), Some("io"));
    }

    #[test]
    fn parse_toml_empty_config() {
        let parsed = parse_toml_str("").unwrap();
        assert_eq!(parsed.context.unobserved_failure, None);
        assert_eq!(parsed.context.thread_name_prefix, None);
    }

    #[test]
    fn parse_toml_invalid_syntax() {
        let msg = parse_toml_str("not valid toml {{{{").unwrap_err().to_string();
        assert!(msg.contains("TOML"));
    }

    #[test]
    fn apply_toml_overrides_config() {
        let parsed = parse_toml_str("[context]\nunobserved_failure = \"silent\"\n").unwrap();
        let mut config = ContextConfig::default();
        apply_toml_config(&mut config, &parsed).unwrap();
        assert_eq!(config.unobserved_failure, UnobservedFailure::Silent);
        assert_eq!(config.thread_name_prefix, "tether");
    }

    #[test]
    fn apply_toml_rejects_unknown_policy() {
        let parsed = parse_toml_str("[context]\nunobserved_failure = \"loud\"\n").unwrap();
        let mut config = ContextConfig::default();
        assert!(apply_toml_config(&mut config, &parsed).is_err());
    }
}
