//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::{HeaderMode, LogFormat, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_VAR: &str = "PROXY_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration the way the binary does: optional file named by
/// `PROXY_CONFIG`, then process environment overrides, then validation.
pub fn load_from_env() -> Result<ProxyConfig, ConfigError> {
    let mut config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        Err(_) => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("HOST") {
        config.listener.host = v;
    }
    if let Some(v) = lookup("PORT") {
        config.listener.port = parse_var("PORT", v)?;
    }

    if let Some(v) = lookup("UPSTREAM_URL").or_else(|| lookup("TARGET_URL")) {
        config.upstream.url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = lookup("UPSTREAM_TIMEOUT_SECS") {
        config.upstream.timeout_secs = parse_var("UPSTREAM_TIMEOUT_SECS", v)?;
    }

    if let Some(v) = lookup("RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = parse_bool("RATE_LIMIT_ENABLED", v)?;
    }
    if let Some(v) = lookup("RATE_LIMIT_MAX") {
        config.rate_limit.max_requests = parse_var("RATE_LIMIT_MAX", v)?;
    }
    if let Some(v) = lookup("RATE_LIMIT_WINDOW_SECS") {
        config.rate_limit.window_secs = parse_var("RATE_LIMIT_WINDOW_SECS", v)?;
    }
    if let Some(v) = lookup("TRUST_FORWARDED_FOR") {
        config.rate_limit.trust_forwarded_for = parse_bool("TRUST_FORWARDED_FOR", v)?;
    }

    if let Some(v) = lookup("CACHE_ENABLED") {
        config.cache.enabled = parse_bool("CACHE_ENABLED", v)?;
    }
    if let Some(v) = lookup("CACHE_TTL_SECS") {
        config.cache.ttl_secs = parse_var("CACHE_TTL_SECS", v)?;
    }

    if let Some(v) = lookup("SANITIZE_HTML") {
        config.sanitizer.enabled = parse_bool("SANITIZE_HTML", v)?;
    }
    if let Some(v) = lookup("HEADER_MODE") {
        config.headers.mode = match v.to_ascii_lowercase().as_str() {
            "permissive" => HeaderMode::Permissive,
            "strict" => HeaderMode::Strict,
            _ => return Err(ConfigError::Env { var: "HEADER_MODE", value: v }),
        };
    }

    if let Some(v) = lookup("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some(v) = lookup("LOG_FORMAT") {
        config.observability.log_format = match v.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => return Err(ConfigError::Env { var: "LOG_FORMAT", value: v }),
        };
    }
    if let Some(v) = lookup("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_bool("METRICS_ENABLED", v)?;
    }
    if let Some(v) = lookup("METRICS_ADDRESS") {
        config.observability.metrics_address = v;
    }

    Ok(())
}

fn parse_var<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env { var, value }),
    }
}
