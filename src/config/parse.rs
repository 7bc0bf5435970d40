use super::types::*;
use crate::config::{expand_env_vars, unexpanded_env_vars};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Format of a config file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&text, ConfigFormat::from_path(path))
}

/// Parse and validate config text.
pub fn parse_config(text: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let text = expand_env_vars(text);
    check_unexpanded_vars(&text)?;

    let mut config: Config = match format {
        ConfigFormat::Json => serde_json::from_str(&text)?,
        ConfigFormat::Yaml => serde_yaml::from_str(&text)?,
    };

    config.syslog_bind = normalize_bind_addr(&config.syslog_bind);
    validate_config(&config)?;

    Ok(config)
}

fn check_unexpanded_vars(text: &str) -> Result<(), ConfigError> {
    let mut vars = unexpanded_env_vars(text);
    if vars.is_empty() {
        return Ok(());
    }

    vars.sort();
    vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        vars.join(", ")
    )))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.loki_server.trim().is_empty() {
        errors.push("loki_server must not be empty".to_string());
    }

    if !is_bind_addr(&config.syslog_bind) {
        errors.push(format!(
            "syslog_bind: '{}' is not a valid bind address (like 0.0.0.0:514 or localhost:514)",
            config.syslog_bind
        ));
    }

    validate_pipeline(&config.pipeline, &mut errors);

    if config.loki.ready_attempts == 0 {
        errors.push("loki.ready_attempts must be at least 1".to_string());
    }

    let mut seen = HashSet::new();
    for (index, rule) in config.scrape_config.iter().enumerate() {
        if rule.tag.is_empty() {
            errors.push(format!("scrape_config[{}]: tag must not be empty", index));
        } else if !seen.insert(rule.tag.as_str()) {
            tracing::warn!(
                tag = %rule.tag,
                index,
                "Duplicate scrape rule tag, only the first rule will match"
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

/// A bare `:port` binds every IPv4 interface.
fn normalize_bind_addr(addr: &str) -> String {
    let addr = addr.trim();
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => addr.to_string(),
    }
}

/// An IP socket address, or `host:port` left for the resolver at bind time.
fn is_bind_addr(addr: &str) -> bool {
    if addr.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty()
                && !host.contains(':')
                && !host.chars().any(char::is_whitespace)
                && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

fn validate_pipeline(pipeline: &PipelineConfig, errors: &mut Vec<String>) {
    if pipeline.buffer_capacity == 0 {
        errors.push("pipeline.buffer_capacity must be greater than 0".to_string());
    }
    if pipeline.max_streams_per_batch == 0 {
        errors.push("pipeline.max_streams_per_batch must be greater than 0".to_string());
    }
    if pipeline.flush_interval.is_zero() {
        errors.push("pipeline.flush_interval must be greater than 0".to_string());
    }
    if pipeline.ready_interval.is_zero() {
        errors.push("pipeline.ready_interval must be greater than 0".to_string());
    }
}
