use crate::labels::LabelSet;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
///
/// Field names are snake_case. The PascalCase keys of legacy JSON
/// config files (`SyslogBind`, `LokiServer`, `ScrapeConfig`) are accepted too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(alias = "SyslogBind", default = "default_syslog_bind")]
    pub syslog_bind: String,
    #[serde(alias = "LokiServer")]
    pub loki_server: String,
    #[serde(alias = "ScrapeConfig", default)]
    pub scrape_config: Vec<ScrapeRule>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub loki: LokiConfig,
}

fn default_syslog_bind() -> String {
    "0.0.0.0:514".to_string()
}

/// One entry of the label rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRule {
    #[serde(alias = "Tag")]
    pub tag: String,
    #[serde(alias = "Labels", default)]
    pub labels: LabelSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(with = "humantime_serde", default = "default_flush_interval")]
    pub flush_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_ready_interval")]
    pub ready_interval: Duration,
    #[serde(default = "default_max_streams_per_batch")]
    pub max_streams_per_batch: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            flush_interval: default_flush_interval(),
            ready_interval: default_ready_interval(),
            max_streams_per_batch: default_max_streams_per_batch(),
        }
    }
}

fn default_buffer_capacity() -> usize {
    10240
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_ready_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_streams_per_batch() -> usize {
    4096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LokiConfig {
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    #[serde(default = "default_ready_attempts")]
    pub ready_attempts: usize,
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            ready_attempts: default_ready_attempts(),
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_ready_attempts() -> usize {
    3
}
