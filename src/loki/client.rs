use crate::config::LokiConfig;
use crate::loki::sink::Sink;
use crate::loki::types::{PushBatch, PUSH_PATH, READY_PATH};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LokiClientError {
    #[error("invalid Loki server URL '{url}' (expected like http://loki:3100): {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Loki returned error status {status}: {message}")]
    LokiError { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, LokiClientError>;

/// Check that a base URL parses and uses http or https
pub fn validate_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| LokiClientError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(LokiClientError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// HTTP client for a Loki server
#[derive(Debug)]
pub struct LokiClient {
    base_url: String,
    client: reqwest::Client,
    ready_attempts: usize,
}

impl LokiClient {
    /// Build a client. An unparsable URL or a scheme other than http(s) is an error.
    pub fn new(base_url: &str, config: &LokiConfig) -> Result<Self> {
        validate_base_url(base_url)?;
        Self::build(base_url, config)
    }

    fn build(base_url: &str, config: &LokiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            ready_attempts: config.ready_attempts.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn push_url(&self) -> String {
        format!("{}{}", self.base_url, PUSH_PATH)
    }

    fn ready_url(&self) -> String {
        format!("{}{}", self.base_url, READY_PATH)
    }

    /// POST one batch to the push endpoint. Not retried.
    pub async fn push(&self, batch: &PushBatch) -> Result<()> {
        let body = serde_json::to_vec(batch)?;

        let response = self
            .client
            .post(self.push_url())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LokiClientError::LokiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        debug!(
            component = "loki",
            items = batch.entry_count(),
            streams = batch.streams.len(),
            max_stream_items = batch.max_stream_len(),
            "Pushed logs to Loki"
        );

        Ok(())
    }

    /// Ask `/ready` up to `ready_attempts` times, back to back.
    ///
    /// Returns true on the first HTTP 200. A malformed base URL returns false
    /// without sending anything.
    pub async fn probe_readiness(&self) -> bool {
        if let Err(e) = validate_base_url(&self.ready_url()) {
            warn!(component = "loki", error = %e, "Loki server is not ready, check the server URL");
            return false;
        }

        let url = self.ready_url();
        for attempt in 1..=self.ready_attempts {
            match self.client.get(&url).send().await {
                Ok(response) if response.status() == StatusCode::OK => return true,
                Ok(response) => {
                    warn!(
                        component = "loki",
                        server = %self.base_url,
                        attempt,
                        status = response.status().as_u16(),
                        "Loki server is not ready"
                    );
                }
                Err(e) => {
                    warn!(
                        component = "loki",
                        server = %self.base_url,
                        attempt,
                        error = %e,
                        "Loki server is not ready"
                    );
                }
            }
        }

        false
    }
}

#[async_trait]
impl Sink for LokiClient {
    async fn push(&self, batch: &PushBatch) -> Result<()> {
        LokiClient::push(self, batch).await
    }

    async fn probe_readiness(&self) -> bool {
        LokiClient::probe_readiness(self).await
    }
}
