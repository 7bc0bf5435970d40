use crate::loki::client::LokiClientError;
use crate::loki::types::PushBatch;
use async_trait::async_trait;

/// Destination the batch scheduler delivers to.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one batch. Failures are final: the caller does not retry.
    async fn push(&self, batch: &PushBatch) -> Result<(), LokiClientError>;

    /// Whether the destination currently accepts pushes
    async fn probe_readiness(&self) -> bool;
}
