pub mod client;
pub mod sink;
pub mod types;

pub use client::{LokiClient, LokiClientError};
pub use sink::Sink;
pub use types::PushBatch;
