pub mod batcher;
pub mod channel;
pub mod fragment;
pub mod scheduler;

use thiserror::Error;

pub use batcher::make_batches;
pub use channel::{FragmentReceiver, FragmentSender, IngestionBuffer};
pub use fragment::{Entry, FragmentBuilder, StreamFragment};
pub use scheduler::{BatchScheduler, FlushOutcome, SchedulerSettings};

/// Errors that can occur during pipeline operation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("ingestion buffer closed")]
    ChannelClosed,
}
