use crate::pipeline::fragment::StreamFragment;
use crate::pipeline::PipelineError;
use tokio::sync::mpsc;

/// Default number of fragments the ingestion buffer holds before producers wait
pub const DEFAULT_BUFFER_CAPACITY: usize = 10240;

/// Bounded queue between record producers and the batch scheduler.
///
/// A full buffer makes `submit` wait; nothing is ever dropped.
pub struct IngestionBuffer;

impl IngestionBuffer {
    /// Create the producer and consumer halves of a buffer
    pub fn new(capacity: usize) -> (FragmentSender, FragmentReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (FragmentSender { tx }, FragmentReceiver { rx })
    }
}

/// Producer half. Cheap to clone, one per producer.
#[derive(Debug, Clone)]
pub struct FragmentSender {
    tx: mpsc::Sender<StreamFragment>,
}

impl FragmentSender {
    /// Enqueue a fragment, waiting while the buffer is full.
    pub async fn submit(&self, fragment: StreamFragment) -> Result<(), PipelineError> {
        self.tx
            .send(fragment)
            .await
            .map_err(|_| PipelineError::ChannelClosed)
    }

    /// Free slots left in the buffer
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the batch scheduler.
#[derive(Debug)]
pub struct FragmentReceiver {
    rx: mpsc::Receiver<StreamFragment>,
}

impl FragmentReceiver {
    /// Next fragment, or `None` once every sender is gone and the buffer is drained
    pub async fn recv(&mut self) -> Option<StreamFragment> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<StreamFragment> {
        self.rx.try_recv().ok()
    }
}
