use crate::config::PipelineConfig;
use crate::loki::Sink;
use crate::pipeline::batcher::{make_batches, DEFAULT_MAX_STREAMS_PER_BATCH};
use crate::pipeline::channel::FragmentReceiver;
use crate::pipeline::fragment::StreamFragment;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timer periods and batch bound of the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub flush_interval: Duration,
    pub ready_interval: Duration,
    pub max_streams_per_batch: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(3),
            ready_interval: Duration::from_secs(10),
            max_streams_per_batch: DEFAULT_MAX_STREAMS_PER_BATCH,
        }
    }
}

impl From<&PipelineConfig> for SchedulerSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            flush_interval: config.flush_interval,
            ready_interval: config.ready_interval,
            max_streams_per_batch: config.max_streams_per_batch,
        }
    }
}

/// What a call to [`BatchScheduler::flush`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending
    Empty,
    /// The sink was not ready; the pending fragments were kept
    NotReady { pending: usize },
    /// Delivery was attempted and the pending fragments were cleared.
    /// `abandoned` counts batches dropped after a failed push.
    Delivered {
        batches: usize,
        entries: usize,
        abandoned: usize,
    },
}

/// Owns the fragments accumulated since the last flush and the sink's
/// readiness flag. Both are touched only from the scheduler's own task.
pub struct BatchScheduler {
    sink: Arc<dyn Sink>,
    settings: SchedulerSettings,
    pending: Vec<StreamFragment>,
    ready: bool,
}

impl BatchScheduler {
    pub fn new(sink: Arc<dyn Sink>, settings: SchedulerSettings) -> Self {
        Self {
            sink,
            settings,
            pending: Vec::new(),
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending(&self) -> &[StreamFragment] {
        &self.pending
    }

    /// Add an arrived fragment to the accumulation set
    pub fn accept(&mut self, fragment: StreamFragment) {
        self.pending.push(fragment);
    }

    /// Re-probe the sink and overwrite the readiness flag
    pub async fn refresh_readiness(&mut self) {
        let ready = self.sink.probe_readiness().await;
        if ready != self.ready {
            info!(component = "scheduler", ready, "Loki readiness changed");
        }
        self.ready = ready;
    }

    /// Deliver everything accumulated so far.
    ///
    /// While the sink is not ready the fragments are kept for a later tick.
    /// Once delivery is attempted they are cleared whatever the outcome: a
    /// failed push drops the rest of this cycle's batches and is not retried.
    pub async fn flush(&mut self) -> FlushOutcome {
        if self.pending.is_empty() {
            return FlushOutcome::Empty;
        }

        if !self.ready {
            warn!(
                component = "scheduler",
                pending = self.pending.len(),
                "Loki is not ready, holding logs until the next flush"
            );
            return FlushOutcome::NotReady {
                pending: self.pending.len(),
            };
        }

        let batches = make_batches(&self.pending, self.settings.max_streams_per_batch);
        let total = batches.len();
        let mut sent = 0;
        let mut entries = 0;

        for batch in &batches {
            match self.sink.push(batch).await {
                Ok(()) => {
                    sent += 1;
                    entries += batch.entry_count();
                }
                Err(e) => {
                    warn!(
                        component = "scheduler",
                        error = %e,
                        abandoned_batches = total - sent,
                        "Push to Loki failed, dropping the rest of this flush"
                    );
                    break;
                }
            }
        }

        self.pending.clear();

        debug!(
            component = "scheduler",
            batches = sent,
            entries,
            "Flush complete"
        );

        FlushOutcome::Delivered {
            batches: sent,
            entries,
            abandoned: total - sent,
        }
    }

    /// Run the scheduling loop until `shutdown` fires or every producer is gone.
    ///
    /// The sink is probed once up front. The loop then serves flush ticks,
    /// fragment arrivals and readiness ticks in whatever order they become
    /// ready. On exit, fragments still queued in the buffer are drained and
    /// one final flush is made; its outcome is returned.
    pub async fn run(
        mut self,
        mut receiver: FragmentReceiver,
        shutdown: CancellationToken,
    ) -> FlushOutcome {
        self.refresh_readiness().await;

        let mut flush_timer = interval_at(
            Instant::now() + self.settings.flush_interval,
            self.settings.flush_interval,
        );
        flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ready_timer = interval_at(
            Instant::now() + self.settings.ready_interval,
            self.settings.ready_interval,
        );
        ready_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            component = "scheduler",
            flush_interval_ms = self.settings.flush_interval.as_millis() as u64,
            ready_interval_ms = self.settings.ready_interval.as_millis() as u64,
            max_streams_per_batch = self.settings.max_streams_per_batch,
            "Batch scheduler started"
        );

        loop {
            tokio::select! {
                _ = flush_timer.tick() => {
                    self.flush().await;
                }

                fragment = receiver.recv() => {
                    match fragment {
                        Some(fragment) => self.accept(fragment),
                        None => {
                            info!(component = "scheduler", "Ingestion buffer closed");
                            break;
                        }
                    }
                }

                _ = ready_timer.tick() => {
                    self.refresh_readiness().await;
                }

                _ = shutdown.cancelled() => {
                    info!(component = "scheduler", "Shutdown requested");
                    break;
                }
            }
        }

        while let Some(fragment) = receiver.try_recv() {
            self.accept(fragment);
        }

        let outcome = self.flush().await;
        if let FlushOutcome::NotReady { pending } = outcome {
            warn!(
                component = "scheduler",
                dropped = pending,
                "Loki not ready at shutdown, pending logs are lost"
            );
        }

        info!(component = "scheduler", "Exiting Loki client");
        outcome
    }
}
