use crate::config::parse::load_config;
use crate::config::Config;
use crate::labels::LabelResolver;
use crate::loki::{LokiClient, Sink};
use crate::pipeline::{
    BatchScheduler, FlushOutcome, FragmentBuilder, FragmentSender, IngestionBuffer,
    SchedulerSettings,
};
use crate::syslog::{ListenerError, SyslogListener};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::parse::ConfigError),

    #[error("loki client error: {0}")]
    Loki(#[from] crate::loki::LokiClientError),

    #[error("syslog listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ./config.json");
            eprintln!("  ~/.config/sysloki/config.json");
            eprintln!("  /etc/sysloki/config.json");
            eprintln!("\nUse --config <path> to specify a config file, or run 'sysloki config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_forwarder(&config_path).await.map_err(|e| e.into())
}

async fn run_forwarder(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let forwarder = Forwarder::start(&config).await?;

    info!("Forwarder started, press Ctrl+C to shutdown");
    wait_for_signal().await;
    info!("Shutdown signal received");

    forwarder.shutdown().await?;
    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

/// A running listener plus batch scheduler pair.
pub struct Forwarder {
    syslog_addr: SocketAddr,
    sender: FragmentSender,
    shutdown: CancellationToken,
    scheduler: JoinHandle<FlushOutcome>,
    listener: JoinHandle<Result<u64, ListenerError>>,
}

impl Forwarder {
    /// Build the Loki client, bind the syslog socket and spawn both tasks.
    ///
    /// An invalid Loki URL or an unbindable syslog address fails here,
    /// before anything is spawned.
    pub async fn start(config: &Config) -> Result<Self, RunError> {
        let client = LokiClient::new(&config.loki_server, &config.loki)?;
        info!(server = %client.base_url(), "Loki client created");
        Self::start_with_sink(config, Arc::new(client)).await
    }

    /// Like [`Forwarder::start`] but delivering to an arbitrary sink
    pub async fn start_with_sink(config: &Config, sink: Arc<dyn Sink>) -> Result<Self, RunError> {
        let resolver = LabelResolver::new(config.scrape_config.clone());
        info!(rules = resolver.rule_count(), "Label rules loaded");

        let listener =
            SyslogListener::bind(&config.syslog_bind, FragmentBuilder::new(resolver)).await?;
        let syslog_addr = listener.local_addr()?;

        let (sender, receiver) = IngestionBuffer::new(config.pipeline.buffer_capacity);
        let shutdown = CancellationToken::new();

        let scheduler = BatchScheduler::new(sink, SchedulerSettings::from(&config.pipeline));
        let scheduler = tokio::spawn(scheduler.run(receiver, shutdown.clone()));

        let listener = tokio::spawn(listener.run(sender.clone(), shutdown.clone()));

        Ok(Self {
            syslog_addr,
            sender,
            shutdown,
            scheduler,
            listener,
        })
    }

    /// Address the syslog socket is bound to
    pub fn syslog_addr(&self) -> SocketAddr {
        self.syslog_addr
    }

    /// Producer handle for submitting fragments without going through UDP
    pub fn sender(&self) -> FragmentSender {
        self.sender.clone()
    }

    /// Stop listening, run the last flush and wait for both tasks.
    pub async fn shutdown(self) -> Result<FlushOutcome, RunError> {
        self.shutdown.cancel();
        drop(self.sender);

        let outcome = self.scheduler.await?;
        info!(outcome = ?outcome, "Batch scheduler stopped");

        match self.listener.await? {
            Ok(count) => info!(records = count, "Syslog listener stopped"),
            // The scheduler may exit while the listener waits on a full buffer
            Err(ListenerError::Pipeline(e)) => debug!(error = %e, "Syslog listener stopped"),
            Err(e) => return Err(e.into()),
        }

        Ok(outcome)
    }
}
