use crate::pipeline::{FragmentBuilder, FragmentSender, PipelineError};
use crate::syslog::message::parse_rfc3164;
use chrono::Utc;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Largest UDP payload the socket can deliver
const MAX_DATAGRAM_SIZE: usize = 65535;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind syslog listener to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// UDP listener decoding RFC 3164 syslog datagrams into stream fragments.
pub struct SyslogListener {
    socket: UdpSocket,
    builder: FragmentBuilder,
}

impl SyslogListener {
    /// Bind the UDP socket
    pub async fn bind(addr: &str, builder: FragmentBuilder) -> Result<Self, ListenerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self { socket, builder })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive datagrams until `shutdown` fires, submitting one fragment per
    /// datagram. A multi-line datagram stays a single record. Returns the
    /// number of records submitted.
    ///
    /// Submitting waits while the ingestion buffer is full, so a stalled
    /// scheduler stops the listener from reading further datagrams.
    pub async fn run(
        self,
        sender: FragmentSender,
        shutdown: CancellationToken,
    ) -> Result<u64, ListenerError> {
        let addr = self.local_addr()?;
        info!(component = "syslog", address = %addr, "Syslog listener started");

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut count: u64 = 0;

        loop {
            let (len, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        error!(component = "syslog", error = %e, "Failed to receive UDP packet");
                        continue;
                    }
                },
            };

            let data = match std::str::from_utf8(&buf[..len]) {
                Ok(s) => s,
                Err(e) => {
                    warn!(component = "syslog", peer = %peer, error = %e, "Invalid UTF-8 in syslog packet");
                    continue;
                }
            };

            let message = data.trim_end_matches(['\r', '\n', '\0']);
            if message.trim().is_empty() {
                continue;
            }

            let peer = peer.to_string();
            let now = Utc::now();
            let record = parse_rfc3164(message, Some(&peer), now);
            debug!(
                component = "syslog",
                peer = %peer,
                tag = record.tag.as_deref().unwrap_or(""),
                "Received syslog message"
            );

            let fragment = self.builder.build(&record, now);
            sender.submit(fragment).await?;
            count += 1;
        }

        info!(component = "syslog", records = count, "Exit syslog listening");
        Ok(count)
    }
}
