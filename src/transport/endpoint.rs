use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::agent::config::NetworkConfig;
use crate::commands::Dispatcher;
use crate::transport::codec::{decode_command, encode_status};
use crate::transport::delivery::{DeliveryError, DeliveryTable};
use crate::transport::protocol_log::ProtocolLog;
use crate::transport::{Command, Status, StatusStream};

// Pause after a socket error before receiving again.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(50);

/// The engine's single datagram endpoint: receives commands and routes
/// status events back to whichever peer issued the task.
#[derive(Debug)]
pub struct Endpoint {
    socket: UdpSocket,
    deliveries: DeliveryTable,
    buffer_size: usize,
    log: ProtocolLog,
}

impl Endpoint {
    pub async fn bind(config: &NetworkConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.local_ip, config.local_port);
        let socket = UdpSocket::bind(&addr)
            .await
            .with_context(|| format!("binding UDP socket on {addr}"))?;
        info!(local = %socket.local_addr()?, "message endpoint listening");

        Ok(Self {
            socket,
            deliveries: DeliveryTable::new_ttl(config.delivery_ttl_secs),
            buffer_size: config.buffer_size,
            log: ProtocolLog::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().context("reading local socket address")
    }

    pub fn deliveries(&self) -> &DeliveryTable {
        &self.deliveries
    }

    /// Wait for one datagram. Returns `None` when the payload was dropped
    /// because it could not be decoded. A decoded command is registered in
    /// the delivery table before it is returned.
    pub async fn receive(&self, buf: &mut [u8]) -> Result<Option<Command>> {
        let (read, peer) = self
            .socket
            .recv_from(buf)
            .await
            .context("receiving datagram")?;

        let text = match std::str::from_utf8(&buf[..read]) {
            Ok(text) => text,
            Err(err) => {
                self.log.datagram_dropped(peer, &err.to_string());
                return Ok(None);
            }
        };
        debug!(peer = %peer, bytes = read, payload = %text, "datagram received");

        let command = match decode_command(text) {
            Ok(command) => command,
            Err(err) => {
                self.log.datagram_dropped(peer, &err.to_string());
                return Ok(None);
            }
        };

        self.log.command_received(peer, &command);
        if let Some(previous) = self.deliveries.register(&command.task_id, peer).await {
            if previous != peer {
                self.log.task_id_reused(&command.task_id, previous, peer);
            }
        }
        Ok(Some(command))
    }

    /// Receive loop. Never returns on per-datagram failures; a bad datagram
    /// or a socket hiccup is logged and the loop keeps serving.
    pub async fn serve(&self, dispatcher: &Dispatcher) {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            match self.receive(&mut buf).await {
                Ok(Some(command)) => dispatcher.handle(&command),
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "receive failed");
                    tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                }
            }
        }
    }

    pub async fn send(&self, status: &Status) -> Result<SocketAddr, DeliveryError> {
        let payload = encode_status(status);
        let peer = self
            .deliveries
            .deliver(status, |peer| {
                let payload = payload.as_bytes();
                async move { self.socket.send_to(payload, peer).await.map(|_| ()) }
            })
            .await?;
        self.log.status_sent(peer, status);
        Ok(peer)
    }

    /// Drain the status channel and push every status to its peer.
    pub async fn forward_statuses(&self, mut statuses: StatusStream) {
        while let Some(status) = statuses.recv().await {
            if let Err(err) = self.send(&status).await {
                self.log.delivery_failed(&status, &err.to_string());
            }
        }
        debug!("status channel closed, forwarder stopping");
    }
}
