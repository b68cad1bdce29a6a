//! Controller side of the protocol: sends commands to an engine and
//! listens for the status events that come back.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::transport::codec::{decode_status, encode_command};
use crate::transport::{Command, Status};

#[derive(Debug)]
pub struct Controller {
    socket: UdpSocket,
    remote: SocketAddr,
    buffer_size: usize,
}

impl Controller {
    pub async fn connect(local: SocketAddr, remote: SocketAddr, buffer_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .with_context(|| format!("binding controller socket on {local}"))?;
        socket
            .connect(remote)
            .await
            .with_context(|| format!("connecting controller socket to {remote}"))?;
        debug!(local = %socket.local_addr()?, remote = %remote, "controller ready");
        Ok(Self {
            socket,
            remote,
            buffer_size,
        })
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub async fn send(&self, command: &Command) -> Result<()> {
        let payload = encode_command(command);
        debug!(task_id = %command.task_id, payload = %payload, "sending command");
        self.socket
            .send(payload.as_bytes())
            .await
            .context("sending command datagram")?;
        Ok(())
    }

    /// Next decodable status from the engine; undecodable datagrams are
    /// logged and skipped.
    pub async fn next_status(&self) -> Result<Status> {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let read = self
                .socket
                .recv(&mut buf)
                .await
                .context("receiving status datagram")?;
            let text = String::from_utf8_lossy(&buf[..read]);
            match decode_status(&text) {
                Ok(status) => return Ok(status),
                Err(err) => warn!(error = %err, payload = %text, "ignoring undecodable status"),
            }
        }
    }

    /// Collect statuses for `task_id` until a terminal one arrives or `wait`
    /// elapses. Statuses of other tasks are passed to `on_status` as well.
    pub async fn await_terminal<F>(
        &self,
        task_id: &str,
        wait: Duration,
        mut on_status: F,
    ) -> Result<Option<Status>>
    where
        F: FnMut(&Status),
    {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let status = match timeout(remaining, self.next_status()).await {
                Ok(status) => status?,
                Err(_) => return Ok(None),
            };
            on_status(&status);
            if status.task_id == task_id && status.is_terminal() {
                return Ok(Some(status));
            }
        }
    }
}
