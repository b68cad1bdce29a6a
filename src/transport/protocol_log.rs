use std::net::SocketAddr;

use tracing::{debug, info, warn};

use super::{Command, Status};

/// Structured log of wire traffic under the `protocol` target.
#[derive(Debug, Clone, Default)]
pub struct ProtocolLog;

impl ProtocolLog {
    pub fn new() -> Self {
        Self
    }

    pub fn command_received(&self, peer: SocketAddr, command: &Command) {
        info!(target: "protocol", event = "command_received", peer = %peer, task_id = %command.task_id, command_type = %command.command_type, params = command.params.len());
    }

    pub fn datagram_dropped(&self, peer: SocketAddr, reason: &str) {
        warn!(target: "protocol", event = "datagram_dropped", peer = %peer, reason);
    }

    pub fn task_id_reused(&self, task_id: &str, previous: SocketAddr, peer: SocketAddr) {
        warn!(target: "protocol", event = "task_id_reused", task_id, previous = %previous, peer = %peer);
    }

    pub fn status_sent(&self, peer: SocketAddr, status: &Status) {
        debug!(target: "protocol", event = "status_sent", peer = %peer, task_id = %status.task_id, status = %status.status);
    }

    pub fn delivery_failed(&self, status: &Status, reason: &str) {
        warn!(target: "protocol", event = "delivery_failed", task_id = %status.task_id, status = %status.status, reason);
    }
}
