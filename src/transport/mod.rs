pub mod client;
pub mod codec;
pub mod delivery;
pub mod endpoint;
pub mod protocol_log;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

pub use codec::{decode_command, decode_status, encode_command, encode_status, ProtocolError};
pub use delivery::{DeliveryError, DeliveryTable};
pub use endpoint::Endpoint;

/// Free-form `parameters` of a command or `details` of a status.
pub type Attributes = BTreeMap<String, String>;

pub const STARTED: &str = "started";
pub const FINISHED: &str = "finished";
pub const REJECTED: &str = "rejected";
pub const BOOKMARK: &str = "bookmark";

/// A unit of work requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(alias = "task")]
    pub task_id: String,
    #[serde(alias = "type")]
    pub command_type: String,
    #[serde(default, alias = "parameters")]
    pub params: Attributes,
}

impl Command {
    pub fn new(task_id: impl Into<String>, command_type: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            command_type: command_type.into(),
            params: Attributes::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Lifecycle report for a task, correlated by `task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(alias = "task")]
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub details: Attributes,
}

impl Status {
    pub fn new(task_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: status.into(),
            details: Attributes::new(),
        }
    }

    pub fn started(task_id: impl Into<String>) -> Self {
        Self::new(task_id, STARTED)
    }

    pub fn finished(task_id: impl Into<String>) -> Self {
        Self::new(task_id, FINISHED)
    }

    pub fn rejected(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(task_id, REJECTED).with_detail("reason", reason)
    }

    pub fn bookmark(task_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(task_id, BOOKMARK).with_detail("id", id)
    }

    pub fn with_detail(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(name.into(), value.into());
        self
    }

    pub fn detail(&self, name: &str) -> Option<&str> {
        self.details.get(name).map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        self.status == FINISHED
    }

    /// `finished` and `rejected` close a task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        self.status == FINISHED || self.status == REJECTED
    }
}

/// Sending half of the status channel. Schedulers and the dispatcher emit
/// here; the endpoint's forwarder drains the other end.
#[derive(Debug, Clone)]
pub struct StatusSink {
    tx: mpsc::UnboundedSender<Status>,
}

pub type StatusStream = mpsc::UnboundedReceiver<Status>;

pub fn status_channel() -> (StatusSink, StatusStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSink { tx }, rx)
}

impl StatusSink {
    pub fn emit(&self, status: Status) {
        if let Err(err) = self.tx.send(status) {
            debug!(task_id = %err.0.task_id, status = %err.0.status, "status channel closed, dropping status");
        }
    }

    pub fn emit_all(&self, statuses: impl IntoIterator<Item = Status>) {
        for status in statuses {
            self.emit(status);
        }
    }
}
