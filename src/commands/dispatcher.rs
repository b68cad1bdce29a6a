use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::CommandError;
use crate::transport::{Command, Status, StatusSink};

/// Executes one command type. Handlers emit their statuses while still
/// holding the scheduler they touched, so a tick can never overtake them.
pub trait CommandHandler: Send + Sync {
    fn command_type(&self) -> &'static str;

    fn handle(&self, command: &Command, sink: &StatusSink) -> Result<(), CommandError>;
}

/// Routes commands to handlers by type and reports the outcome on the
/// status channel.
pub struct Dispatcher {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
    // known types whose channel is switched off on this agent
    disabled: HashSet<String>,
    sink: StatusSink,
}

impl Dispatcher {
    pub fn new(sink: StatusSink) -> Self {
        Self {
            handlers: HashMap::new(),
            disabled: HashSet::new(),
            sink,
        }
    }

    pub fn register(&mut self, handler: Box<dyn CommandHandler>) {
        let command_type = handler.command_type().to_string();
        debug!(command_type = %command_type, "handler registered");
        self.disabled.remove(&command_type);
        self.handlers.insert(command_type, handler);
    }

    /// Mark a known command type whose channel this agent does not drive.
    pub fn disable(&mut self, command_type: &str) {
        debug!(command_type, "command type disabled");
        self.handlers.remove(command_type);
        self.disabled.insert(command_type.to_string());
    }

    pub fn supports(&self, command_type: &str) -> bool {
        self.handlers.contains_key(command_type)
    }

    pub fn handle(&self, command: &Command) {
        let result = match self.handlers.get(&command.command_type) {
            Some(handler) => handler.handle(command, &self.sink),
            None if self.disabled.contains(&command.command_type) => Err(
                CommandError::UnsupportedChannel(command.command_type.clone()),
            ),
            None => Err(CommandError::UnsupportedCommandType(
                command.command_type.clone(),
            )),
        };

        if let Err(e) = result {
            info!(
                task_id = %command.task_id,
                command_type = %command.command_type,
                reason = %e,
                "command rejected"
            );
            self.sink
                .emit(Status::rejected(&command.task_id, e.to_string()));
        }
    }
}
