use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::dispatcher::CommandHandler;
use super::params::{number_or_zero, optional_number, required};
use super::{CommandError, ANIM, FACS, GAZE, SPEECH, STOP_SPEECH};
use crate::channels::{
    lock, FacialScheduler, FacsRequest, GazeRequest, GestureRequest, GestureScheduler,
    GazeScheduler, Shared, SpeechScheduler,
};
use crate::rig::Clock;
use crate::transport::{Command, Status, StatusSink};

const AU_PREFIX: &str = "au";

pub struct GazeHandler {
    scheduler: Shared<GazeScheduler>,
    clock: Arc<dyn Clock>,
}

impl GazeHandler {
    pub fn new(scheduler: Shared<GazeScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self { scheduler, clock }
    }
}

impl CommandHandler for GazeHandler {
    fn command_type(&self) -> &'static str {
        GAZE
    }

    fn handle(&self, command: &Command, sink: &StatusSink) -> Result<(), CommandError> {
        let request = GazeRequest {
            x: number_or_zero(command, "x"),
            y: number_or_zero(command, "y"),
            z: number_or_zero(command, "z"),
        };
        let time_ms = number_or_zero(command, "time");

        let mut scheduler = lock(&self.scheduler);
        let statuses = scheduler.accept(&command.task_id, &request, time_ms, self.clock.now());
        sink.emit_all(statuses);
        Ok(())
    }
}

pub struct FacsHandler {
    scheduler: Shared<FacialScheduler>,
    clock: Arc<dyn Clock>,
}

impl FacsHandler {
    pub fn new(scheduler: Shared<FacialScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self { scheduler, clock }
    }
}

impl CommandHandler for FacsHandler {
    fn command_type(&self) -> &'static str {
        FACS
    }

    fn handle(&self, command: &Command, sink: &StatusSink) -> Result<(), CommandError> {
        let time_ms = number_or_zero(command, "time");
        let mut scheduler = lock(&self.scheduler);

        let mut values = BTreeMap::new();
        for name in command.params.keys() {
            let id = name.to_ascii_lowercase();
            if !id.starts_with(AU_PREFIX) {
                continue;
            }
            if !scheduler.channel().knows(&id) {
                warn!(task_id = %command.task_id, action_unit = %name, "no blendshape known for action unit");
                continue;
            }
            values.insert(id, optional_number(command, name).unwrap_or(0.0));
        }
        debug!(task_id = %command.task_id, units = values.len(), "facs request");

        let statuses = scheduler.accept(
            &command.task_id,
            &FacsRequest { values },
            time_ms,
            self.clock.now(),
        );
        sink.emit_all(statuses);
        Ok(())
    }
}

pub struct AnimHandler {
    scheduler: Shared<GestureScheduler>,
    clock: Arc<dyn Clock>,
}

impl AnimHandler {
    pub fn new(scheduler: Shared<GestureScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self { scheduler, clock }
    }
}

impl CommandHandler for AnimHandler {
    fn command_type(&self) -> &'static str {
        ANIM
    }

    fn handle(&self, command: &Command, sink: &StatusSink) -> Result<(), CommandError> {
        let name = required(command, "name")?;
        let mut scheduler = lock(&self.scheduler);
        let gesture = scheduler
            .channel()
            .lookup(name)
            .ok_or_else(|| CommandError::UnknownAnimation(name.to_string()))?;
        let time_ms = optional_number(command, "time")
            .unwrap_or_else(|| scheduler.channel().default_time_ms());

        let statuses = scheduler.accept(
            &command.task_id,
            &GestureRequest { gesture },
            time_ms,
            self.clock.now(),
        );
        sink.emit_all(statuses);
        Ok(())
    }
}

pub struct SpeechHandler {
    scheduler: Shared<SpeechScheduler>,
}

impl SpeechHandler {
    pub fn new(scheduler: Shared<SpeechScheduler>) -> Self {
        Self { scheduler }
    }
}

impl CommandHandler for SpeechHandler {
    fn command_type(&self) -> &'static str {
        SPEECH
    }

    fn handle(&self, command: &Command, sink: &StatusSink) -> Result<(), CommandError> {
        let text = required(command, "text")?;
        let mut scheduler = lock(&self.scheduler);
        sink.emit_all(scheduler.enqueue(&command.task_id, text));
        Ok(())
    }
}

/// Silences current speech. The stop task itself always finishes.
pub struct StopSpeechHandler {
    scheduler: Shared<SpeechScheduler>,
}

impl StopSpeechHandler {
    pub fn new(scheduler: Shared<SpeechScheduler>) -> Self {
        Self { scheduler }
    }
}

impl CommandHandler for StopSpeechHandler {
    fn command_type(&self) -> &'static str {
        STOP_SPEECH
    }

    fn handle(&self, command: &Command, sink: &StatusSink) -> Result<(), CommandError> {
        let mut scheduler = lock(&self.scheduler);
        sink.emit_all(scheduler.stop());
        sink.emit(Status::finished(&command.task_id));
        Ok(())
    }
}
