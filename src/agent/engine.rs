use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::agent::config::Config;
use crate::channels::{
    lock, shared, BookmarkExtractor, ChannelScheduler, FacialChannel, GazeChannel,
    GestureChannel, Shared, SpeechScheduler, Tickable,
};
use crate::commands::{
    AnimHandler, Dispatcher, FacsHandler, GazeHandler, SpeechHandler, StopSpeechHandler, ANIM,
    FACS, GAZE, SPEECH, STOP_SPEECH,
};
use crate::rig::{Clock, Rig};
use crate::transport::{Command, StatusSink};

/// Channel schedulers wired to their command handlers, plus the tick driver
/// that advances them.
pub struct Engine {
    dispatcher: Arc<Dispatcher>,
    channels: Vec<Shared<dyn Tickable>>,
    clock: Arc<dyn Clock>,
    sink: StatusSink,
}

impl Engine {
    pub fn build(config: &Config, rig: Rig, clock: Arc<dyn Clock>, sink: StatusSink) -> Result<Self> {
        let mut dispatcher = Dispatcher::new(sink.clone());
        let mut channels: Vec<Shared<dyn Tickable>> = Vec::new();
        let Rig {
            gaze,
            face,
            gesture,
            speech,
        } = rig;

        if config.gaze.enabled {
            let scheduler = shared(ChannelScheduler::new(GazeChannel::new(gaze, &config.gaze)));
            dispatcher.register(Box::new(GazeHandler::new(scheduler.clone(), clock.clone())));
            channels.push(scheduler);
        } else {
            dispatcher.disable(GAZE);
        }

        if config.face.enabled {
            let scheduler = shared(ChannelScheduler::new(FacialChannel::new(face, &config.face)));
            dispatcher.register(Box::new(FacsHandler::new(scheduler.clone(), clock.clone())));
            channels.push(scheduler);
        } else {
            dispatcher.disable(FACS);
        }

        if config.gestures.enabled {
            let scheduler = shared(ChannelScheduler::new(GestureChannel::new(
                gesture,
                &config.gestures,
            )));
            dispatcher.register(Box::new(AnimHandler::new(scheduler.clone(), clock.clone())));
            channels.push(scheduler);
        } else {
            dispatcher.disable(ANIM);
        }

        if config.speech.enabled {
            let extractor = BookmarkExtractor::new(&config.speech.bookmark_pattern)
                .context("compiling speech.bookmark_pattern")?;
            let scheduler = shared(SpeechScheduler::new(speech, extractor));
            dispatcher.register(Box::new(SpeechHandler::new(scheduler.clone())));
            dispatcher.register(Box::new(StopSpeechHandler::new(scheduler.clone())));
            channels.push(scheduler);
        } else {
            dispatcher.disable(SPEECH);
            dispatcher.disable(STOP_SPEECH);
        }

        info!(channels = channels.len(), "engine ready");
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            channels,
            clock,
            sink,
        })
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn handle(&self, command: &Command) {
        self.dispatcher.handle(command);
    }

    /// Advance every channel to the current clock time. Returns the number
    /// of statuses emitted.
    pub fn tick(&self) -> usize {
        let now = self.clock.now();
        let mut emitted = 0;
        for channel in &self.channels {
            let mut channel = lock(channel);
            let statuses = channel.tick(now);
            emitted += statuses.len();
            self.sink.emit_all(statuses);
        }
        emitted
    }

    pub fn is_idle(&self) -> bool {
        self.channels.iter().all(|c| !lock(c).is_busy())
    }

    /// Fixed-rate tick driver. Runs until the task is aborted.
    pub async fn run_ticks(&self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(period_ms = period.as_millis() as u64, "tick driver started");
        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}
