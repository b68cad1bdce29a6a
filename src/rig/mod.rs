//! Interfaces to the collaborators that consume channel output: the
//! skeleton rig, the blend-shape mesh, the speech renderer and the clock.

pub mod clock;
pub mod paced_speech;
pub mod recording;
pub mod tracing_rig;

use std::fmt;

use anyhow::Result;

pub use clock::{Clock, ManualClock, SystemClock};
pub use paced_speech::PacedSpeechRenderer;
pub use recording::{Output, Recorder};
pub use tracing_rig::TracingActuator;

/// Head orientation output, angles in degrees.
pub trait GazeActuator: Send {
    fn set_gaze_orientation(&mut self, yaw: f64, pitch: f64);
}

/// Blend-shape output for facial action units.
pub trait FacialActuator: Send {
    fn set_action_unit_weight(&mut self, id: &str, weight: f64);
}

/// Body pose output; `index` addresses a pose in the rig's pose table.
pub trait GestureActuator: Send {
    fn set_gesture_pose(&mut self, index: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeechHandle(pub u64);

impl fmt::Display for SpeechHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance-{}", self.0)
    }
}

/// Callbacks reported by a speech renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    WordBoundary { handle: SpeechHandle, index: usize },
    Complete { handle: SpeechHandle },
}

pub trait SpeechRenderer: Send {
    fn speak(&mut self, text: &str) -> Result<SpeechHandle>;

    fn silence(&mut self, handle: SpeechHandle);

    /// Events that happened since the last poll, in order.
    fn poll(&mut self, now: f64) -> Vec<SpeechEvent>;
}

/// The set of output collaborators handed to the engine.
pub struct Rig {
    pub gaze: Box<dyn GazeActuator>,
    pub face: Box<dyn FacialActuator>,
    pub gesture: Box<dyn GestureActuator>,
    pub speech: Box<dyn SpeechRenderer>,
}

impl Rig {
    /// Log-only rig used when no real renderer is attached.
    pub fn tracing(words_per_minute: f64) -> Self {
        Self {
            gaze: Box::new(TracingActuator::new("gaze")),
            face: Box::new(TracingActuator::new("face")),
            gesture: Box::new(TracingActuator::new("gesture")),
            speech: Box::new(PacedSpeechRenderer::new(words_per_minute)),
        }
    }

    /// Rig whose outputs land in `recorder`, driven by a paced speech renderer.
    pub fn recording(recorder: &Recorder, words_per_minute: f64) -> Self {
        Self {
            gaze: Box::new(recorder.clone()),
            face: Box::new(recorder.clone()),
            gesture: Box::new(recorder.clone()),
            speech: Box::new(PacedSpeechRenderer::new(words_per_minute)),
        }
    }
}
