use tracing::trace;

use super::{FacialActuator, GazeActuator, GestureActuator};

/// Actuator that only logs what it would drive.
#[derive(Debug, Clone)]
pub struct TracingActuator {
    channel: &'static str,
}

impl TracingActuator {
    pub fn new(channel: &'static str) -> Self {
        Self { channel }
    }
}

impl GazeActuator for TracingActuator {
    fn set_gaze_orientation(&mut self, yaw: f64, pitch: f64) {
        trace!(channel = self.channel, yaw, pitch, "gaze orientation");
    }
}

impl FacialActuator for TracingActuator {
    fn set_action_unit_weight(&mut self, id: &str, weight: f64) {
        trace!(channel = self.channel, action_unit = id, weight, "action unit weight");
    }
}

impl GestureActuator for TracingActuator {
    fn set_gesture_pose(&mut self, index: usize) {
        trace!(channel = self.channel, pose = index, "gesture pose");
    }
}
