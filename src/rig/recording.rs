use std::sync::{Arc, Mutex, MutexGuard};

use super::{FacialActuator, GazeActuator, GestureActuator};

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Gaze { yaw: f64, pitch: f64 },
    ActionUnit { id: String, weight: f64 },
    Pose(usize),
}

/// Actuator that records every output it receives. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    outputs: Arc<Mutex<Vec<Output>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Output>> {
        match self.outputs.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.lock().clone()
    }

    pub fn last_gaze(&self) -> Option<(f64, f64)> {
        self.lock().iter().rev().find_map(|o| match o {
            Output::Gaze { yaw, pitch } => Some((*yaw, *pitch)),
            _ => None,
        })
    }

    pub fn last_weight(&self, id: &str) -> Option<f64> {
        self.lock().iter().rev().find_map(|o| match o {
            Output::ActionUnit { id: au, weight } if au == id => Some(*weight),
            _ => None,
        })
    }

    pub fn poses(&self) -> Vec<usize> {
        self.lock()
            .iter()
            .filter_map(|o| match o {
                Output::Pose(index) => Some(*index),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl GazeActuator for Recorder {
    fn set_gaze_orientation(&mut self, yaw: f64, pitch: f64) {
        self.lock().push(Output::Gaze { yaw, pitch });
    }
}

impl FacialActuator for Recorder {
    fn set_action_unit_weight(&mut self, id: &str, weight: f64) {
        self.lock().push(Output::ActionUnit {
            id: id.to_string(),
            weight,
        });
    }
}

impl GestureActuator for Recorder {
    fn set_gesture_pose(&mut self, index: usize) {
        self.lock().push(Output::Pose(index));
    }
}
