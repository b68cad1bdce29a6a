use super::interpolation::lerp;
use super::scheduler::Channel;
use crate::agent::config::{GestureDefinition, GesturesConfig};
use crate::rig::GestureActuator;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GesturePose {
    /// Index into the gesture registry; `None` before any gesture played.
    pub gesture: Option<usize>,
    pub frame: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureRequest {
    pub gesture: usize,
}

pub struct GestureChannel {
    actuator: Box<dyn GestureActuator>,
    registry: Vec<GestureDefinition>,
    default_time_ms: f64,
    pose: GesturePose,
    last_index: Option<usize>,
}

impl GestureChannel {
    pub fn new(actuator: Box<dyn GestureActuator>, config: &GesturesConfig) -> Self {
        Self {
            actuator,
            registry: config.registry.clone(),
            default_time_ms: config.default_time_ms,
            pose: GesturePose::default(),
            last_index: None,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.registry
            .iter()
            .position(|g| g.name.eq_ignore_ascii_case(name))
    }

    pub fn default_time_ms(&self) -> f64 {
        self.default_time_ms
    }

    fn last_frame(&self, gesture: usize) -> f64 {
        self.registry
            .get(gesture)
            .map_or(0.0, |g| g.frames.saturating_sub(1) as f64)
    }
}

impl Channel for GestureChannel {
    type State = GesturePose;
    type Request = GestureRequest;

    fn name(&self) -> &'static str {
        "anim"
    }

    fn current(&self) -> GesturePose {
        self.pose
    }

    fn target(&self, _current: &GesturePose, request: &GestureRequest) -> GesturePose {
        GesturePose {
            gesture: Some(request.gesture),
            frame: self.last_frame(request.gesture),
        }
    }

    /// Gestures always play from their first frame.
    fn origin(&self, _current: &GesturePose, target: &GesturePose) -> GesturePose {
        GesturePose {
            gesture: target.gesture,
            frame: 0.0,
        }
    }

    fn differs(&self, from: &GesturePose, to: &GesturePose) -> bool {
        from.gesture != to.gesture || (from.frame - to.frame).abs() > 1e-9
    }

    fn interpolate(&self, from: &GesturePose, to: &GesturePose, fraction: f64) -> GesturePose {
        GesturePose {
            gesture: to.gesture,
            frame: lerp(from.frame, to.frame, fraction),
        }
    }

    fn apply(&mut self, state: &GesturePose) {
        self.pose = *state;
        let Some(first_pose) = state
            .gesture
            .and_then(|g| self.registry.get(g))
            .map(|g| g.first_pose)
        else {
            return;
        };
        let index = first_pose.saturating_add(state.frame.max(0.0).round() as usize);
        if self.last_index != Some(index) {
            self.last_index = Some(index);
            self.actuator.set_gesture_pose(index);
        }
    }
}
