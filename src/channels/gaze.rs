use tracing::trace;

use super::interpolation::Quat;
use super::scheduler::Channel;
use crate::agent::config::GazeConfig;
use crate::rig::GazeActuator;

/// Look-at point in the agent's frame: x forward, y left, z up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeRequest {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GazeRequest {
    /// Head yaw and pitch in degrees, before clamping.
    pub fn angles(&self) -> (f64, f64) {
        let yaw = (-self.y).atan2(self.x).to_degrees();
        let pitch = -self.z.atan2(self.x.hypot(self.y)).to_degrees();
        (yaw, pitch)
    }
}

pub struct GazeChannel {
    actuator: Box<dyn GazeActuator>,
    yaw_limits: [f64; 2],
    pitch_limits: [f64; 2],
    tolerance: f64,
    pose: Quat,
}

impl GazeChannel {
    pub fn new(actuator: Box<dyn GazeActuator>, config: &GazeConfig) -> Self {
        Self {
            actuator,
            yaw_limits: config.yaw_limits,
            pitch_limits: config.pitch_limits,
            tolerance: config.tolerance_deg.max(0.0).to_radians(),
            pose: Quat::IDENTITY,
        }
    }

    /// Current head yaw and pitch in degrees.
    pub fn orientation(&self) -> (f64, f64) {
        let (yaw, pitch) = self.pose.to_yaw_pitch();
        (yaw.to_degrees(), pitch.to_degrees())
    }
}

impl Channel for GazeChannel {
    type State = Quat;
    type Request = GazeRequest;

    fn name(&self) -> &'static str {
        "gaze"
    }

    fn current(&self) -> Quat {
        self.pose
    }

    fn target(&self, _current: &Quat, request: &GazeRequest) -> Quat {
        let (yaw, pitch) = request.angles();
        let yaw = yaw.clamp(self.yaw_limits[0], self.yaw_limits[1]);
        let pitch = pitch.clamp(self.pitch_limits[0], self.pitch_limits[1]);
        Quat::from_yaw_pitch(yaw.to_radians(), pitch.to_radians())
    }

    fn differs(&self, from: &Quat, to: &Quat) -> bool {
        from.angle_to(to) > self.tolerance
    }

    fn interpolate(&self, from: &Quat, to: &Quat, fraction: f64) -> Quat {
        from.slerp(to, fraction)
    }

    fn apply(&mut self, state: &Quat) {
        self.pose = *state;
        let (yaw, pitch) = self.orientation();
        trace!(yaw, pitch, "gaze pose");
        self.actuator.set_gaze_orientation(yaw, pitch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelScheduler;
    use crate::rig::Recorder;
    use crate::transport::{FINISHED, STARTED};

    fn gaze(recorder: &Recorder) -> ChannelScheduler<GazeChannel> {
        ChannelScheduler::new(GazeChannel::new(
            Box::new(recorder.clone()),
            &GazeConfig::default(),
        ))
    }

    #[test]
    fn request_angles() {
        let left = GazeRequest { x: 1.0, y: 1.0, z: 0.0 };
        let (yaw, pitch) = left.angles();
        assert!((yaw + 45.0).abs() < 1e-9);
        assert!(pitch.abs() < 1e-9);

        let up = GazeRequest { x: 1.0, y: 0.0, z: 1.0 };
        assert!((up.angles().1 + 45.0).abs() < 1e-9);
    }

    #[test]
    fn looking_straight_up_is_clamped() {
        let recorder = Recorder::new();
        let mut s = gaze(&recorder);
        let out = s.accept("T1", &GazeRequest { x: 0.0, y: 0.0, z: 1.0 }, 1000.0, 0.0);
        assert_eq!(out[0].status, STARTED);

        let out = s.tick(1.5);
        assert_eq!(out[0].status, FINISHED);
        let (yaw, pitch) = recorder.last_gaze().unwrap();
        assert!(yaw.abs() < 1e-6);
        assert!((pitch + 60.0).abs() < 1e-6);
    }

    #[test]
    fn halfway_through_turn() {
        let recorder = Recorder::new();
        let mut s = gaze(&recorder);
        // yaw -60 degrees
        let request = GazeRequest {
            x: 1.0,
            y: 3f64.sqrt(),
            z: 0.0,
        };
        s.accept("T1", &request, 1000.0, 0.0);
        s.tick(0.5);
        let (yaw, _) = recorder.last_gaze().unwrap();
        assert!((yaw + 30.0).abs() < 1e-6);
    }

    #[test]
    fn straight_ahead_from_rest_is_already_reached() {
        let recorder = Recorder::new();
        let mut s = gaze(&recorder);
        let out = s.accept("T1", &GazeRequest { x: 2.0, y: 0.0, z: 0.0 }, 500.0, 0.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, FINISHED);
        assert!(recorder.outputs().is_empty());
    }
}
