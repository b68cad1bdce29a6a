/// Linear blend of two scalars.
pub fn lerp(from: f64, to: f64, fraction: f64) -> f64 {
    from + (to - from) * fraction
}

/// Unit quaternion for orientation state (w, x, y, z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Yaw about the vertical (Y) axis applied after pitch about the lateral
    /// (X) axis. Angles in radians; positive pitch looks down.
    pub fn from_yaw_pitch(yaw: f64, pitch: f64) -> Self {
        let (sy, cy) = (yaw * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let q_yaw = Quat::new(cy, 0.0, sy, 0.0);
        let q_pitch = Quat::new(cp, sp, 0.0, 0.0);
        q_yaw.mul(&q_pitch)
    }

    /// Inverse of [`Quat::from_yaw_pitch`] for orientations without roll.
    pub fn to_yaw_pitch(&self) -> (f64, f64) {
        let [fx, fy, fz] = self.rotate([0.0, 0.0, 1.0]);
        let yaw = fx.atan2(fz);
        let pitch = (-fy).clamp(-1.0, 1.0).asin();
        (yaw, pitch)
    }

    pub fn mul(&self, rhs: &Quat) -> Quat {
        Quat {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }

    pub fn rotate(&self, v: [f64; 3]) -> [f64; 3] {
        let u = [self.x, self.y, self.z];
        let t = scale(cross(u, v), 2.0);
        let c = cross(u, t);
        [
            v[0] + self.w * t[0] + c[0],
            v[1] + self.w * t[1] + c[1],
            v[2] + self.w * t[2] + c[2],
        ]
    }

    pub fn dot(&self, rhs: &Quat) -> f64 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn neg(&self) -> Quat {
        Quat::new(-self.w, -self.x, -self.y, -self.z)
    }

    pub fn normalize(&self) -> Quat {
        let len = self.dot(self).sqrt();
        if len == 0.0 {
            return Quat::IDENTITY;
        }
        Quat::new(self.w / len, self.x / len, self.y / len, self.z / len)
    }

    /// Rotation angle (radians) between two orientations.
    pub fn angle_to(&self, rhs: &Quat) -> f64 {
        2.0 * self.dot(rhs).abs().min(1.0).acos()
    }

    /// Shortest-path spherical interpolation.
    pub fn slerp(&self, to: &Quat, fraction: f64) -> Quat {
        let mut cos = self.dot(to);
        let mut end = *to;
        if cos < 0.0 {
            end = end.neg();
            cos = -cos;
        }

        if cos > 0.9995 {
            return Quat::new(
                lerp(self.w, end.w, fraction),
                lerp(self.x, end.x, fraction),
                lerp(self.y, end.y, fraction),
                lerp(self.z, end.z, fraction),
            )
            .normalize();
        }

        let theta = cos.acos();
        let sin = theta.sin();
        let a = ((1.0 - fraction) * theta).sin() / sin;
        let b = (fraction * theta).sin() / sin;
        Quat::new(
            a * self.w + b * end.w,
            a * self.x + b * end.x,
            a * self.y + b * end.y,
            a * self.z + b * end.z,
        )
    }
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn scale(v: [f64; 3], s: f64) -> [f64; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn lerp_endpoints_and_midpoint() {
        assert_eq!(lerp(10.0, 20.0, 0.0), 10.0);
        assert_eq!(lerp(10.0, 20.0, 1.0), 20.0);
        assert_eq!(lerp(10.0, 20.0, 0.5), 15.0);
    }

    #[test]
    fn yaw_pitch_round_trip() {
        let q = Quat::from_yaw_pitch(0.7, -0.3);
        let (yaw, pitch) = q.to_yaw_pitch();
        assert!((yaw - 0.7).abs() < EPS);
        assert!((pitch + 0.3).abs() < EPS);
    }

    #[test]
    fn positive_pitch_looks_down() {
        let q = Quat::from_yaw_pitch(0.0, 0.5);
        let forward = q.rotate([0.0, 0.0, 1.0]);
        assert!(forward[1] < 0.0);
    }

    #[test]
    fn slerp_midpoint_halves_the_angle() {
        let from = Quat::from_yaw_pitch(0.0, 0.0);
        let to = Quat::from_yaw_pitch(60f64.to_radians(), 0.0);
        let (yaw, pitch) = from.slerp(&to, 0.5).to_yaw_pitch();
        assert!((yaw.to_degrees() - 30.0).abs() < 1e-6);
        assert!(pitch.abs() < 1e-9);
    }

    #[test]
    fn slerp_takes_the_short_way_round() {
        let from = Quat::from_yaw_pitch(0.2, 0.0);
        let to = Quat::from_yaw_pitch(0.4, 0.0).neg();
        let mid = from.slerp(&to, 0.5);
        let (yaw, _) = mid.to_yaw_pitch();
        assert!((yaw - 0.3).abs() < 1e-6);
    }

    #[test]
    fn angle_to_ignores_sign() {
        let q = Quat::from_yaw_pitch(0.5, 0.1);
        assert!(q.angle_to(&q.neg()) < 1e-6);
        let r = Quat::from_yaw_pitch(0.0, 0.0);
        assert!((r.angle_to(&Quat::from_yaw_pitch(0.25, 0.0)) - 0.25).abs() < 1e-9);
    }
}
