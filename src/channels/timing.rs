/// Time window of one animation task, in seconds on the engine clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationWindow {
    pub start_time: f64,
    pub duration: f64,
    pub end_time: f64,
}

/// Where a running animation stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationPhase {
    /// Still inside the window; carries the interpolation fraction in `[0, 1]`.
    Interpolating(f64),
    /// Past the end (or never had a positive duration).
    Expired,
}

impl AnimationWindow {
    /// Window starting at `now` for `time_ms` milliseconds. Non-finite
    /// requests are treated as zero.
    pub fn starting_at(now: f64, time_ms: f64) -> Self {
        let duration = if time_ms.is_finite() { time_ms / 1000.0 } else { 0.0 };
        Self {
            start_time: now,
            duration,
            end_time: now + duration,
        }
    }

    pub fn phase(&self, now: f64) -> AnimationPhase {
        if self.duration <= 0.0 || now > self.end_time {
            AnimationPhase::Expired
        } else {
            let fraction = (now - self.start_time) / self.duration;
            AnimationPhase::Interpolating(fraction.clamp(0.0, 1.0))
        }
    }
}
