//! Parameter smoothing for real-time audio.
//!
//! Provides a linear ramp between current and target values, avoiding
//! zipper noise when parameters change. The ramp reaches the target in
//! exactly `ramp_seconds * sample_rate` samples, monotonically and
//! without overshoot, which makes it usable for bounded-window bypass
//! crossfades as well as ordinary control smoothing.

/// Smoothed parameter with a linear ramp.
pub struct SmoothedParam {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
    /// Ramp length in samples, re-derived on `reset`.
    ramp_samples: u32,
}

impl SmoothedParam {
    /// Create a smoother at `initial`, ramping over `ramp_seconds` at `sample_rate`.
    pub fn new(initial: f32, sample_rate: f32, ramp_seconds: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
            ramp_samples: ramp_len(sample_rate, ramp_seconds),
        }
    }

    /// Set a new target value. A changed target restarts the ramp from
    /// the current value; republishing the same target (as a per-block
    /// caller does) leaves an in-flight ramp untouched.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;
        if self.ramp_samples == 0 || target == self.current {
            self.current = target;
            self.remaining = 0;
            self.step = 0.0;
        } else {
            self.remaining = self.ramp_samples;
            self.step = (target - self.current) / self.ramp_samples as f32;
        }
    }

    /// Get the next smoothed value. Call exactly once per sample per consumer.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                // Land exactly on the target, no floating point drift.
                self.current = self.target;
            } else {
                self.current += self.step;
            }
        }
        self.current
    }

    /// Current value without advancing the ramp.
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Re-derive the ramp length and snap current to target (no ramp).
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.ramp_samples = ramp_len(sample_rate, ramp_seconds);
        self.current = self.target;
        self.remaining = 0;
        self.step = 0.0;
    }

    /// Snap to `value` immediately, clearing any active ramp.
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.remaining = 0;
        self.step = 0.0;
    }

    /// Check if a ramp is still in flight.
    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }
}

fn ramp_len(sample_rate: f32, ramp_seconds: f32) -> u32 {
    (ramp_seconds * sample_rate).ceil().max(0.0) as u32
}
