//! Stereo feedback delay with standard and ping-pong routing.
//!
//! Two independent delay lines, each read with a slight sinusoidal
//! position modulation for chorus-like motion. The feedback tap runs
//! through a low-cut, a high-cut, a low-shelf damping filter, and a
//! soft saturator before re-entering the line, so repeats decay darker
//! and runaway energy is bounded even at the feedback cap.
//!
//! Routing is a per-block boolean:
//! - standard: each line gets its own input plus its own feedback tap;
//! - ping-pong: the left line gets mono-summed input plus the right
//!   tap, the right line gets only the left tap, so echoes alternate.

use crate::biquad::{Biquad, BiquadCoeffs};
use shared_dsp::DelayLine;
use std::f32::consts::TAU;

/// Read-position modulation: depth in milliseconds and rate in Hz.
const MOD_DEPTH_MS: f32 = 0.3;
const MOD_RATE_HZ: f32 = 0.6;

/// Headroom past the 2 s maximum for modulation and smoothing excursion.
const MAX_DELAY_SECONDS: f32 = 2.1;

pub struct DelayEngine {
    lines: [DelayLine; 2],
    lo_cut: [Biquad; 2],
    hi_cut: [Biquad; 2],
    damping: [Biquad; 2],
    mod_phase: f32,
    sample_rate: f32,
}

impl DelayEngine {
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            lines: [
                DelayLine::with_duration(MAX_DELAY_SECONDS, sample_rate),
                DelayLine::with_duration(MAX_DELAY_SECONDS, sample_rate),
            ],
            lo_cut: Default::default(),
            hi_cut: Default::default(),
            damping: Default::default(),
            mod_phase: 0.0,
            sample_rate,
        };
        engine.set_feedback_coeffs(sample_rate);
        engine
    }

    /// Reallocate lines and recompute the fixed feedback-path filters.
    /// Not real-time safe; called from `prepare` only.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.lines = [
            DelayLine::with_duration(MAX_DELAY_SECONDS, sample_rate),
            DelayLine::with_duration(MAX_DELAY_SECONDS, sample_rate),
        ];
        self.set_feedback_coeffs(sample_rate);
        self.reset();
    }

    /// Clear line contents and filter state without allocating.
    pub fn reset(&mut self) {
        for ch in 0..2 {
            self.lines[ch].clear();
            self.lo_cut[ch].reset();
            self.hi_cut[ch].reset();
            self.damping[ch].reset();
        }
        self.mod_phase = 0.0;
    }

    // Warm analog-style rolloff in the loop: fixed, only recomputed on
    // prepare/resample.
    fn set_feedback_coeffs(&mut self, sample_rate: f32) {
        let hi = BiquadCoeffs::low_pass(sample_rate, 4500.0, 0.6);
        let lo = BiquadCoeffs::high_pass(sample_rate, 80.0, 0.7);
        let damp = BiquadCoeffs::low_shelf(sample_rate, 1000.0, 0.7, 0.85);
        for ch in 0..2 {
            self.hi_cut[ch].set_coeffs(hi);
            self.lo_cut[ch].set_coeffs(lo);
            self.damping[ch].set_coeffs(damp);
        }
    }

    /// Process one stereo pair. `delay_ms` and `feedback` are smoothed
    /// per-sample values; `ping_pong` is fixed for the block. Returns
    /// the wet taps only; the chain applies the send level.
    #[inline]
    pub fn process(&mut self, l_in: f32, r_in: f32, delay_ms: f32, feedback: f32, ping_pong: bool) -> (f32, f32) {
        let sr = self.sample_rate;
        let delay_samples = delay_ms / 1000.0 * sr;

        self.mod_phase += MOD_RATE_HZ * TAU / sr;
        if self.mod_phase > TAU {
            self.mod_phase -= TAU;
        }
        let excursion = self.mod_phase.sin() * MOD_DEPTH_MS * sr / 1000.0;

        let tap_l = self.condition(0, self.lines[0].read_frac(delay_samples + excursion));
        let tap_r = self.condition(1, self.lines[1].read_frac(delay_samples - excursion * 0.5));

        if ping_pong {
            // Left line: mono input + right tap; right line: left tap only.
            // The input line's tap comes out on the right, so the bounce
            // runs right, left, right, ...
            let mono = (l_in + r_in) * 0.5;
            self.lines[0].push(mono + tap_r * feedback);
            self.lines[1].push(tap_l * feedback);
            (tap_r, tap_l)
        } else {
            self.lines[0].push(l_in + tap_l * feedback);
            self.lines[1].push(r_in + tap_r * feedback);
            (tap_l, tap_r)
        }
    }

    /// Keep the lines moving while the stage is bypassed so no stale
    /// audio bursts out on re-activation.
    #[inline]
    pub fn push_silence(&mut self) {
        self.lines[0].push(0.0);
        self.lines[1].push(0.0);
    }

    #[inline]
    fn condition(&mut self, ch: usize, tap: f32) -> f32 {
        let mut s = self.hi_cut[ch].process(tap);
        s = self.lo_cut[ch].process(s);
        s = self.damping[ch].process(s);
        (s * 1.1).tanh() / 1.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    /// Feed an impulse and collect taps for `n` samples.
    fn impulse_response(
        engine: &mut DelayEngine,
        n: usize,
        feedback: f32,
        ping_pong: bool,
    ) -> (Vec<f32>, Vec<f32>) {
        let mut l_out = Vec::with_capacity(n);
        let mut r_out = Vec::with_capacity(n);
        for i in 0..n {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let (l, r) = engine.process(x, 0.0, 100.0, feedback, ping_pong);
            l_out.push(l);
            r_out.push(r);
        }
        (l_out, r_out)
    }

    fn energy(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum()
    }

    #[test]
    fn impulse_decays_at_max_feedback() {
        let mut engine = DelayEngine::new(SR);
        // 0.92 is the hard cap applied upstream for a 100% setting.
        let n = (SR * 4.0) as usize;
        let (l, r) = impulse_response(&mut engine, n, 0.92, false);
        assert!(l.iter().chain(r.iter()).all(|x| x.is_finite()));
        // Energy in the last second must be below the first second.
        let sec = SR as usize;
        let first = energy(&l[..sec]) + energy(&r[..sec]);
        let last = energy(&l[n - sec..]) + energy(&r[n - sec..]);
        assert!(last < first, "no decay: first={first} last={last}");
    }

    #[test]
    fn ping_pong_alternates_channels() {
        let mut engine = DelayEngine::new(SR);
        let period = (0.1 * SR) as usize; // 100 ms
        let n = period * 4;
        let (l, r) = impulse_response(&mut engine, n, 0.9, true);

        // The input line's tap is routed to the right output, so the
        // first echo lands right and the second bounces back left.
        let window = |v: &[f32], k: usize| energy(&v[period * k - 200..period * k + 200]);
        let l1 = window(&l, 1);
        let r1 = window(&r, 1);
        let l2 = window(&l, 2);
        let r2 = window(&r, 2);
        assert!(r1 > l1 * 10.0, "first echo should be right: l={l1} r={r1}");
        assert!(l2 > r2 * 10.0, "second echo should be left: l={l2} r={r2}");
    }

    #[test]
    fn standard_routing_keeps_channels_separate() {
        let mut engine = DelayEngine::new(SR);
        let n = (SR * 1.0) as usize;
        let (_, r) = impulse_response(&mut engine, n, 0.8, false);
        // Left-only input never reaches the right line.
        assert!(energy(&r) < 1e-9, "right channel leaked: {}", energy(&r));
    }

    #[test]
    fn bypass_feed_flushes_old_audio() {
        let mut engine = DelayEngine::new(SR);
        // Fill the line with an impulse echoing around.
        for i in 0..4410 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            engine.process(x, x, 50.0, 0.9, false);
        }
        // Push silence for longer than the maximum delay.
        for _ in 0..(MAX_DELAY_SECONDS * SR) as usize + 10 {
            engine.push_silence();
        }
        // Re-activate: the first reads must be silent.
        let (l, r) = engine.process(0.0, 0.0, 2000.0, 0.5, false);
        assert!(l.abs() < 1e-6 && r.abs() < 1e-6, "stale audio: {l} {r}");
    }

    #[test]
    fn feedback_never_diverges() {
        let mut engine = DelayEngine::new(SR);
        // Sustained loud input at the cap.
        let mut peak = 0.0f32;
        for i in 0..(SR * 3.0) as usize {
            let x = (i as f32 * 0.1).sin();
            let (l, r) = engine.process(x, x, 30.0, 0.92, false);
            peak = peak.max(l.abs()).max(r.abs());
            assert!(l.is_finite() && r.is_finite());
        }
        assert!(peak < 10.0, "unbounded feedback: peak={peak}");
    }
}
