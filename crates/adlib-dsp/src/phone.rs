//! Telephone-style band-limited filter.
//!
//! Five cascaded stages per channel: high-pass, peaking mid boost, low
//! shelf warmth, low-pass, and a gentle post low-pass that rounds off
//! the edge of the main cutoff. Coefficients come from the mode table
//! and the intensity once per block. A mode-dependent nonlinearity runs
//! after the cascade: rotary gets a rational soft clip, mobile a light
//! tanh compression, touch-tone stays clean.

use crate::biquad::{Biquad, BiquadCoeffs};
use crate::params::PhoneMode;

pub struct PhoneFilter {
    highpass: [Biquad; 2],
    mid_boost: [Biquad; 2],
    warmth: [Biquad; 2],
    lowpass: [Biquad; 2],
    post: [Biquad; 2],
    mode: PhoneMode,
}

impl PhoneFilter {
    pub fn new() -> Self {
        Self {
            highpass: Default::default(),
            mid_boost: Default::default(),
            warmth: Default::default(),
            lowpass: Default::default(),
            post: Default::default(),
            mode: PhoneMode::Rotary,
        }
    }

    pub fn reset(&mut self) {
        for ch in 0..2 {
            self.highpass[ch].reset();
            self.mid_boost[ch].reset();
            self.warmth[ch].reset();
            self.lowpass[ch].reset();
            self.post[ch].reset();
        }
    }

    /// Recompute all coefficients from the mode table and intensity.
    /// Called once per block; pure computation, no allocation.
    pub fn update_coeffs(&mut self, sample_rate: f32, intensity: f32, mode: PhoneMode) {
        self.mode = mode;
        let t = intensity.clamp(0.0, 1.0);
        let tab = mode.table();

        let hp_freq = tab.hp_base + t * tab.hp_span;
        let lp_freq = tab.lp_base + t * tab.lp_span;
        let edge_q = 0.5 + t * 0.3;
        let mid_q = tab.mid_q_base + t * tab.mid_q_span;
        let mid_db = tab.mid_db_base + t * tab.mid_db_span;
        let warmth_gain = tab.warmth_base + t * tab.warmth_span;

        let hp = BiquadCoeffs::high_pass(sample_rate, hp_freq, edge_q);
        let mid = BiquadCoeffs::peaking(sample_rate, tab.mid_freq, mid_q, mid_db);
        let warm = BiquadCoeffs::low_shelf(sample_rate, 300.0, 0.7, warmth_gain);
        let lp = BiquadCoeffs::low_pass(sample_rate, lp_freq, edge_q);
        let post = BiquadCoeffs::low_pass(sample_rate, lp_freq * 1.1, 0.5);

        for ch in 0..2 {
            self.highpass[ch].set_coeffs(hp);
            self.mid_boost[ch].set_coeffs(mid);
            self.warmth[ch].set_coeffs(warm);
            self.lowpass[ch].set_coeffs(lp);
            self.post[ch].set_coeffs(post);
        }
    }

    /// Run the cascade plus mode nonlinearity on one sample. Fully wet;
    /// the chain applies the crossfades.
    #[inline]
    pub fn process(&mut self, ch: usize, x: f32, amount: f32) -> f32 {
        let mut s = self.highpass[ch].process(x);
        s = self.mid_boost[ch].process(s);
        s = self.warmth[ch].process(s);
        s = self.lowpass[ch].process(s);
        s = self.post[ch].process(s);

        match self.mode {
            PhoneMode::Rotary => s / (1.0 + s.abs() * 0.2 * amount),
            PhoneMode::TouchTone => s,
            PhoneMode::Mobile => {
                let comp = 1.0 + amount * 0.3;
                (s * comp).tanh() / comp
            }
        }
    }
}

impl Default for PhoneFilter {
    fn default() -> Self {
        Self::new()
    }
}
