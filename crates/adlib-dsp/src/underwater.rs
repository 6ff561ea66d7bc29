//! Submerged "underwater" filter with modulated depth.
//!
//! A steep low-pass whose cutoff follows an exponential law in the
//! intensity, a resonance peak below it for bubble character, and a low
//! shelf for warmth. Each channel then runs through a short modulated
//! delay with its own LFO rate/phase so the two sides drift against
//! each other, followed by mid/side widening.

use crate::biquad::{Biquad, BiquadCoeffs};
use shared_dsp::DelayLine;
use std::f32::consts::TAU;

/// Base read position of the modulated delay, in milliseconds.
const MOD_BASE_MS: f32 = 10.0;

/// Right-channel modulator phase lead, radians.
const RIGHT_PHASE_OFFSET: f32 = 1.5;

pub struct Underwater {
    main: [Biquad; 2],
    resonance: [Biquad; 2],
    warmth: [Biquad; 2],
    mod_delay: [DelayLine; 2],
    mod_phase: [f32; 2],
    sample_rate: f32,
}

impl Underwater {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            main: Default::default(),
            resonance: Default::default(),
            warmth: Default::default(),
            mod_delay: [
                DelayLine::with_duration(0.03, sample_rate),
                DelayLine::with_duration(0.03, sample_rate),
            ],
            mod_phase: [0.0, 0.33 * TAU],
            sample_rate,
        }
    }

    /// Reallocate the modulation delay lines for a new sample rate.
    /// Not real-time safe; called from `prepare` only.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.mod_delay = [
            DelayLine::with_duration(0.03, sample_rate),
            DelayLine::with_duration(0.03, sample_rate),
        ];
        self.reset();
    }

    /// Clear filter and delay state without allocating.
    pub fn reset(&mut self) {
        for ch in 0..2 {
            self.main[ch].reset();
            self.resonance[ch].reset();
            self.warmth[ch].reset();
            self.mod_delay[ch].clear();
        }
        self.mod_phase = [0.0, 0.33 * TAU];
    }

    /// Recompute coefficients once per block. The cutoff follows
    /// `6000 * 0.08^t` floored at 300 Hz; the exponential shape is the
    /// point of the effect, a linear mapping sounds wrong.
    pub fn update_coeffs(&mut self, sample_rate: f32, intensity: f32) {
        let t = intensity.clamp(0.0, 1.0);

        let cutoff = (6000.0 * 0.08f32.powf(t)).max(300.0);
        let main_q = 0.6 + t * 0.8;
        let main = BiquadCoeffs::low_pass(sample_rate, cutoff, main_q);

        let res_freq = cutoff * 0.7;
        let res_q = 1.0 + t * 1.5;
        let res = BiquadCoeffs::peaking(sample_rate, res_freq, res_q, 2.0 * t);

        let warmth_gain = 1.0 + t * 0.8;
        let warm = BiquadCoeffs::low_shelf(sample_rate, 400.0, 0.6, warmth_gain);

        for ch in 0..2 {
            self.main[ch].set_coeffs(main);
            self.resonance[ch].set_coeffs(res);
            self.warmth[ch].set_coeffs(warm);
        }
    }

    /// Process one stereo pair. Fully wet; the chain applies crossfades.
    #[inline]
    pub fn process(&mut self, l: f32, r: f32, amount: f32) -> (f32, f32) {
        let sr = self.sample_rate;

        let mut wl = self.warmth[0].process(self.resonance[0].process(self.main[0].process(l)));
        let mut wr = self.warmth[1].process(self.resonance[1].process(self.main[1].process(r)));

        // Independent slow LFOs per channel for stereo motion.
        let mod_rate = 0.3 + amount * 0.4;
        let depth_samples = (1.5 + amount * 2.5) * sr / 1000.0;
        let base_samples = MOD_BASE_MS * sr / 1000.0;

        let inc = mod_rate * TAU / sr;
        for phase in &mut self.mod_phase {
            *phase += inc;
            if *phase > TAU {
                *phase -= TAU;
            }
        }
        let mod_l = self.mod_phase[0].sin() * depth_samples;
        let mod_r = (self.mod_phase[1] + RIGHT_PHASE_OFFSET).sin() * depth_samples;

        self.mod_delay[0].push(wl);
        self.mod_delay[1].push(wr);
        let delayed_l = self.mod_delay[0].read_frac(base_samples + mod_l);
        let delayed_r = self.mod_delay[1].read_frac(base_samples + mod_r);

        let mod_mix = 0.3 + amount * 0.4;
        wl = wl * (1.0 - mod_mix) + delayed_l * mod_mix;
        wr = wr * (1.0 - mod_mix) + delayed_r * mod_mix;

        // Mid/side width expansion.
        let mid = (wl + wr) * 0.5;
        let side = (wl - wr) * 0.5 * (1.0 + amount * 0.3);
        (mid + side, mid - side)
    }
}
