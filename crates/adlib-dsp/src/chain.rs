//! The engine: smoother bank, per-block updates, per-sample chain.
//!
//! Stage order is fixed: saturation -> phone -> underwater -> delay ->
//! hum -> output gain/limiter. Every bypassable stage blends through
//! two nested crossfades (`wet = dry*(1-amount) + processed*amount`,
//! then `out = dry*(1-mix) + wet*mix`), except the delay, whose wet
//! signal is an additive send on top of the dry path.
//!
//! Block-synchronous contract: the caller hands a parameter snapshot
//! and optional host BPM with each block. Structural values (mode,
//! routing, sync, division) take effect at the block boundary;
//! continuous values stream through per-sample smoothers. Nothing here
//! allocates or locks after `prepare`.

use crate::delay::DelayEngine;
use crate::hum::HumGenerator;
use crate::params::{EngineParams, DELAY_MAX_MS, DELAY_MIN_MS, FEEDBACK_CAP};
use crate::phone::PhoneFilter;
use crate::saturation::Saturator;
use crate::underwater::Underwater;
use atomic_float::AtomicF32;
use shared_dsp::SmoothedParam;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Smoothing windows in seconds. Bypass is slower to mask
/// re-engagement; delay time is slower still so length changes read as
/// drift, not pitch swoops.
const AMOUNT_RAMP: f32 = 0.02;
const BYPASS_RAMP: f32 = 0.05;
const DELAY_TIME_RAMP: f32 = 0.1;

/// Below this a stage is treated as fully out of the signal path.
const GATE_EPS: f32 = 0.001;

pub struct AdlibEngine {
    sample_rate: f32,

    saturator: Saturator,
    phone: PhoneFilter,
    underwater: Underwater,
    delay: DelayEngine,
    hum: HumGenerator,

    sat_amount: SmoothedParam,
    sat_mix: SmoothedParam,
    phone_amount: SmoothedParam,
    phone_mix: SmoothedParam,
    uw_amount: SmoothedParam,
    uw_mix: SmoothedParam,
    delay_time: SmoothedParam,
    delay_feedback: SmoothedParam,
    delay_mix: SmoothedParam,
    delay_bypass_mix: SmoothedParam,
    output_gain: SmoothedParam,

    ping_pong: bool,

    /// Hum amount, written from a non-audio thread at any time.
    hum_amount: Arc<AtomicF32>,
}

impl AdlibEngine {
    pub fn new() -> Self {
        let sr = 44100.0;
        Self {
            sample_rate: sr,
            saturator: Saturator::new(sr),
            phone: PhoneFilter::new(),
            underwater: Underwater::new(sr),
            delay: DelayEngine::new(sr),
            hum: HumGenerator::new(sr),
            sat_amount: SmoothedParam::new(0.0, sr, AMOUNT_RAMP),
            sat_mix: SmoothedParam::new(0.0, sr, BYPASS_RAMP),
            phone_amount: SmoothedParam::new(0.0, sr, AMOUNT_RAMP),
            phone_mix: SmoothedParam::new(0.0, sr, BYPASS_RAMP),
            uw_amount: SmoothedParam::new(0.0, sr, AMOUNT_RAMP),
            uw_mix: SmoothedParam::new(0.0, sr, BYPASS_RAMP),
            delay_time: SmoothedParam::new(250.0, sr, DELAY_TIME_RAMP),
            delay_feedback: SmoothedParam::new(0.0, sr, AMOUNT_RAMP),
            delay_mix: SmoothedParam::new(0.0, sr, AMOUNT_RAMP),
            delay_bypass_mix: SmoothedParam::new(0.0, sr, BYPASS_RAMP),
            output_gain: SmoothedParam::new(1.0, sr, AMOUNT_RAMP),
            ping_pong: false,
            hum_amount: Arc::new(AtomicF32::new(0.0)),
        }
    }

    /// Allocate and reset all state for a new configuration. Must not
    /// be called concurrently with `process_block`.
    pub fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.saturator.prepare(sample_rate);
        self.phone.reset();
        self.underwater.prepare(sample_rate);
        self.delay.prepare(sample_rate);
        self.hum.prepare(sample_rate);
        self.reset_smoothers();
    }

    /// Clear all audio state without allocating. Smoothers snap to
    /// their targets so playback resumes without a stale ramp.
    pub fn reset(&mut self) {
        self.saturator.reset();
        self.phone.reset();
        self.underwater.reset();
        self.delay.reset();
        self.hum.reset();
        self.reset_smoothers();
    }

    fn reset_smoothers(&mut self) {
        let sr = self.sample_rate;
        self.sat_amount.reset(sr, AMOUNT_RAMP);
        self.sat_mix.reset(sr, BYPASS_RAMP);
        self.phone_amount.reset(sr, AMOUNT_RAMP);
        self.phone_mix.reset(sr, BYPASS_RAMP);
        self.uw_amount.reset(sr, AMOUNT_RAMP);
        self.uw_mix.reset(sr, BYPASS_RAMP);
        self.delay_time.reset(sr, DELAY_TIME_RAMP);
        self.delay_feedback.reset(sr, AMOUNT_RAMP);
        self.delay_mix.reset(sr, AMOUNT_RAMP);
        self.delay_bypass_mix.reset(sr, BYPASS_RAMP);
        self.output_gain.reset(sr, AMOUNT_RAMP);
    }

    /// Shared handle for setting the hum amount from another thread.
    pub fn hum_control(&self) -> Arc<AtomicF32> {
        self.hum_amount.clone()
    }

    /// Process one block in place. `right` is `None` for mono; the
    /// chain still runs in stereo internally and writes the left result
    /// back.
    pub fn process_block(
        &mut self,
        left: &mut [f32],
        mut right: Option<&mut [f32]>,
        params: &EngineParams,
        bpm: Option<f64>,
    ) {
        let p = params.clamped();

        // --- Per-block updates -----------------------------------------
        let raw_delay_ms = if p.delay_sync {
            p.delay_division.to_ms(bpm)
        } else {
            p.delay_time_ms
        };
        let delay_ms = raw_delay_ms.clamp(DELAY_MIN_MS, DELAY_MAX_MS);

        self.sat_amount.set_target(p.saturation);
        self.sat_mix.set_target(as_mix(p.saturation_enabled));
        self.phone_amount.set_target(p.phone);
        self.phone_mix.set_target(as_mix(p.phone_enabled));
        self.uw_amount.set_target(p.underwater);
        self.uw_mix.set_target(as_mix(p.underwater_enabled));
        self.delay_time.set_target(delay_ms);
        self.delay_feedback.set_target(p.delay_feedback * FEEDBACK_CAP);
        self.delay_mix.set_target(p.delay_mix);
        self.delay_bypass_mix.set_target(as_mix(p.delay_enabled));
        self.output_gain.set_target(p.output_gain_linear());

        self.phone.update_coeffs(self.sample_rate, p.phone, p.phone_mode);
        self.underwater.update_coeffs(self.sample_rate, p.underwater);
        self.ping_pong = p.delay_ping_pong;

        // --- Per-sample loop -------------------------------------------
        for i in 0..left.len() {
            let sat_amt = self.sat_amount.next();
            let sat_mix = self.sat_mix.next();
            let phone_amt = self.phone_amount.next();
            let phone_mix = self.phone_mix.next();
            let uw_amt = self.uw_amount.next();
            let uw_mix = self.uw_mix.next();
            let time_ms = self.delay_time.next();
            let fb = self.delay_feedback.next();
            let send = self.delay_mix.next();
            let delay_active = self.delay_bypass_mix.next();
            let out_gain = self.output_gain.next();
            let hum_amt = self.hum_amount.load(Ordering::Relaxed);

            let in_l = left[i];
            let in_r = match &right {
                Some(r) => r[i],
                None => in_l,
            };
            let (mut l, mut r) = (in_l, in_r);

            // 1. Saturation: enrich the clean signal before filtering.
            if sat_mix > GATE_EPS && sat_amt > GATE_EPS {
                let proc_l = self.saturator.process(0, l, sat_amt);
                let proc_r = self.saturator.process(1, r, sat_amt);
                let wet_l = l * (1.0 - sat_amt) + proc_l * sat_amt;
                let wet_r = r * (1.0 - sat_amt) + proc_r * sat_amt;
                l = l * (1.0 - sat_mix) + wet_l * sat_mix;
                r = r * (1.0 - sat_mix) + wet_r * sat_mix;
            }

            // 2. Phone filter.
            if phone_mix > GATE_EPS && phone_amt > GATE_EPS {
                let proc_l = self.phone.process(0, l, phone_amt);
                let proc_r = self.phone.process(1, r, phone_amt);
                let wet_l = l * (1.0 - phone_amt) + proc_l * phone_amt;
                let wet_r = r * (1.0 - phone_amt) + proc_r * phone_amt;
                l = l * (1.0 - phone_mix) + wet_l * phone_mix;
                r = r * (1.0 - phone_mix) + wet_r * phone_mix;
            }

            // 3. Underwater.
            if uw_mix > GATE_EPS && uw_amt > GATE_EPS {
                let (proc_l, proc_r) = self.underwater.process(l, r, uw_amt);
                let wet_l = l * (1.0 - uw_amt) + proc_l * uw_amt;
                let wet_r = r * (1.0 - uw_amt) + proc_r * uw_amt;
                l = l * (1.0 - uw_mix) + wet_l * uw_mix;
                r = r * (1.0 - uw_mix) + wet_r * uw_mix;
            }

            // 4. Delay: additive send, never replaces the dry path.
            if delay_active > GATE_EPS && send > GATE_EPS {
                let (tap_l, tap_r) = self.delay.process(l, r, time_ms, fb, self.ping_pong);
                l += tap_l * send * delay_active;
                r += tap_r * send * delay_active;
            } else {
                self.delay.push_silence();
            }

            // 5. Hum: always in the path, independent of stage bypasses.
            let (hum_l, hum_r) = self.hum.next(hum_amt);
            l += hum_l;
            r += hum_r;

            // 6. Output gain + soft limiter.
            l = soft_limit(l * out_gain);
            r = soft_limit(r * out_gain);

            left[i] = l;
            if let Some(rbuf) = right.as_mut() {
                rbuf[i] = r;
            }
        }
    }
}

impl Default for AdlibEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn as_mix(enabled: bool) -> f32 {
    if enabled {
        1.0
    } else {
        0.0
    }
}

/// Fixed tanh soft limiter: transparent at low level, bounds peaks
/// without hard clipping.
#[inline]
fn soft_limit(x: f32) -> f32 {
    (x * 0.9).tanh() / 0.9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PhoneMode;
    use std::f32::consts::PI;

    const SR: f32 = 44100.0;
    const BLOCK: usize = 512;

    fn sine(freq: f32, amp: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / SR).sin() * amp)
            .collect()
    }

    fn run_blocks(
        engine: &mut AdlibEngine,
        left: &mut [f32],
        right: &mut [f32],
        params: &EngineParams,
        bpm: Option<f64>,
    ) {
        for (cl, cr) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
            engine.process_block(cl, Some(cr), params, bpm);
        }
    }

    #[test]
    fn end_to_end_identity_when_everything_off() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        let params = EngineParams::default(); // all stages disabled, output 0 dB

        let input = sine(440.0, 0.2, 44100);
        let mut left = input.clone();
        let mut right = input.clone();
        run_blocks(&mut engine, &mut left, &mut right, &params, None);

        // Skip the first block to allow for ramp-in; the only residual
        // difference is the limiter's cubic term, tiny at this level.
        for i in BLOCK..input.len() {
            assert!(
                (left[i] - input[i]).abs() < 5e-3,
                "sample {i}: {} vs {}",
                left[i],
                input[i]
            );
            assert_eq!(left[i], right[i]);
        }
    }

    #[test]
    fn saturation_transparent_at_zero_amount() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        let mut params = EngineParams::default();
        params.saturation_enabled = true;
        params.saturation = 0.0;

        let input = sine(440.0, 0.2, 22050);
        let mut left = input.clone();
        let mut right = input.clone();
        run_blocks(&mut engine, &mut left, &mut right, &params, None);

        for i in BLOCK..input.len() {
            assert!(
                (left[i] - input[i]).abs() < 5e-3,
                "sample {i} differs with amount=0"
            );
        }
    }

    #[test]
    fn delay_send_is_additive() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        let mut params = EngineParams::default();
        params.delay_enabled = true;
        params.delay_mix = 1.0;
        params.delay_feedback = 0.0;
        params.delay_time_ms = 100.0;

        // Let the bypass crossfade settle before the impulse.
        let mut warmup_l = vec![0.0f32; 8192];
        let mut warmup_r = vec![0.0f32; 8192];
        run_blocks(&mut engine, &mut warmup_l, &mut warmup_r, &params, None);

        let n = (0.5 * SR) as usize;
        let mut left = vec![0.0f32; n];
        let mut right = vec![0.0f32; n];
        left[0] = 0.5;
        right[0] = 0.5;
        run_blocks(&mut engine, &mut left, &mut right, &params, None);

        // Dry impulse still present at full level (send, not crossfade).
        assert!((left[0] - soft_limit(0.5)).abs() < 1e-4, "dry path was attenuated: {}", left[0]);
        // And an echo shows up around 100 ms.
        let echo_at = (0.1 * SR) as usize;
        let echo_energy: f32 = left[echo_at - 100..echo_at + 100]
            .iter()
            .map(|x| x * x)
            .sum();
        assert!(echo_energy > 1e-4, "no echo: {echo_energy}");
    }

    #[test]
    fn bypass_toggle_produces_no_click() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        let mut params = EngineParams::default();
        params.phone_enabled = false;
        params.phone = 1.0;

        let input = sine(440.0, 0.4, 44100);
        let mut left = input.clone();
        let mut right = input.clone();

        // Toggle the phone stage on halfway through.
        let toggle_block = (left.len() / BLOCK) / 2;
        for (bi, (cl, cr)) in left
            .chunks_mut(BLOCK)
            .zip(right.chunks_mut(BLOCK))
            .enumerate()
        {
            if bi == toggle_block {
                params.phone_enabled = true;
            }
            engine.process_block(cl, Some(cr), &params, None);
        }

        // The output may change character but never jumps: successive
        // samples stay within the signal's own slew plus the crossfade
        // step budget.
        let mut max_step = 0.0f32;
        for i in 1..left.len() {
            max_step = max_step.max((left[i] - left[i - 1]).abs());
        }
        assert!(max_step < 0.15, "click detected: step={max_step}");
    }

    #[test]
    fn tempo_synced_delay_follows_bpm() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        let mut params = EngineParams::default();
        params.delay_enabled = true;
        params.delay_mix = 1.0;
        params.delay_feedback = 0.0;
        params.delay_sync = true;
        params.delay_division = crate::tempo::DelayDivision::Quarter;

        let mut warmup_l = vec![0.0f32; 16384];
        let mut warmup_r = vec![0.0f32; 16384];
        run_blocks(&mut engine, &mut warmup_l, &mut warmup_r, &params, Some(120.0));

        // Quarter at 120 BPM = 500 ms.
        let n = SR as usize;
        let mut left = vec![0.0f32; n];
        let mut right = vec![0.0f32; n];
        left[0] = 0.5;
        right[0] = 0.5;
        run_blocks(&mut engine, &mut left, &mut right, &params, Some(120.0));

        let echo_at = (0.5 * SR) as usize;
        let near: f32 = left[echo_at - 200..echo_at + 200].iter().map(|x| x * x).sum();
        let elsewhere: f32 = left[1000..echo_at - 2000].iter().map(|x| x * x).sum();
        assert!(near > 1e-4, "no echo at 500 ms: {near}");
        assert!(near > elsewhere * 10.0, "echo not where expected");
    }

    #[test]
    fn hum_is_always_active() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        engine.hum_control().store(1.0, Ordering::Relaxed);
        let params = EngineParams::default(); // every stage bypassed

        let mut left = vec![0.0f32; 8192];
        let mut right = vec![0.0f32; 8192];
        run_blocks(&mut engine, &mut left, &mut right, &params, None);

        let energy: f32 = left.iter().map(|x| x * x).sum();
        assert!(energy > 0.0, "hum missing");
        let peak = left.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
        assert!(peak < 0.01, "hum too loud: {peak}");
    }

    #[test]
    fn reprepare_clears_delay_tail() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        let mut params = EngineParams::default();
        params.delay_enabled = true;
        params.delay_mix = 1.0;
        params.delay_feedback = 0.8;
        params.delay_time_ms = 50.0;

        let mut left = sine(440.0, 0.5, 16384);
        let mut right = left.clone();
        run_blocks(&mut engine, &mut left, &mut right, &params, None);

        engine.prepare(SR, BLOCK);
        let mut silent_l = vec![0.0f32; 8192];
        let mut silent_r = vec![0.0f32; 8192];
        run_blocks(&mut engine, &mut silent_l, &mut silent_r, &params, None);

        let energy: f32 = silent_l.iter().map(|x| x * x).sum();
        assert!(energy < 1e-8, "stale delay tail after prepare: {energy}");
    }

    #[test]
    fn mono_input_is_supported() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        let mut params = EngineParams::default();
        params.saturation_enabled = true;
        params.saturation = 0.8;

        let mut left = sine(440.0, 0.5, 4096);
        for chunk in left.chunks_mut(BLOCK) {
            engine.process_block(chunk, None, &params, None);
        }
        assert!(left.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn everything_on_stays_finite_and_bounded() {
        let mut engine = AdlibEngine::new();
        engine.prepare(SR, BLOCK);
        engine.hum_control().store(1.0, Ordering::Relaxed);
        let mut params = EngineParams::default();
        params.saturation_enabled = true;
        params.saturation = 1.0;
        params.phone_enabled = true;
        params.phone = 1.0;
        params.phone_mode = PhoneMode::Mobile;
        params.underwater_enabled = true;
        params.underwater = 1.0;
        params.delay_enabled = true;
        params.delay_mix = 1.0;
        params.delay_feedback = 1.0; // capped internally
        params.delay_ping_pong = true;
        params.output_gain_db = 12.0;

        let mut left = sine(440.0, 1.0, 88200);
        let mut right = sine(660.0, 1.0, 88200);
        run_blocks(&mut engine, &mut left, &mut right, &params, Some(174.0));

        for (&l, &r) in left.iter().zip(right.iter()) {
            assert!(l.is_finite() && r.is_finite());
            // The tanh limiter bounds everything below 1/0.9.
            assert!(l.abs() <= 1.0 / 0.9 + 1e-4 && r.abs() <= 1.0 / 0.9 + 1e-4);
        }
    }
}
