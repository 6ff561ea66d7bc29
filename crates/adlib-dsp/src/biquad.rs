//! Biquad filter sections and a one-pole DC blocker.
//!
//! Coefficients follow the RBJ cookbook, normalized by `a0`. Sections
//! keep Direct Form II state per instance, so one `Biquad` serves one
//! channel of one filter stage.

use std::f32::consts::PI;

/// Normalized biquad coefficients.
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    /// Identity (pass-through) section.
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Lowpass.
    pub fn low_pass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let (alpha, cos_w0) = prewarp(sample_rate, freq, q);
        let b0 = (1.0 - cos_w0) / 2.0;
        let b1 = 1.0 - cos_w0;
        let b2 = (1.0 - cos_w0) / 2.0;
        normalize(b0, b1, b2, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    /// Highpass.
    pub fn high_pass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let (alpha, cos_w0) = prewarp(sample_rate, freq, q);
        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = (1.0 + cos_w0) / 2.0;
        normalize(b0, b1, b2, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    /// Peaking EQ with `gain_db` boost/cut at `freq`.
    pub fn peaking(sample_rate: f32, freq: f32, q: f32, gain_db: f32) -> Self {
        let a_lin = 10.0f32.powf(gain_db / 40.0);
        let (alpha, cos_w0) = prewarp(sample_rate, freq, q);
        normalize(
            1.0 + alpha * a_lin,
            -2.0 * cos_w0,
            1.0 - alpha * a_lin,
            1.0 + alpha / a_lin,
            -2.0 * cos_w0,
            1.0 - alpha / a_lin,
        )
    }

    /// Low shelf with linear `gain` below `freq`.
    pub fn low_shelf(sample_rate: f32, freq: f32, q: f32, gain: f32) -> Self {
        let a = gain.max(1e-4).sqrt();
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha);
        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha;
        normalize(b0, b1, b2, a0, a1, a2)
    }
}

fn prewarp(sample_rate: f32, freq: f32, q: f32) -> (f32, f32) {
    let freq = freq.clamp(10.0, sample_rate * 0.499);
    let w0 = 2.0 * PI * freq / sample_rate;
    let alpha = w0.sin() / (2.0 * q.max(0.05));
    (alpha, w0.cos())
}

fn normalize(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> BiquadCoeffs {
    BiquadCoeffs {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    }
}

/// Direct Form II biquad section with per-instance state.
pub struct Biquad {
    coeffs: BiquadCoeffs,
    w1: f32,
    w2: f32,
}

impl Biquad {
    pub fn new() -> Self {
        Self {
            coeffs: BiquadCoeffs::identity(),
            w1: 0.0,
            w2: 0.0,
        }
    }

    /// Swap in new coefficients. State carries over, so a per-block
    /// coefficient update does not click.
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let w0 = x - c.a1 * self.w1 - c.a2 * self.w2;
        let y = c.b0 * w0 + c.b1 * self.w1 + c.b2 * self.w2;
        self.w2 = self.w1;
        self.w1 = w0;
        y
    }

    pub fn reset(&mut self) {
        self.w1 = 0.0;
        self.w2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// One-pole DC blocker: `y[n] = x[n] - x[n-1] + r * y[n-1]`.
///
/// The pole sits at 5 Hz, low enough to leave program material intact
/// while draining the bias that asymmetric saturation introduces.
pub struct DcBlocker {
    r: f32,
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            r: 1.0 - 2.0 * PI * 5.0 / sample_rate,
            x1: 0.0,
            y1: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.r * self.y1;
        self.x1 = x;
        self.y1 = y;
        y
    }

    /// Re-derive the pole for a new sample rate and clear state.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.r = 1.0 - 2.0 * PI * 5.0 / sample_rate;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn rms(v: &[f32]) -> f32 {
        (v.iter().map(|x| x * x).sum::<f32>() / v.len() as f32).sqrt()
    }

    fn sine(freq: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / SR).sin())
            .collect()
    }

    #[test]
    fn lowpass_attenuates_hf() {
        let input = sine(10000.0, 44100);
        let mut bq = Biquad::new();
        bq.set_coeffs(BiquadCoeffs::low_pass(SR, 1000.0, 0.707));
        let out: Vec<f32> = input.iter().map(|&x| bq.process(x)).collect();
        assert!(rms(&out) < rms(&input) * 0.2);
    }

    #[test]
    fn highpass_attenuates_lf() {
        let input = sine(50.0, 44100);
        let mut bq = Biquad::new();
        bq.set_coeffs(BiquadCoeffs::high_pass(SR, 1000.0, 0.707));
        let out: Vec<f32> = input.iter().map(|&x| bq.process(x)).collect();
        assert!(rms(&out) < rms(&input) * 0.2);
    }

    #[test]
    fn peaking_boosts_center() {
        let input = sine(1000.0, 44100);
        let mut bq = Biquad::new();
        bq.set_coeffs(BiquadCoeffs::peaking(SR, 1000.0, 1.0, 6.0));
        let out: Vec<f32> = input.iter().map(|&x| bq.process(x)).collect();
        // +6 dB ~ 2x amplitude
        let ratio = rms(&out[4410..]) / rms(&input[4410..]);
        assert!((ratio - 2.0).abs() < 0.2, "ratio={ratio}");
    }

    #[test]
    fn low_shelf_boosts_bass() {
        let lo = sine(100.0, 44100);
        let hi = sine(8000.0, 44100);
        let mut bq_lo = Biquad::new();
        let mut bq_hi = Biquad::new();
        let c = BiquadCoeffs::low_shelf(SR, 400.0, 0.7, 2.0);
        bq_lo.set_coeffs(c);
        bq_hi.set_coeffs(c);
        let out_lo: Vec<f32> = lo.iter().map(|&x| bq_lo.process(x)).collect();
        let out_hi: Vec<f32> = hi.iter().map(|&x| bq_hi.process(x)).collect();
        let gain_lo = rms(&out_lo[4410..]) / rms(&lo[4410..]);
        let gain_hi = rms(&out_hi[4410..]) / rms(&hi[4410..]);
        assert!(gain_lo > 1.5, "gain_lo={gain_lo}");
        assert!((gain_hi - 1.0).abs() < 0.2, "gain_hi={gain_hi}");
    }

    #[test]
    fn dc_blocker_removes_offset() {
        let mut dc = DcBlocker::new(SR);
        let mut out = Vec::with_capacity(44100);
        for _ in 0..44100 {
            out.push(dc.process(0.5));
        }
        // After settling, a constant input should be driven toward zero.
        let tail = &out[22050..];
        assert!(rms(tail) < 0.02, "residual dc: {}", rms(tail));
    }

    #[test]
    fn dc_blocker_passes_audio() {
        let input = sine(440.0, 44100);
        let mut dc = DcBlocker::new(SR);
        let out: Vec<f32> = input.iter().map(|&x| dc.process(x)).collect();
        let ratio = rms(&out[4410..]) / rms(&input[4410..]);
        assert!((ratio - 1.0).abs() < 0.05, "ratio={ratio}");
    }
}
