//! Fixed-capacity circular delay line with fractional reads.
//!
//! One instance per audio channel. The write cursor marks "now"; a read
//! at delay `d` returns the sample pushed `d` pushes ago, linearly
//! interpolated for non-integer `d`. Callers read before pushing, so a
//! delay of 1 is the most recent sample.

/// Circular sample buffer with linear-interpolated fractional reads.
pub struct DelayLine {
    buf: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line holding `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(4)],
            write_pos: 0,
        }
    }

    /// Create a delay line sized for `duration_secs` at `sample_rate`.
    pub fn with_duration(duration_secs: f32, sample_rate: f32) -> Self {
        Self::new((duration_secs * sample_rate).ceil() as usize)
    }

    /// Maximum usable delay in samples.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Write one sample and advance the cursor.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buf[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos >= self.buf.len() {
            self.write_pos = 0;
        }
    }

    /// Read `delay_samples` back from the write cursor with linear
    /// interpolation. The offset is clamped to the valid range, so a
    /// modulated read can never run past the buffer.
    #[inline]
    pub fn read_frac(&self, delay_samples: f32) -> f32 {
        let len = self.buf.len();
        let d = delay_samples.clamp(1.0, (len - 2) as f32);
        let d_int = d as usize;
        let frac = d - d_int as f32;

        let idx0 = (self.write_pos + len - d_int) % len;
        let idx1 = (self.write_pos + len - d_int - 1) % len;

        self.buf[idx0] * (1.0 - frac) + self.buf[idx1] * frac
    }

    /// Zero the buffer contents, keeping capacity.
    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_delay_readback() {
        let mut dl = DelayLine::new(16);
        for i in 0..8 {
            dl.push(i as f32);
        }
        // Last pushed value was 7.0, one push ago.
        assert_eq!(dl.read_frac(1.0), 7.0);
        assert_eq!(dl.read_frac(4.0), 4.0);
    }

    #[test]
    fn fractional_read_interpolates() {
        let mut dl = DelayLine::new(16);
        dl.push(0.0);
        dl.push(1.0);
        dl.push(2.0);
        // Halfway between the samples pushed 1 and 2 pushes ago.
        let v = dl.read_frac(1.5);
        assert!((v - 1.5).abs() < 1e-6, "v={v}");
    }

    #[test]
    fn wraps_around() {
        let mut dl = DelayLine::new(8);
        for i in 0..20 {
            dl.push(i as f32);
        }
        assert_eq!(dl.read_frac(1.0), 19.0);
        assert_eq!(dl.read_frac(6.0), 14.0);
    }

    #[test]
    fn read_is_clamped_to_capacity() {
        let mut dl = DelayLine::new(8);
        for i in 0..8 {
            dl.push(i as f32);
        }
        // Requesting more delay than the buffer holds clamps instead of wrapping
        // into freshly written samples.
        let v = dl.read_frac(1000.0);
        assert_eq!(v, dl.read_frac(6.0));
    }

    #[test]
    fn clear_silences() {
        let mut dl = DelayLine::new(8);
        for _ in 0..8 {
            dl.push(1.0);
        }
        dl.clear();
        assert_eq!(dl.read_frac(3.0), 0.0);
    }
}
