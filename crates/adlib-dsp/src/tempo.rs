//! Tempo-synced delay times.
//!
//! Maps a musical division and the host BPM to milliseconds. Every
//! division is an exact ratio of a quarter note (`60000 / BPM` ms);
//! dotted is 1.5x, triplet is 2/3x.

/// Musical note division for the synced delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelayDivision {
    Whole,
    Half,
    HalfDotted,
    HalfTriplet,
    #[default]
    Quarter,
    QuarterDotted,
    QuarterTriplet,
    Eighth,
    EighthDotted,
    EighthTriplet,
    Sixteenth,
    SixteenthDotted,
    SixteenthTriplet,
}

/// BPM assumed when the host provides none (or a non-positive value).
pub const FALLBACK_BPM: f64 = 120.0;

impl DelayDivision {
    /// All divisions, in display order.
    pub const ALL: [DelayDivision; 13] = [
        DelayDivision::Whole,
        DelayDivision::Half,
        DelayDivision::HalfDotted,
        DelayDivision::HalfTriplet,
        DelayDivision::Quarter,
        DelayDivision::QuarterDotted,
        DelayDivision::QuarterTriplet,
        DelayDivision::Eighth,
        DelayDivision::EighthDotted,
        DelayDivision::EighthTriplet,
        DelayDivision::Sixteenth,
        DelayDivision::SixteenthDotted,
        DelayDivision::SixteenthTriplet,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    /// Length as a multiple of a quarter note.
    pub fn beat_ratio(self) -> f64 {
        match self {
            DelayDivision::Whole => 4.0,
            DelayDivision::Half => 2.0,
            DelayDivision::HalfDotted => 3.0,
            DelayDivision::HalfTriplet => 4.0 / 3.0,
            DelayDivision::Quarter => 1.0,
            DelayDivision::QuarterDotted => 1.5,
            DelayDivision::QuarterTriplet => 2.0 / 3.0,
            DelayDivision::Eighth => 0.5,
            DelayDivision::EighthDotted => 0.75,
            DelayDivision::EighthTriplet => 1.0 / 3.0,
            DelayDivision::Sixteenth => 0.25,
            DelayDivision::SixteenthDotted => 0.375,
            DelayDivision::SixteenthTriplet => 1.0 / 6.0,
        }
    }

    /// Delay time in milliseconds at `bpm`. Missing or non-positive BPM
    /// falls back to 120. The caller clamps the result into the engine's
    /// delay bounds.
    pub fn to_ms(self, bpm: Option<f64>) -> f32 {
        let bpm = match bpm {
            Some(b) if b > 0.0 => b,
            _ => FALLBACK_BPM,
        };
        let beat_ms = 60000.0 / bpm;
        (beat_ms * self.beat_ratio()) as f32
    }

    /// Short display label ("1/4 D" style).
    pub fn label(self) -> &'static str {
        match self {
            DelayDivision::Whole => "1/1",
            DelayDivision::Half => "1/2",
            DelayDivision::HalfDotted => "1/2 D",
            DelayDivision::HalfTriplet => "1/2 T",
            DelayDivision::Quarter => "1/4",
            DelayDivision::QuarterDotted => "1/4 D",
            DelayDivision::QuarterTriplet => "1/4 T",
            DelayDivision::Eighth => "1/8",
            DelayDivision::EighthDotted => "1/8 D",
            DelayDivision::EighthTriplet => "1/8 T",
            DelayDivision::Sixteenth => "1/16",
            DelayDivision::SixteenthDotted => "1/16 D",
            DelayDivision::SixteenthTriplet => "1/16 T",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_at_120_is_500ms() {
        assert_eq!(DelayDivision::Quarter.to_ms(Some(120.0)), 500.0);
    }

    #[test]
    fn triplet_and_dotted_ratios() {
        let t = DelayDivision::QuarterTriplet.to_ms(Some(120.0));
        assert!((t - 500.0 * 2.0 / 3.0).abs() < 0.01, "t={t}");
        let d = DelayDivision::EighthDotted.to_ms(Some(120.0));
        assert!((d - 375.0).abs() < 0.01, "d={d}");
    }

    #[test]
    fn whole_note_is_four_beats() {
        assert_eq!(DelayDivision::Whole.to_ms(Some(60.0)), 4000.0);
    }

    #[test]
    fn missing_bpm_falls_back_to_120() {
        assert_eq!(DelayDivision::Quarter.to_ms(None), 500.0);
        assert_eq!(DelayDivision::Quarter.to_ms(Some(0.0)), 500.0);
        assert_eq!(DelayDivision::Quarter.to_ms(Some(-3.0)), 500.0);
    }

    #[test]
    fn index_roundtrip() {
        for (i, div) in DelayDivision::ALL.iter().enumerate() {
            assert_eq!(DelayDivision::from_index(i), *div);
        }
        assert_eq!(DelayDivision::from_index(42), DelayDivision::Quarter);
    }
}
