//! Engine parameter snapshot and phone mode tables.
//!
//! `EngineParams` is a plain-data copy of every control, taken once per
//! block by the caller (plugin or CLI) and handed to the engine. All
//! values are clamped to their declared range before use; the engine
//! never trusts raw host values.

use crate::tempo::DelayDivision;

/// Engine-wide delay time bounds in milliseconds.
pub const DELAY_MIN_MS: f32 = 20.0;
pub const DELAY_MAX_MS: f32 = 2000.0;

/// Feedback is capped below unity regardless of the requested value.
pub const FEEDBACK_CAP: f32 = 0.92;

/// Phone character mode. Each mode is a fixed constant table, not a
/// point on a continuous morph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhoneMode {
    /// 1920s-1950s carbon mic: warm, lo-fi, narrow.
    #[default]
    Rotary,
    /// 1960s-1980s landline: clear but band-limited.
    TouchTone,
    /// 1990s-2000s cell: wider band, tighter presence peak.
    Mobile,
}

impl PhoneMode {
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => PhoneMode::TouchTone,
            2 => PhoneMode::Mobile,
            _ => PhoneMode::Rotary,
        }
    }
}

/// Per-mode filter constants, scaled by intensity at update time.
pub struct PhoneModeTable {
    pub hp_base: f32,
    pub hp_span: f32,
    pub lp_base: f32,
    pub lp_span: f32,
    pub mid_freq: f32,
    pub mid_q_base: f32,
    pub mid_q_span: f32,
    pub mid_db_base: f32,
    pub mid_db_span: f32,
    pub warmth_base: f32,
    pub warmth_span: f32,
}

const ROTARY: PhoneModeTable = PhoneModeTable {
    hp_base: 350.0,
    hp_span: 250.0,
    lp_base: 2800.0,
    lp_span: -800.0,
    mid_freq: 900.0,
    mid_q_base: 1.5,
    mid_q_span: 2.0,
    mid_db_base: 3.0,
    mid_db_span: 5.0,
    warmth_base: 1.5,
    warmth_span: 1.5,
};

const TOUCH_TONE: PhoneModeTable = PhoneModeTable {
    hp_base: 280.0,
    hp_span: 120.0,
    lp_base: 3600.0,
    lp_span: -600.0,
    mid_freq: 1400.0,
    mid_q_base: 1.2,
    mid_q_span: 1.0,
    mid_db_base: 2.0,
    mid_db_span: 3.0,
    warmth_base: 1.2,
    warmth_span: 0.8,
};

const MOBILE: PhoneModeTable = PhoneModeTable {
    hp_base: 200.0,
    hp_span: 200.0,
    lp_base: 4200.0,
    lp_span: -1000.0,
    mid_freq: 2000.0,
    mid_q_base: 2.0,
    mid_q_span: 2.5,
    mid_db_base: 3.0,
    mid_db_span: 4.0,
    warmth_base: 1.0,
    warmth_span: 0.5,
};

impl PhoneMode {
    pub fn table(self) -> &'static PhoneModeTable {
        match self {
            PhoneMode::Rotary => &ROTARY,
            PhoneMode::TouchTone => &TOUCH_TONE,
            PhoneMode::Mobile => &MOBILE,
        }
    }
}

/// One block's worth of control values, normalized and clamped.
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// Saturation amount, 0..1.
    pub saturation: f32,
    pub saturation_enabled: bool,

    /// Phone amount, 0..1.
    pub phone: f32,
    pub phone_enabled: bool,
    pub phone_mode: PhoneMode,

    /// Underwater amount, 0..1.
    pub underwater: f32,
    pub underwater_enabled: bool,

    /// Delay time in milliseconds (used when `delay_sync` is off).
    pub delay_time_ms: f32,
    /// Delay feedback, 0..1 (pre-cap).
    pub delay_feedback: f32,
    /// Delay wet send level, 0..1.
    pub delay_mix: f32,
    pub delay_enabled: bool,
    pub delay_ping_pong: bool,
    pub delay_sync: bool,
    pub delay_division: DelayDivision,

    /// Output gain in dB.
    pub output_gain_db: f32,
    /// When false the output stage passes unity gain.
    pub output_enabled: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            saturation: 0.25,
            saturation_enabled: false,
            phone: 0.5,
            phone_enabled: false,
            phone_mode: PhoneMode::Rotary,
            underwater: 0.0,
            underwater_enabled: false,
            delay_time_ms: 250.0,
            delay_feedback: 0.35,
            delay_mix: 0.4,
            delay_enabled: false,
            delay_ping_pong: false,
            delay_sync: false,
            delay_division: DelayDivision::Quarter,
            output_gain_db: 0.0,
            output_enabled: true,
        }
    }
}

impl EngineParams {
    /// Clamp every continuous field into its declared range.
    pub fn clamped(&self) -> Self {
        let mut p = self.clone();
        p.saturation = p.saturation.clamp(0.0, 1.0);
        p.phone = p.phone.clamp(0.0, 1.0);
        p.underwater = p.underwater.clamp(0.0, 1.0);
        p.delay_time_ms = p.delay_time_ms.clamp(DELAY_MIN_MS, DELAY_MAX_MS);
        p.delay_feedback = p.delay_feedback.clamp(0.0, 1.0);
        p.delay_mix = p.delay_mix.clamp(0.0, 1.0);
        p.output_gain_db = p.output_gain_db.clamp(-12.0, 12.0);
        p
    }

    /// Linear output gain for the current block: unity when the output
    /// stage is disabled.
    pub fn output_gain_linear(&self) -> f32 {
        if self.output_enabled {
            10.0f32.powf(self.output_gain_db / 20.0)
        } else {
            1.0
        }
    }
}
