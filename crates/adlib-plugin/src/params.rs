//! nih-plug parameter declarations for the ad-lib FX plugin.
//!
//! Mirrors the engine's control surface: per-stage amount + bypass,
//! delay timing/routing, phone character mode, and output gain. Bypass
//! booleans default to on (stage out of the path) except the output
//! stage. Conversion to `EngineParams` happens once per block.

use adlib_dsp::{DelayDivision, EngineParams, PhoneMode};
use nih_plug::prelude::*;

/// Phone character mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum PhoneModeParam {
    #[name = "Rotary"]
    Rotary,
    #[name = "Touch-Tone"]
    TouchTone,
    #[name = "Mobile"]
    Mobile,
}

impl PhoneModeParam {
    fn to_dsp(self) -> PhoneMode {
        match self {
            PhoneModeParam::Rotary => PhoneMode::Rotary,
            PhoneModeParam::TouchTone => PhoneMode::TouchTone,
            PhoneModeParam::Mobile => PhoneMode::Mobile,
        }
    }
}

/// Musical division for the synced delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum DivisionParam {
    #[name = "1/1"]
    Whole,
    #[name = "1/2"]
    Half,
    #[name = "1/2 D"]
    HalfDotted,
    #[name = "1/2 T"]
    HalfTriplet,
    #[name = "1/4"]
    Quarter,
    #[name = "1/4 D"]
    QuarterDotted,
    #[name = "1/4 T"]
    QuarterTriplet,
    #[name = "1/8"]
    Eighth,
    #[name = "1/8 D"]
    EighthDotted,
    #[name = "1/8 T"]
    EighthTriplet,
    #[name = "1/16"]
    Sixteenth,
    #[name = "1/16 D"]
    SixteenthDotted,
    #[name = "1/16 T"]
    SixteenthTriplet,
}

impl DivisionParam {
    fn to_dsp(self) -> DelayDivision {
        DelayDivision::from_index(self as usize)
    }
}

#[derive(Params)]
pub struct AdlibParams {
    // --- Saturation ---
    #[id = "saturation"]
    pub saturation: FloatParam,
    #[id = "saturationBypass"]
    pub saturation_bypass: BoolParam,

    // --- Phone ---
    #[id = "phone"]
    pub phone: FloatParam,
    #[id = "phoneBypass"]
    pub phone_bypass: BoolParam,
    #[id = "phoneMode"]
    pub phone_mode: EnumParam<PhoneModeParam>,

    // --- Delay ---
    #[id = "delayTime"]
    pub delay_time: FloatParam,
    #[id = "delayFeedback"]
    pub delay_feedback: FloatParam,
    #[id = "delayMix"]
    pub delay_mix: FloatParam,
    #[id = "delayBypass"]
    pub delay_bypass: BoolParam,
    #[id = "delayPingPong"]
    pub delay_ping_pong: BoolParam,
    #[id = "delaySync"]
    pub delay_sync: BoolParam,
    #[id = "delayDivision"]
    pub delay_division: EnumParam<DivisionParam>,

    // --- Underwater ---
    #[id = "underwater"]
    pub underwater: FloatParam,
    #[id = "underwaterBypass"]
    pub underwater_bypass: BoolParam,

    // --- Output ---
    #[id = "outputGain"]
    pub output_gain: FloatParam,
    #[id = "outputBypass"]
    pub output_bypass: BoolParam,
}

impl Default for AdlibParams {
    fn default() -> Self {
        Self {
            saturation: FloatParam::new(
                "Saturation",
                25.0,
                FloatRange::Linear { min: 0.0, max: 100.0 },
            ),
            saturation_bypass: BoolParam::new("Saturation Bypass", true),

            phone: FloatParam::new("Phone", 50.0, FloatRange::Linear { min: 0.0, max: 100.0 }),
            phone_bypass: BoolParam::new("Phone Bypass", true),
            phone_mode: EnumParam::new("Phone Mode", PhoneModeParam::Rotary),

            delay_time: FloatParam::new(
                "Delay Time",
                250.0,
                FloatRange::Skewed {
                    min: 50.0,
                    max: 2000.0,
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_unit(" ms"),
            delay_feedback: FloatParam::new(
                "Delay Feedback",
                35.0,
                FloatRange::Linear { min: 0.0, max: 100.0 },
            ),
            delay_mix: FloatParam::new(
                "Delay Mix",
                40.0,
                FloatRange::Linear { min: 0.0, max: 100.0 },
            ),
            delay_bypass: BoolParam::new("Delay Bypass", true),
            delay_ping_pong: BoolParam::new("Ping-Pong", false),
            delay_sync: BoolParam::new("Delay Sync", false),
            delay_division: EnumParam::new("Delay Division", DivisionParam::Quarter),

            underwater: FloatParam::new(
                "Underwater",
                0.0,
                FloatRange::Linear { min: 0.0, max: 100.0 },
            ),
            underwater_bypass: BoolParam::new("Underwater Bypass", true),

            output_gain: FloatParam::new(
                "Output",
                0.0,
                FloatRange::Linear { min: -12.0, max: 12.0 },
            )
            .with_unit(" dB"),
            output_bypass: BoolParam::new("Output Bypass", false),
        }
    }
}

impl AdlibParams {
    /// Snapshot current values into the engine's parameter struct.
    /// Called once per block on the audio thread; no allocation.
    pub fn to_engine_params(&self) -> EngineParams {
        EngineParams {
            saturation: self.saturation.value() / 100.0,
            saturation_enabled: !self.saturation_bypass.value(),
            phone: self.phone.value() / 100.0,
            phone_enabled: !self.phone_bypass.value(),
            phone_mode: self.phone_mode.value().to_dsp(),
            underwater: self.underwater.value() / 100.0,
            underwater_enabled: !self.underwater_bypass.value(),
            delay_time_ms: self.delay_time.value(),
            delay_feedback: self.delay_feedback.value() / 100.0,
            delay_mix: self.delay_mix.value() / 100.0,
            delay_enabled: !self.delay_bypass.value(),
            delay_ping_pong: self.delay_ping_pong.value(),
            delay_sync: self.delay_sync.value(),
            delay_division: self.delay_division.value().to_dsp(),
            output_gain_db: self.output_gain.value(),
            output_enabled: !self.output_bypass.value(),
        }
    }
}
