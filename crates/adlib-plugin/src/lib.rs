//! Vocal ad-lib FX chain — nih-plug VST3/CLAP/standalone plugin.
//!
//! Thin real-time wrapper around the adlib-dsp engine: parameter
//! snapshots and the host tempo are read once per block, then the
//! engine processes the buffer in place. The hum amount is exposed as
//! an atomic so an editor or embedder can set it from any thread.

mod params;

use adlib_dsp::AdlibEngine;
use atomic_float::AtomicF32;
use nih_plug::prelude::*;
use std::sync::Arc;

use params::AdlibParams;

pub struct AdlibPlugin {
    params: Arc<AdlibParams>,
    engine: AdlibEngine,
    sample_rate: f32,
}

impl Default for AdlibPlugin {
    fn default() -> Self {
        Self {
            params: Arc::new(AdlibParams::default()),
            engine: AdlibEngine::new(),
            sample_rate: 44100.0,
        }
    }
}

impl AdlibPlugin {
    /// Handle for setting the hum amount (0..1) from a non-audio thread.
    pub fn hum_control(&self) -> Arc<AtomicF32> {
        self.engine.hum_control()
    }
}

impl Plugin for AdlibPlugin {
    const NAME: &'static str = "Adlib FX";
    const VENDOR: &'static str = "adlib-project";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        // Stereo
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        // Mono
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        _layout: &AudioIOLayout,
        config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = config.sample_rate;
        self.engine
            .prepare(config.sample_rate, config.max_buffer_size as usize);
        true
    }

    fn reset(&mut self) {
        self.engine.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let engine_params = self.params.to_engine_params();
        let tempo = context.transport().tempo;
        let delay_active = engine_params.delay_enabled;

        match buffer.as_slice() {
            [left] => {
                self.engine
                    .process_block(&mut left[..], None, &engine_params, tempo);
            }
            [left, right, ..] => {
                self.engine.process_block(
                    &mut left[..],
                    Some(&mut right[..]),
                    &engine_params,
                    tempo,
                );
            }
            [] => {}
        }

        if delay_active {
            // Echo tail: keep the host calling us for two seconds after
            // the input stops.
            ProcessStatus::Tail((2.0 * self.sample_rate) as u32)
        } else {
            ProcessStatus::Normal
        }
    }
}

impl ClapPlugin for AdlibPlugin {
    const CLAP_ID: &'static str = "com.adlib-project.adlib-fx";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Vocal ad-lib effect chain: saturation, phone, underwater, delay");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Delay,
        ClapFeature::Distortion,
    ];
}

impl Vst3Plugin for AdlibPlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"AdlibFxChain_v1_";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

nih_export_clap!(AdlibPlugin);
nih_export_vst3!(AdlibPlugin);
