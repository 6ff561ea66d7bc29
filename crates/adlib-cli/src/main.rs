//! Offline WAV renderer for the ad-lib FX chain.
//!
//! Reads a WAV file, runs it through the engine block by block with the
//! settings given on the command line, writes the processed WAV, and
//! prints input/output level metrics.

use adlib_dsp::{AdlibEngine, DelayDivision, EngineParams, PhoneMode};
use clap::Parser;
use shared_dsp::RunningMetrics;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

const BLOCK: usize = 512;

#[derive(Parser)]
#[command(name = "adlib", about = "Vocal ad-lib FX chain renderer")]
struct Cli {
    /// Input WAV file
    input: String,

    /// Output WAV file
    output: String,

    /// Saturation amount, 0-100 (enables the stage when > 0)
    #[arg(long, default_value_t = 0.0)]
    saturation: f32,

    /// Phone amount, 0-100 (enables the stage when > 0)
    #[arg(long, default_value_t = 0.0)]
    phone: f32,

    /// Phone mode: 0=rotary, 1=touch-tone, 2=mobile
    #[arg(long, default_value_t = 0)]
    phone_mode: usize,

    /// Underwater amount, 0-100 (enables the stage when > 0)
    #[arg(long, default_value_t = 0.0)]
    underwater: f32,

    /// Enable the delay stage
    #[arg(long)]
    delay: bool,

    /// Delay time in milliseconds
    #[arg(long, default_value_t = 250.0)]
    delay_time: f32,

    /// Delay feedback, 0-100
    #[arg(long, default_value_t = 35.0)]
    delay_feedback: f32,

    /// Delay mix, 0-100
    #[arg(long, default_value_t = 40.0)]
    delay_mix: f32,

    /// Ping-pong delay routing
    #[arg(long)]
    ping_pong: bool,

    /// Sync the delay to --bpm instead of --delay-time
    #[arg(long)]
    sync: bool,

    /// Tempo used with --sync
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    /// Delay division index with --sync (0=1/1 .. 12=1/16 T)
    #[arg(long, default_value_t = 4)]
    division: usize,

    /// Output gain in dB
    #[arg(long, default_value_t = 0.0)]
    output_gain: f32,

    /// Cable hum amount, 0-1
    #[arg(long, default_value_t = 0.0)]
    hum: f32,

    /// Extra seconds of silence rendered after the file, for delay tails
    #[arg(long, default_value_t = 0.0)]
    tail: f32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let reader = match hound::WavReader::open(&cli.input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failed to open {}: {e}", cli.input);
            return ExitCode::FAILURE;
        }
    };

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let sample_rate = spec.sample_rate;
    if channels == 0 || channels > 2 {
        eprintln!("unsupported channel count: {channels}");
        return ExitCode::FAILURE;
    }

    eprintln!(
        "input: {} ch, {} Hz, {}-bit, {} samples/ch",
        channels,
        sample_rate,
        spec.bits_per_sample,
        reader.len() as usize / channels
    );

    // Read samples as f32 regardless of the source format.
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
        }
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
    }
    .unwrap_or_else(|e| {
        eprintln!("failed to read samples: {e}");
        std::process::exit(1);
    });

    // Deinterleave, then pad for the requested tail.
    let n_frames = samples.len() / channels;
    let tail_frames = (cli.tail * sample_rate as f32) as usize;
    let total = n_frames + tail_frames;
    let mut left = vec![0.0f32; total];
    let mut right = vec![0.0f32; total];
    for i in 0..n_frames {
        left[i] = samples[i * channels];
        right[i] = samples[i * channels + channels - 1];
    }

    let mut in_metrics = RunningMetrics::new();
    in_metrics.push_slice(&left[..n_frames]);
    in_metrics.push_slice(&right[..n_frames]);

    let params = EngineParams {
        saturation: cli.saturation / 100.0,
        saturation_enabled: cli.saturation > 0.0,
        phone: cli.phone / 100.0,
        phone_enabled: cli.phone > 0.0,
        phone_mode: PhoneMode::from_index(cli.phone_mode),
        underwater: cli.underwater / 100.0,
        underwater_enabled: cli.underwater > 0.0,
        delay_time_ms: cli.delay_time,
        delay_feedback: cli.delay_feedback / 100.0,
        delay_mix: cli.delay_mix / 100.0,
        delay_enabled: cli.delay,
        delay_ping_pong: cli.ping_pong,
        delay_sync: cli.sync,
        delay_division: DelayDivision::from_index(cli.division),
        output_gain_db: cli.output_gain,
        output_enabled: true,
    };

    let mut engine = AdlibEngine::new();
    engine.prepare(sample_rate as f32, BLOCK);
    engine
        .hum_control()
        .store(cli.hum.clamp(0.0, 1.0), Ordering::Relaxed);

    let bpm = cli.sync.then_some(cli.bpm);
    for (cl, cr) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
        engine.process_block(cl, Some(cr), &params, bpm);
    }

    let mut out_metrics = RunningMetrics::new();
    out_metrics.push_slice(&left);
    out_metrics.push_slice(&right);

    // Write output in the source channel count, 32-bit float.
    let out_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let result = hound::WavWriter::create(&cli.output, out_spec).and_then(|mut writer| {
        for i in 0..total {
            writer.write_sample(left[i])?;
            if channels == 2 {
                writer.write_sample(right[i])?;
            }
        }
        writer.finalize()
    });
    if let Err(e) = result {
        eprintln!("failed to write {}: {e}", cli.output);
        return ExitCode::FAILURE;
    }

    eprintln!(
        "in:  rms {:.4}  peak {:.4}",
        in_metrics.rms(),
        in_metrics.peak()
    );
    eprintln!(
        "out: rms {:.4}  peak {:.4}",
        out_metrics.rms(),
        out_metrics.peak()
    );
    eprintln!("wrote {} ({} samples/ch)", cli.output, total);

    ExitCode::SUCCESS
}
