//! Real-time DSP primitives shared across the ad-lib FX crates.

pub mod delay_line;
pub mod metrics;
pub mod smoothing;

pub use delay_line::DelayLine;
pub use metrics::RunningMetrics;
pub use smoothing::SmoothedParam;
