//! Real-time vocal ad-lib effect chain.
//!
//! Fixed stage order: saturation -> phone filter -> underwater -> delay
//! -> hum -> output gain/limiter. Block-synchronous: structural
//! parameters and filter coefficients update once per block, continuous
//! parameters stream through per-sample smoothers.
//!
//! Single entry point: `AdlibEngine::process_block`.

pub mod biquad;
pub mod chain;
pub mod delay;
pub mod hum;
pub mod params;
pub mod phone;
pub mod saturation;
pub mod tempo;
pub mod underwater;

pub use chain::AdlibEngine;
pub use params::{EngineParams, PhoneMode};
pub use tempo::DelayDivision;
