//! Time-stretch engine
//!
//! Phase-vocoder stretching parameterized by the sampler's ratio, quality
//! tier and algorithm index.

pub mod fft;
pub mod orchestrator;
pub mod overlap_add;
pub mod params;
pub mod strategy;
pub mod vocoder;
pub mod window;

pub use orchestrator::{frame_count, stretch, stretch_samples, Stretcher};
pub use params::{
    validate_algorithm, validate_ratio, FrameLayout, Quality, StretchConfig, MAX_ALGORITHM_INDEX,
    MAX_RATIO_PERCENT, MIN_RATIO_PERCENT, UNITY_RATIO_PERCENT,
};
pub use strategy::{
    AlgorithmInfo, PhaseVocoderStrategy, SpectralFrameProcessor, StrategyRegistry,
    StretchStrategy,
};
pub use vocoder::{principal_arg, spectral_peaks, FrameContext, PhaseVocoder};
pub use window::HannWindow;
