//! mpc-stretch - Sampler Time-Stretch Engine
//!
//! Changes the duration of a sample without changing its pitch, using an
//! STFT phase vocoder. Requests follow the MPC2000XL contract: a ratio in
//! percent of the original duration (50-200), a quality tier (A, B, C)
//! selecting the FFT size, and an algorithm index (0-17).
//!
//! # Architecture
//!
//! - `stretch`: window, FFT, phase vocoder, overlap-add and the orchestrator
//!   that ties them together
//! - `engine`: audio buffers and WAV/MP3 container I/O
//! - `service`: request validation and the stretch endpoint flow
//! - `analysis`: objective measurements (level, dominant frequency)
//!
//! ```
//! use mpc_stretch::{stretch_samples, Quality, StretchConfig};
//!
//! let input = vec![0.0_f32; 4410];
//! let output = stretch_samples(&input, &StretchConfig::new(150, Quality::A, 0)).unwrap();
//! assert_eq!(output.len(), 6615);
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod stretch;

pub use config::EngineConfig;
pub use engine::AudioBuffer;
pub use error::{Result, StretchError};
pub use service::{process_time_stretch, TimeStretchParams, TimeStretchResponse};
pub use stretch::{stretch, stretch_samples, Quality, StretchConfig, Stretcher};
