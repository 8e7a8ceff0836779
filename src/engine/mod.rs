//! Audio Engine Module
//!
//! Everything on the PCM side of the stretch engine:
//! - Audio buffer management
//! - Container decode/encode (WAV, optional MP3)

pub mod buffer;
pub mod io;

pub use buffer::{AudioBuffer, DEFAULT_SAMPLE_RATE};
pub use io::{
    decode_audio_bytes, decode_wav_bytes, encode_wav_bytes, export_audio,
    generate_stereo_test_tone, generate_test_tone, import_audio, AudioContainer, ExportFormat,
};
