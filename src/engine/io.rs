//! Audio file I/O
//!
//! Container decode/encode around the stretch engine. WAV is always
//! available through `hound`; MP3 goes through `minimp3` under the default
//! `mp3` feature.
//!
//! Audio keeps its own sample rate; nothing is resampled on import or export.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, StretchError};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (32 is written as float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::pcm16()
    }
}

impl ExportFormat {
    /// Create a new export format with the given bit depth
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 16-bit integer PCM
    pub fn pcm16() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 24-bit integer PCM
    pub fn pcm24() -> Self {
        ExportFormat { bit_depth: 24 }
    }

    /// 32-bit float
    pub fn float32() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

/// Container formats accepted for uploaded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioContainer {
    Wav,
    Mp3,
}

impl AudioContainer {
    /// Identify a container from the first bytes of a file
    ///
    /// WAV needs `RIFF....WAVE`; MP3 needs an ID3 tag or an MPEG frame sync.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.len() >= 12 && header.starts_with(b"RIFF") && &header[8..12] == b"WAVE" {
            return Some(AudioContainer::Wav);
        }
        if header.starts_with(b"ID3") {
            return Some(AudioContainer::Mp3);
        }
        if header.len() >= 2 && header[0] == 0xFF && (header[1] & 0xE0) == 0xE0 {
            return Some(AudioContainer::Mp3);
        }
        None
    }
}

/// Decode an in-memory audio file, picking the decoder from its header
pub fn decode_audio_bytes(bytes: &[u8]) -> Result<AudioBuffer> {
    match AudioContainer::sniff(bytes) {
        Some(AudioContainer::Wav) => decode_wav_bytes(bytes),
        Some(AudioContainer::Mp3) => decode_mp3_bytes(bytes),
        None => Err(StretchError::InvalidAudio {
            reason: "not a WAV or MP3 file".to_string(),
            source: None,
        }),
    }
}

/// Decode WAV bytes into an AudioBuffer
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| StretchError::InvalidAudio {
        reason: format!("Failed to open WAV data: {}", e),
        source: Some(Box::new(e)),
    })?;
    read_wav(reader)
}

/// Import an audio file from disk
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is neither WAV nor MP3, or cannot be decoded
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(StretchError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let bytes = std::fs::read(path)?;
    decode_audio_bytes(&bytes)
}

/// Encode an AudioBuffer as a WAV byte stream
pub fn encode_wav_bytes(buffer: &AudioBuffer, format: ExportFormat) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(buffer, &mut cursor, format)?;
    Ok(cursor.into_inner())
}

/// Export an AudioBuffer to a WAV file
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let bytes = encode_wav_bytes(buffer, format)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Generate a mono sine test tone
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;

    let samples = (0..num_samples)
        .map(|i| (angular_freq * i as f64).sin() as f32)
        .collect();

    AudioBuffer::mono(samples, sample_rate)
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate);

    AudioBuffer {
        samples: vec![left.samples[0].clone(), right.samples[0].clone()],
        sample_rate,
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn read_wav<R: std::io::Read>(reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let channels = spec.channels as usize;

    if channels == 0 {
        return Err(StretchError::UnsupportedFormat {
            format: "WAV with zero channels".to_string(),
        });
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    fn collect<T, I>(samples: I, scale: f32, label: &str) -> Result<Vec<f32>>
    where
        T: Into<f64>,
        I: Iterator<Item = hound::Result<T>>,
    {
        samples
            .map(|s| s.map(|v| (v.into() as f32) * scale))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| StretchError::InvalidAudio {
                reason: format!("Failed to read {} samples: {}", label, e),
                source: Some(Box::new(e)),
            })
    }

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| StretchError::InvalidAudio {
                reason: format!("Failed to read float samples: {}", e),
                source: Some(Box::new(e)),
            }),
        SampleFormat::Int => match bits_per_sample {
            8 => collect(reader.samples::<i8>(), 1.0 / 128.0, "8-bit"),
            16 => collect(reader.samples::<i16>(), 1.0 / 32768.0, "16-bit"),
            // 24-bit stored as i32 in hound
            24 => collect(reader.samples::<i32>(), 1.0 / 8388608.0, "24-bit"),
            32 => collect(reader.samples::<i32>(), 1.0 / 2147483648.0, "32-bit int"),
            _ => Err(StretchError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}

fn write_wav<W: std::io::Write + std::io::Seek>(
    buffer: &AudioBuffer,
    writer: W,
    format: ExportFormat,
) -> Result<()> {
    let sample_format = match format.bit_depth {
        16 | 24 => SampleFormat::Int,
        32 => SampleFormat::Float,
        other => {
            return Err(StretchError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", other),
            })
        }
    };

    let spec = WavSpec {
        channels: buffer.channels().max(1) as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format,
    };

    let mut writer = WavWriter::new(writer, spec).map_err(hound_to_io)?;

    for sample in buffer.to_interleaved() {
        match format.bit_depth {
            16 => {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
            24 => {
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
            _ => writer.write_sample(sample).map_err(hound_to_io)?,
        }
    }

    writer.finalize().map_err(hound_to_io)?;
    Ok(())
}

fn hound_to_io(e: hound::Error) -> StretchError {
    match e {
        hound::Error::IoError(io) => StretchError::Io(io),
        other => StretchError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

#[cfg(feature = "mp3")]
fn decode_mp3_bytes(bytes: &[u8]) -> Result<AudioBuffer> {
    use minimp3::{Decoder, Error as Mp3Error, Frame};

    let mut decoder = Decoder::new(Cursor::new(bytes));
    let mut interleaved = Vec::new();
    let mut layout: Option<(usize, u32)> = None;

    loop {
        match decoder.next_frame() {
            Ok(Frame {
                data,
                sample_rate,
                channels,
                ..
            }) => {
                let frame_layout = (channels, sample_rate as u32);
                match layout {
                    None => layout = Some(frame_layout),
                    Some(existing) if existing != frame_layout => {
                        return Err(StretchError::UnsupportedFormat {
                            format: "MP3 with changing channel count or sample rate".to_string(),
                        })
                    }
                    Some(_) => {}
                }
                interleaved.extend(data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(Mp3Error::Eof) => break,
            Err(Mp3Error::SkippedData) => continue,
            Err(e) => {
                return Err(StretchError::InvalidAudio {
                    reason: format!("Failed to decode MP3 frame: {:?}", e),
                    source: None,
                })
            }
        }
    }

    let (channels, sample_rate) = layout.ok_or_else(|| StretchError::InvalidAudio {
        reason: "MP3 contains no audio frames".to_string(),
        source: None,
    })?;

    AudioBuffer::from_interleaved(&interleaved, channels, sample_rate)
}

#[cfg(not(feature = "mp3"))]
fn decode_mp3_bytes(_bytes: &[u8]) -> Result<AudioBuffer> {
    Err(StretchError::UnsupportedFormat {
        format: "MP3 (built without the 'mp3' feature)".to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
