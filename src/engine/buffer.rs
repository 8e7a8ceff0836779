//! Audio Buffer Management
//!
//! Decoded PCM as the stretch engine sees it: non-interleaved 32-bit float
//! channels plus a sample rate. Buffers are owned by the caller; the engine
//! only ever reads them and hands back a new buffer.

use crate::error::{Result, StretchError};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate used when a buffer is built without one (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

// ============================================================================
// Audio Buffer
// ============================================================================

/// Decoded audio, one `Vec<f32>` per channel
///
/// # Example
/// ```
/// use mpc_stretch::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4], 2, 44100).unwrap();
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer with the given channel count and length
    pub fn new(num_samples: usize, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; channels],
            sample_rate,
        }
    }

    /// Wrap a single channel of samples
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: vec![samples],
            sample_rate,
        }
    }

    /// Build a buffer from per-channel vectors
    ///
    /// All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(StretchError::unsupported_input("buffer has no channels"));
        }

        let expected = channels[0].len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(StretchError::unsupported_input(format!(
                "channel {} has {} samples, expected {}",
                index,
                channel.len(),
                expected
            )));
        }

        Ok(Self {
            samples: channels,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `channels` - Number of interleaved channels
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(StretchError::unsupported_input("channel count must be at least 1"));
        }

        if interleaved.len() % channels != 0 {
            return Err(StretchError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(num_samples); channels];

        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        if num_channels == 0 || num_samples == 0 {
            return Vec::new();
        }

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Average all channels into a new mono buffer
    ///
    /// Mono input is returned as a copy. Channels of unequal length fold over
    /// the shortest one.
    pub fn fold_to_mono(&self) -> AudioBuffer {
        let channels = self.channels();
        if channels <= 1 {
            return self.clone();
        }

        let shortest = self.samples.iter().map(Vec::len).min().unwrap_or(0);
        let scale = 1.0 / channels as f32;
        let folded = (0..shortest)
            .map(|i| self.samples.iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect();

        AudioBuffer::mono(folded, self.sample_rate)
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(0, 1, DEFAULT_SAMPLE_RATE)
    }
}

// ============================================================================
// Tests
// ============================================================================
