//! Stretch Orchestrator
//!
//! Drives one stretch end to end: validates the request, resolves the
//! strategy, then runs each channel through window, FFT, frame processor,
//! inverse FFT and overlap-add before trimming to the exact output length.
//!
//! Every call plans its own FFTs and allocates its own buffers, so a single
//! `Stretcher` can be shared between threads.

use rustfft::num_complex::Complex;

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, StretchError};
use crate::stretch::fft::RealFft;
use crate::stretch::overlap_add::OutputAccumulator;
use crate::stretch::params::{FrameLayout, StretchConfig};
use crate::stretch::strategy::{StrategyRegistry, StretchStrategy};
use crate::stretch::window::HannWindow;

/// Time-stretch engine bound to a strategy registry
#[derive(Debug, Clone, Default)]
pub struct Stretcher {
    registry: StrategyRegistry,
}

impl Stretcher {
    /// Engine with the default registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Stretch every channel of `buffer` by `config`
    ///
    /// The input is left untouched. The result has the same channel count and
    /// sample rate, and exactly `config.output_len(buffer.len())` samples per
    /// channel.
    pub fn stretch(&self, buffer: &AudioBuffer, config: &StretchConfig) -> Result<AudioBuffer> {
        let layout = config.layout()?;
        check_input(buffer)?;
        let strategy = self.registry.resolve(config.algorithm)?;

        let input_len = buffer.len();
        let output_len = config.output_len(input_len);

        let span = tracing::info_span!(
            "stretch",
            ratio = config.ratio,
            quality = %config.quality,
            algorithm = config.algorithm,
            channels = buffer.channels(),
            input_len = input_len
        );
        let _guard = span.enter();

        tracing::debug!(
            frame_size = layout.frame_size,
            analysis_hop = layout.analysis_hop,
            synthesis_hop = layout.synthesis_hop,
            strategy = strategy.name(),
            output_len,
            "Resolved frame layout"
        );

        let channels = buffer
            .samples
            .iter()
            .map(|channel| stretch_channel(channel, &layout, strategy.as_ref(), output_len))
            .collect::<Result<Vec<_>>>()?;

        let output = AudioBuffer::from_channels(channels, buffer.sample_rate)?;
        if !output.is_finite() {
            return Err(StretchError::processing_failure(
                "stretch produced non-finite samples",
            ));
        }

        tracing::debug!(output_len = output.len(), "Stretch complete");
        Ok(output)
    }

    /// Stretch a single channel
    pub fn stretch_samples(&self, samples: &[f32], config: &StretchConfig) -> Result<Vec<f32>> {
        let buffer = AudioBuffer::mono(samples.to_vec(), crate::engine::DEFAULT_SAMPLE_RATE);
        let mut output = self.stretch(&buffer, config)?;
        Ok(output.samples.swap_remove(0))
    }
}

/// Stretch `buffer` with the default registry
pub fn stretch(buffer: &AudioBuffer, config: &StretchConfig) -> Result<AudioBuffer> {
    Stretcher::new().stretch(buffer, config)
}

/// Stretch one channel of samples with the default registry
pub fn stretch_samples(samples: &[f32], config: &StretchConfig) -> Result<Vec<f32>> {
    Stretcher::new().stretch_samples(samples, config)
}

/// Number of analysis frames needed to cover `padded_len` samples
///
/// The final frame may run past the end; the overhang is zero.
pub fn frame_count(padded_len: usize, layout: &FrameLayout) -> usize {
    if padded_len <= layout.frame_size {
        1
    } else {
        (padded_len - layout.frame_size).div_ceil(layout.analysis_hop) + 1
    }
}

fn check_input(buffer: &AudioBuffer) -> Result<()> {
    if buffer.sample_rate == 0 {
        return Err(StretchError::unsupported_input("sample rate is zero"));
    }
    if buffer.channels() == 0 || buffer.is_empty() {
        return Err(StretchError::unsupported_input("buffer has no samples"));
    }

    let expected = buffer.len();
    if buffer.samples.iter().any(|ch| ch.len() != expected) {
        return Err(StretchError::unsupported_input(
            "channels have different lengths",
        ));
    }
    if !buffer.is_finite() {
        return Err(StretchError::unsupported_input(
            "buffer contains NaN or infinite samples",
        ));
    }

    Ok(())
}

fn stretch_channel(
    input: &[f32],
    layout: &FrameLayout,
    strategy: &dyn StretchStrategy,
    output_len: usize,
) -> Result<Vec<f32>> {
    let n = layout.frame_size;
    let pad = layout.padding();

    let content_len = input.len() + 2 * pad;
    let num_frames = frame_count(content_len, layout);

    // Zero padding on both sides plus the last frame's overhang
    let mut padded = vec![0.0_f32; (num_frames - 1) * layout.analysis_hop + n];
    padded[pad..pad + input.len()].copy_from_slice(input);

    let synthesized_len = (num_frames - 1) * layout.synthesis_hop + n;
    let mut accumulator = OutputAccumulator::with_len(synthesized_len.max(pad + output_len + n));

    let window = HannWindow::new(n);
    let mut fft = RealFft::new(n);
    let mut processor = strategy.frame_processor(layout);

    let mut frame = vec![0.0_f32; n];
    let mut spectrum = vec![Complex::new(0.0_f32, 0.0); layout.num_bins()];

    for t in 0..num_frames {
        let start = t * layout.analysis_hop;
        window.apply_into(&padded[start..start + n], &mut frame);

        fft.forward(&frame, &mut spectrum)?;
        processor.process_frame(&mut spectrum)?;
        fft.inverse(&spectrum, &mut frame)?;

        accumulator.add_frame(t * layout.synthesis_hop, &frame, &window);
    }

    let mut output = accumulator.finish();
    output.truncate(pad + output_len);
    Ok(output.split_off(pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stretch::params::Quality;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * 0.01).sin() * 0.5).collect()
    }

    #[test]
    fn test_frame_count() {
        let layout = FrameLayout::new(2048, 100);
        assert_eq!(frame_count(100, &layout), 1);
        assert_eq!(frame_count(2048, &layout), 1);
        assert_eq!(frame_count(2049, &layout), 2);
        assert_eq!(frame_count(2048 + 512, &layout), 2);
        assert_eq!(frame_count(2048 + 513, &layout), 3);
    }

    #[test_case(1, 100 ; "single sample")]
    #[test_case(10, 200 ; "short doubled")]
    #[test_case(3, 50 ; "short halved")]
    #[test_case(5000, 75 ; "several frames")]
    fn test_output_length_is_exact(len: usize, ratio: u32) {
        let config = StretchConfig::new(ratio, Quality::A, 0);
        let output = stretch_samples(&ramp(len), &config).unwrap();
        assert_eq!(output.len(), config.output_len(len));
    }

    #[test]
    fn test_unity_reproduces_input() {
        let input = ramp(6000);
        let output = stretch_samples(&input, &StretchConfig::default()).unwrap();

        for (a, b) in input.iter().zip(output.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let buffer = AudioBuffer::mono(ramp(3000), 44100);
        let before = buffer.clone();
        stretch(&buffer, &StretchConfig::new(150, Quality::A, 0)).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_silence_stays_silent() {
        let output = stretch_samples(&vec![0.0; 3000], &StretchConfig::new(75, Quality::A, 0)).unwrap();
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_rejects_unusable_input() {
        let config = StretchConfig::default();

        let err = stretch(&AudioBuffer::mono(Vec::new(), 44100), &config).unwrap_err();
        assert!(matches!(err, StretchError::UnsupportedInput { .. }));

        let err = stretch(&AudioBuffer::mono(vec![0.1; 10], 0), &config).unwrap_err();
        assert!(matches!(err, StretchError::UnsupportedInput { .. }));

        let err = stretch_samples(&[0.0, f32::NAN, 0.0], &config).unwrap_err();
        assert!(matches!(err, StretchError::UnsupportedInput { .. }));

        let ragged = AudioBuffer {
            samples: vec![vec![0.0; 10], vec![0.0; 9]],
            sample_rate: 44100,
        };
        assert!(stretch(&ragged, &config).is_err());
    }

    #[test]
    fn test_parameters_checked_before_input() {
        let err = stretch(
            &AudioBuffer::mono(Vec::new(), 44100),
            &StretchConfig::new(201, Quality::A, 0),
        )
        .unwrap_err();
        assert!(matches!(err, StretchError::InvalidParameter { name: "ratio", .. }));
    }

    #[test]
    fn test_fallback_algorithm_matches_phase_vocoder() {
        let input = ramp(4000);
        let base = stretch_samples(&input, &StretchConfig::new(125, Quality::A, 0)).unwrap();
        let other = stretch_samples(&input, &StretchConfig::new(125, Quality::A, 11)).unwrap();
        assert_eq!(base, other);
    }
}
