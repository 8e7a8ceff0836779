//! Audio measurement utilities
//!
//! Objective checks used by the CLI `analyze` command and by the stretch
//! tests: level, DC offset, dominant frequency and spectral distance.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use crate::engine::AudioBuffer;

/// FFT size used for dominant frequency estimates
pub const DEFAULT_ANALYSIS_FFT_SIZE: usize = 8192;

/// Convert linear amplitude to decibels
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Convert decibels to linear amplitude
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Calculate RMS (Root Mean Square) of samples
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Calculate peak (maximum absolute value) of samples
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Calculate DC offset (mean of samples)
pub fn calculate_dc_offset(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| s as f64).sum();
    (sum / samples.len() as f64) as f32
}

fn hann(i: usize, len: usize) -> f32 {
    if len < 2 {
        return 1.0;
    }
    0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32).cos()
}

/// Magnitudes of the non-negative half of a Hann-windowed FFT of `samples`
///
/// Input longer than `fft_size` is truncated, shorter input is zero padded.
pub fn magnitude_spectrum(samples: &[f32], fft_size: usize) -> Vec<f32> {
    if fft_size == 0 {
        return Vec::new();
    }

    let used = samples.len().min(fft_size);
    let mut bins: Vec<Complex<f32>> = (0..fft_size)
        .map(|i| {
            let s = if i < used { samples[i] * hann(i, used) } else { 0.0 };
            Complex::new(s, 0.0)
        })
        .collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut bins);

    bins.iter().take(fft_size / 2 + 1).map(|c| c.norm()).collect()
}

/// Strongest non-DC frequency in Hz
///
/// Analyzes up to `fft_size` samples from the middle of the signal and
/// refines the peak bin by parabolic interpolation. Returns `None` for empty
/// or silent input.
pub fn dominant_frequency(samples: &[f32], sample_rate: u32, fft_size: usize) -> Option<f32> {
    if samples.is_empty() || sample_rate == 0 || fft_size < 4 {
        return None;
    }

    let used = samples.len().min(fft_size);
    let start = (samples.len() - used) / 2;
    let spectrum = magnitude_spectrum(&samples[start..start + used], fft_size);

    let (peak_bin, &peak) = spectrum
        .iter()
        .enumerate()
        .take(spectrum.len() - 1)
        .skip(1)
        .max_by(|a, b| a.1.total_cmp(b.1))?;

    if peak <= f32::EPSILON {
        return None;
    }

    let (left, right) = (spectrum[peak_bin - 1], spectrum[peak_bin + 1]);
    let curvature = left - 2.0 * peak + right;
    let offset = if curvature.abs() > f32::EPSILON {
        0.5 * (left - right) / curvature
    } else {
        0.0
    };

    Some((peak_bin as f32 + offset) * sample_rate as f32 / fft_size as f32)
}

/// Relative magnitude-spectrum error of `candidate` against `reference`
///
/// Both signals are cut into half-overlapping Hann frames of `fft_size`
/// samples. The result is `sqrt(Σ(|R|-|C|)² / Σ|R|²)` over all frames and
/// bins, so 0 means identical spectra. Silent references give 0 when the
/// candidate is silent too, infinity otherwise.
pub fn spectral_distance(reference: &[f32], candidate: &[f32], fft_size: usize) -> f32 {
    let len = reference.len().min(candidate.len());
    if len == 0 || fft_size == 0 {
        return 0.0;
    }

    let hop = (fft_size / 2).max(1);
    let mut error = 0.0_f64;
    let mut energy = 0.0_f64;
    let mut start = 0;

    loop {
        let end = (start + fft_size).min(len);
        let r = magnitude_spectrum(&reference[start..end], fft_size);
        let c = magnitude_spectrum(&candidate[start..end], fft_size);

        for (&a, &b) in r.iter().zip(c.iter()) {
            error += ((a - b) as f64).powi(2);
            energy += (a as f64).powi(2);
        }

        if end == len {
            break;
        }
        start += hop;
    }

    match (energy > 0.0, error > 0.0) {
        (true, _) => (error / energy).sqrt() as f32,
        (false, false) => 0.0,
        (false, true) => f32::INFINITY,
    }
}

/// Summary measurements for one buffer
#[derive(Debug, Clone, Serialize)]
pub struct AudioAnalysis {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub samples_per_channel: usize,
    pub rms_db: f32,
    pub peak_db: f32,
    pub dc_offset: f32,
    /// Dominant frequency of the channel mix, if any
    pub dominant_frequency: Option<f32>,
}

impl AudioAnalysis {
    /// Measure `buffer`; multi-channel input is measured on its mono mix
    pub fn analyze(buffer: &AudioBuffer) -> Self {
        let mono = buffer.fold_to_mono();
        let samples = mono.samples.first().map(Vec::as_slice).unwrap_or(&[]);

        Self {
            duration_secs: buffer.duration_secs(),
            sample_rate: buffer.sample_rate,
            channels: buffer.channels(),
            samples_per_channel: buffer.len(),
            rms_db: linear_to_db(calculate_rms(samples)),
            peak_db: linear_to_db(calculate_peak(samples)),
            dc_offset: calculate_dc_offset(samples),
            dominant_frequency: dominant_frequency(
                samples,
                buffer.sample_rate,
                DEFAULT_ANALYSIS_FFT_SIZE,
            ),
        }
    }

    /// Check if audio is silent (RMS below threshold)
    pub fn is_silent(&self, threshold_db: f32) -> bool {
        self.rms_db < threshold_db
    }

    /// Generate a summary string for display
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Duration: {:.3}s ({} samples) | {} ch @ {} Hz\n\
             RMS: {:.1} dBFS | Peak: {:.1} dBFS | DC Offset: {:.4}",
            self.duration_secs,
            self.samples_per_channel,
            self.channels,
            self.sample_rate,
            self.rms_db,
            self.peak_db,
            self.dc_offset
        );

        if let Some(freq) = self.dominant_frequency {
            s.push_str(&format!("\nDominant Frequency: {:.1} Hz", freq));
        }

        s
    }
}
