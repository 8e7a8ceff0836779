//! Phase Vocoder Core
//!
//! Per analysis frame:
//!
//! 1. Split the spectrum into magnitude and wrapped phase
//! 2. Compare each bin's phase advance with the advance expected at its
//!    centre frequency over one analysis hop
//! 3. Turn the wrapped deviation into an instantaneous frequency
//! 4. Integrate that frequency over one synthesis hop to get the new phase
//! 5. Lock every non-peak bin to its nearest magnitude peak so the bins that
//!    make up one partial stay phase-coherent with each other
//!
//! Magnitudes pass through untouched. Phase arithmetic is done in f64 and the
//! accumulated synthesis phase is re-wrapped every frame so long inputs do not
//! lose precision.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;

use crate::error::{Result, StretchError};
use crate::stretch::params::FrameLayout;

const TWO_PI: f64 = 2.0 * PI;

/// Wrap a phase into (-π, π]
#[inline]
pub fn principal_arg(phase: f64) -> f64 {
    let wrapped = phase - TWO_PI * ((phase + PI) / TWO_PI).floor();
    if wrapped <= -PI {
        wrapped + TWO_PI
    } else {
        wrapped
    }
}

/// Working state for one analysis frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext {
    /// |X[k]|
    pub magnitude: Vec<f32>,
    /// arg X[k], wrapped
    pub phase: Vec<f64>,
    /// Phase advance minus the expected advance, wrapped into (-π, π]
    pub phase_deviation: Vec<f64>,
    /// Estimated frequency in radians per sample
    pub instantaneous_frequency: Vec<f64>,
    /// Phase used for resynthesis
    pub synthesis_phase: Vec<f64>,
}

impl FrameContext {
    /// Extract magnitude and phase from one frame's spectrum
    pub fn analyze(spectrum: &[Complex<f32>]) -> Self {
        let bins = spectrum.len();
        Self {
            magnitude: spectrum.iter().map(|c| c.norm()).collect(),
            phase: spectrum
                .iter()
                .map(|c| (c.im as f64).atan2(c.re as f64))
                .collect(),
            phase_deviation: vec![0.0; bins],
            instantaneous_frequency: vec![0.0; bins],
            synthesis_phase: vec![0.0; bins],
        }
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.magnitude.len()
    }

    /// Write magnitude and synthesis phase back as complex bins
    pub fn synthesize(&self, spectrum: &mut [Complex<f32>]) {
        for ((bin, &mag), &phase) in spectrum
            .iter_mut()
            .zip(self.magnitude.iter())
            .zip(self.synthesis_phase.iter())
        {
            *bin = Complex::from_polar(mag, phase as f32);
        }
    }
}

/// Bins whose magnitude is a local maximum
///
/// Edge bins compare against their single neighbour. Plateaus report their
/// lowest bin. Silent bins are never peaks.
pub fn spectral_peaks(magnitude: &[f32]) -> Vec<usize> {
    let last = magnitude.len().saturating_sub(1);
    (0..magnitude.len())
        .filter(|&k| {
            let m = magnitude[k];
            let above_left = k == 0 || m > magnitude[k - 1];
            let above_right = k == last || m >= magnitude[k + 1];
            m > 0.0 && above_left && above_right
        })
        .collect()
}

/// Identity phase locking
///
/// Every bin between DC and Nyquist that is not itself a peak takes the
/// synthesis phase of its nearest peak, offset by their analysis phase
/// difference. Peaks keep their propagated phase. Equidistant bins follow the
/// lower peak.
fn lock_to_peaks(frame: &mut FrameContext) {
    let peaks = spectral_peaks(&frame.magnitude);
    if peaks.is_empty() {
        return;
    }

    let propagated = frame.synthesis_phase.clone();
    let nyquist = frame.num_bins() - 1;
    let mut nearest = 0;

    for k in 1..nyquist {
        while nearest + 1 < peaks.len()
            && peaks[nearest + 1].abs_diff(k) < peaks[nearest].abs_diff(k)
        {
            nearest += 1;
        }

        let peak = peaks[nearest];
        if peak != k {
            frame.synthesis_phase[k] =
                principal_arg(propagated[peak] + frame.phase[k] - frame.phase[peak]);
        }
    }
}

/// Phases carried from one frame to the next
#[derive(Debug, Clone)]
struct PhaseCarry {
    analysis_phase: Vec<f64>,
    synthesis_phase: Vec<f64>,
}

/// Phase propagation state across the frames of one channel
#[derive(Debug, Clone)]
pub struct PhaseVocoder {
    analysis_hop: f64,
    synthesis_hop: f64,
    /// 2πk/N per bin
    bin_frequency: Vec<f64>,
    carry: Option<PhaseCarry>,
}

impl PhaseVocoder {
    pub fn new(layout: &FrameLayout) -> Self {
        let n = layout.frame_size as f64;
        let bin_frequency = (0..layout.num_bins())
            .map(|k| TWO_PI * k as f64 / n)
            .collect();

        Self {
            analysis_hop: layout.analysis_hop as f64,
            synthesis_hop: layout.synthesis_hop as f64,
            bin_frequency,
            carry: None,
        }
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.bin_frequency.len()
    }

    /// Forget the previous frame; the next frame is treated as the first
    pub fn reset(&mut self) {
        self.carry = None;
    }

    /// Compute the synthesis phase for `frame` and remember it as carry-in
    pub fn advance(&mut self, frame: &mut FrameContext) -> Result<()> {
        let bins = self.num_bins();
        if frame.num_bins() != bins {
            return Err(StretchError::processing_failure(format!(
                "frame has {} bins, vocoder expects {}",
                frame.num_bins(),
                bins
            )));
        }

        match &self.carry {
            None => {
                frame.synthesis_phase.copy_from_slice(&frame.phase);
                frame.phase_deviation.fill(0.0);
                frame
                    .instantaneous_frequency
                    .copy_from_slice(&self.bin_frequency);
            }
            Some(carry) => {
                let nyquist = bins - 1;
                for k in 0..bins {
                    if k == 0 || k == nyquist {
                        // Real-valued bins: keep their sign, no rotation
                        frame.phase_deviation[k] = 0.0;
                        frame.instantaneous_frequency[k] = self.bin_frequency[k];
                        frame.synthesis_phase[k] = frame.phase[k];
                        continue;
                    }

                    let omega = self.bin_frequency[k];
                    let delta = frame.phase[k] - carry.analysis_phase[k];
                    let deviation = principal_arg(delta - omega * self.analysis_hop);
                    let true_freq = omega + deviation / self.analysis_hop;

                    frame.phase_deviation[k] = deviation;
                    frame.instantaneous_frequency[k] = true_freq;
                    frame.synthesis_phase[k] =
                        principal_arg(carry.synthesis_phase[k] + true_freq * self.synthesis_hop);
                }

                lock_to_peaks(frame);
            }
        }

        self.carry = Some(PhaseCarry {
            analysis_phase: frame.phase.clone(),
            synthesis_phase: frame.synthesis_phase.clone(),
        });

        Ok(())
    }

    /// Analyze, advance and resynthesize one spectrum in place
    pub fn process(&mut self, spectrum: &mut [Complex<f32>]) -> Result<FrameContext> {
        let mut frame = FrameContext::analyze(spectrum);
        self.advance(&mut frame)?;
        frame.synthesize(spectrum);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stretch::fft::RealFft;
    use crate::stretch::window::HannWindow;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test_case(0.0, 0.0 ; "zero")]
    #[test_case(PI, PI ; "pi stays")]
    #[test_case(-PI, PI ; "minus pi maps to pi")]
    #[test_case(3.0 * PI, PI ; "three pi")]
    #[test_case(TWO_PI + 0.5, 0.5 ; "one turn above")]
    #[test_case(-TWO_PI - 0.5, -0.5 ; "one turn below")]
    #[test_case(1000.25, 1000.25 - 159.0 * TWO_PI ; "many turns")]
    fn test_principal_arg(input: f64, expected: f64) {
        let wrapped = principal_arg(input);
        assert!(wrapped > -PI && wrapped <= PI, "{} out of range", wrapped);
        assert_abs_diff_eq!(wrapped, expected, epsilon = 1e-9);
    }

    fn sine_spectrum(fft: &mut RealFft, cycles_per_frame: f64, start: usize) -> Vec<Complex<f32>> {
        let n = fft.size();
        let window = HannWindow::new(n);
        let raw: Vec<f32> = (0..n)
            .map(|i| (TWO_PI * cycles_per_frame * (start + i) as f64 / n as f64).sin() as f32)
            .collect();
        let mut frame = vec![0.0; n];
        window.apply_into(&raw, &mut frame);

        let mut spectrum = vec![Complex::new(0.0, 0.0); fft.num_bins()];
        fft.forward(&frame, &mut spectrum).unwrap();
        spectrum
    }

    #[test]
    fn test_first_frame_keeps_analysis_phase() {
        let layout = FrameLayout::new(256, 150);
        let mut fft = RealFft::new(256);
        let mut vocoder = PhaseVocoder::new(&layout);

        let mut spectrum = sine_spectrum(&mut fft, 10.3, 0);
        let frame = vocoder.process(&mut spectrum).unwrap();

        assert_eq!(frame.synthesis_phase, frame.phase);
    }

    #[test]
    fn test_estimates_off_bin_frequency() {
        let n = 1024;
        let layout = FrameLayout::new(n, 100);
        let mut fft = RealFft::new(n);
        let mut vocoder = PhaseVocoder::new(&layout);

        let cycles = 40.3;
        let mut first = sine_spectrum(&mut fft, cycles, 0);
        let mut second = sine_spectrum(&mut fft, cycles, layout.analysis_hop);
        vocoder.process(&mut first).unwrap();
        let frame = vocoder.process(&mut second).unwrap();

        let expected = TWO_PI * cycles / n as f64;
        assert_abs_diff_eq!(frame.instantaneous_frequency[40], expected, epsilon = 1e-4);
        assert_abs_diff_eq!(frame.instantaneous_frequency[41], expected, epsilon = 1e-4);
    }

    #[test]
    fn test_unity_hop_tracks_analysis_phase() {
        let layout = FrameLayout::new(512, 100);
        let mut fft = RealFft::new(512);
        let mut vocoder = PhaseVocoder::new(&layout);

        let mut frame = None;
        for t in 0..4 {
            let mut spectrum = sine_spectrum(&mut fft, 17.7, t * layout.analysis_hop);
            frame = Some(vocoder.process(&mut spectrum).unwrap());
        }

        let frame = frame.unwrap();
        for k in 1..layout.num_bins() - 1 {
            let diff = principal_arg(frame.synthesis_phase[k] - frame.phase[k]);
            assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_stretch_advances_phase_by_synthesis_hop() {
        let n = 512;
        let layout = FrameLayout::new(n, 200);
        let mut fft = RealFft::new(n);
        let mut vocoder = PhaseVocoder::new(&layout);

        // Exactly on bin 12: the per-hop advance is known in closed form
        let mut first = sine_spectrum(&mut fft, 12.0, 0);
        let mut second = sine_spectrum(&mut fft, 12.0, layout.analysis_hop);
        let f0 = vocoder.process(&mut first).unwrap();
        let f1 = vocoder.process(&mut second).unwrap();

        let omega = TWO_PI * 12.0 / n as f64;
        let advance = principal_arg(f1.synthesis_phase[12] - f0.synthesis_phase[12]);
        assert_abs_diff_eq!(
            advance,
            principal_arg(omega * layout.synthesis_hop as f64),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_dc_and_nyquist_are_not_rotated() {
        let layout = FrameLayout::new(16, 150);
        let mut vocoder = PhaseVocoder::new(&layout);
        let bins = layout.num_bins();

        let mut spectrum = vec![Complex::new(1.0_f32, 0.0); bins];
        vocoder.process(&mut spectrum).unwrap();

        let mut spectrum = vec![Complex::new(1.0_f32, 0.0); bins];
        spectrum[0] = Complex::new(-2.0, 0.0);
        spectrum[bins - 1] = Complex::new(3.0, 0.0);
        let frame = vocoder.process(&mut spectrum).unwrap();

        assert_abs_diff_eq!(frame.synthesis_phase[0], PI, epsilon = 1e-9);
        assert_abs_diff_eq!(frame.synthesis_phase[bins - 1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(spectrum[0].re, -2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(spectrum[bins - 1].re, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_spectral_peaks() {
        assert_eq!(spectral_peaks(&[3.0, 1.0, 2.0, 2.0, 0.5, 4.0]), vec![0, 2, 5]);
        assert_eq!(spectral_peaks(&[0.0, 0.0, 0.0]), Vec::<usize>::new());
        assert!(spectral_peaks(&[]).is_empty());
    }

    #[test]
    fn test_neighbours_locked_to_peak() {
        let n = 512;
        let layout = FrameLayout::new(n, 200);
        let mut fft = RealFft::new(n);
        let mut vocoder = PhaseVocoder::new(&layout);

        let mut first = sine_spectrum(&mut fft, 12.0, 0);
        vocoder.process(&mut first).unwrap();
        let mut second = sine_spectrum(&mut fft, 12.0, layout.analysis_hop);
        let frame = vocoder.process(&mut second).unwrap();

        assert!(spectral_peaks(&frame.magnitude).contains(&12));
        for k in [10, 11, 13, 14] {
            let synth_offset = frame.synthesis_phase[k] - frame.synthesis_phase[12];
            let analysis_offset = frame.phase[k] - frame.phase[12];
            assert_abs_diff_eq!(
                principal_arg(synth_offset - analysis_offset),
                0.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_dc_peak_keeps_leakage_bins_on_analysis_phase() {
        let n = 256;
        let layout = FrameLayout::new(n, 150);
        let mut fft = RealFft::new(n);
        let window = HannWindow::new(n);
        let mut vocoder = PhaseVocoder::new(&layout);

        let mut frame = vec![0.0; n];
        window.apply_into(&vec![0.5; n], &mut frame);

        let mut last = None;
        for _ in 0..3 {
            let mut spectrum = vec![Complex::new(0.0, 0.0); fft.num_bins()];
            fft.forward(&frame, &mut spectrum).unwrap();
            last = Some(vocoder.process(&mut spectrum).unwrap());
        }

        let last = last.unwrap();
        assert_eq!(spectral_peaks(&last.magnitude)[0], 0);
        assert_abs_diff_eq!(
            principal_arg(last.synthesis_phase[1] - last.phase[1]),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_bin_count_mismatch_is_processing_failure() {
        let layout = FrameLayout::new(64, 100);
        let mut vocoder = PhaseVocoder::new(&layout);
        let mut spectrum = vec![Complex::new(0.0_f32, 0.0); 10];

        let err = vocoder.process(&mut spectrum).unwrap_err();
        assert!(matches!(err, StretchError::ProcessingFailure { .. }));
    }

    #[test]
    fn test_reset_restarts_phase_propagation() {
        let layout = FrameLayout::new(64, 200);
        let mut vocoder = PhaseVocoder::new(&layout);
        let bins = layout.num_bins();

        let spectrum: Vec<Complex<f32>> =
            (0..bins).map(|k| Complex::from_polar(1.0, k as f32 * 0.1)).collect();
        vocoder.process(&mut spectrum.clone()).unwrap();
        vocoder.reset();
        let frame = vocoder.process(&mut spectrum.clone()).unwrap();

        assert_eq!(frame.synthesis_phase, frame.phase);
    }
}
