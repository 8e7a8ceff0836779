//! Real-signal FFT over power-of-two frame sizes
//!
//! Wraps a pair of cached `rustfft` plans. The forward transform returns the
//! non-negative frequency half (N/2 + 1 bins); the inverse rebuilds the
//! Hermitian spectrum and returns N real samples scaled by 1/N.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{Result, StretchError};

/// Round `n` to the nearest power of two (ties go up)
pub fn nearest_power_of_two(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    if n.is_power_of_two() {
        return n;
    }

    let upper = n.next_power_of_two();
    let lower = upper / 2;
    if n - lower < upper - n {
        lower
    } else {
        upper
    }
}

/// Forward/inverse FFT for one frame size
pub struct RealFft {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    work: Vec<Complex<f32>>,
}

impl std::fmt::Debug for RealFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealFft").field("size", &self.size).finish()
    }
}

impl RealFft {
    /// Plan transforms for `requested_size`, rounded to a power of two
    pub fn new(requested_size: usize) -> Self {
        let size = nearest_power_of_two(requested_size.max(2));
        let mut planner = FftPlanner::new();

        Self {
            size,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
            work: vec![Complex::new(0.0, 0.0); size],
        }
    }

    /// Frame size N
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of non-negative frequency bins (N/2 + 1)
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Transform `frame` (length N) into `spectrum` (length N/2 + 1)
    pub fn forward(&mut self, frame: &[f32], spectrum: &mut [Complex<f32>]) -> Result<()> {
        self.check_len("forward input", frame.len(), self.size)?;
        self.check_len("forward output", spectrum.len(), self.num_bins())?;

        for (slot, &sample) in self.work.iter_mut().zip(frame.iter()) {
            *slot = Complex::new(sample, 0.0);
        }
        self.forward.process(&mut self.work);
        spectrum.copy_from_slice(&self.work[..spectrum.len()]);

        Ok(())
    }

    /// Transform `spectrum` (length N/2 + 1) back into `frame` (length N)
    pub fn inverse(&mut self, spectrum: &[Complex<f32>], frame: &mut [f32]) -> Result<()> {
        self.check_len("inverse input", spectrum.len(), self.num_bins())?;
        self.check_len("inverse output", frame.len(), self.size)?;

        let n = self.size;
        let half = n / 2;

        self.work[..=half].copy_from_slice(spectrum);
        for k in 1..half {
            self.work[n - k] = spectrum[k].conj();
        }
        self.inverse.process(&mut self.work);

        // Imaginary parts of DC/Nyquist only leak into the imaginary output
        let scale = 1.0 / n as f32;
        for (out, value) in frame.iter_mut().zip(self.work.iter()) {
            *out = value.re * scale;
        }

        Ok(())
    }

    fn check_len(&self, what: &str, actual: usize, expected: usize) -> Result<()> {
        if actual != expected {
            return Err(StretchError::processing_failure(format!(
                "FFT {} length {} does not match frame size {} (expected {})",
                what, actual, self.size, expected
            )));
        }
        Ok(())
    }
}
