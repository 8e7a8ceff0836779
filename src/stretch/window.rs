//! Analysis/synthesis window
//!
//! One symmetric Hann window is shared by the analysis and synthesis sides
//! of the phase vocoder.

use std::f64::consts::PI;

/// Precomputed Hann window of a fixed length
#[derive(Debug, Clone, PartialEq)]
pub struct HannWindow {
    coefficients: Vec<f32>,
}

impl HannWindow {
    /// Build the window `w[n] = 0.5 - 0.5 * cos(2πn / (N - 1))`
    pub fn new(size: usize) -> Self {
        let coefficients = match size {
            0 => Vec::new(),
            1 => vec![1.0],
            _ => {
                let denom = (size - 1) as f64;
                (0..size)
                    .map(|n| (0.5 - 0.5 * (2.0 * PI * n as f64 / denom).cos()) as f32)
                    .collect()
            }
        };

        Self { coefficients }
    }

    /// Window length
    #[inline]
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Window coefficients
    #[inline]
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Multiply `frame` by the window in place
    ///
    /// Samples past the window length are left untouched.
    pub fn apply(&self, frame: &mut [f32]) {
        for (sample, w) in frame.iter_mut().zip(self.coefficients.iter()) {
            *sample *= w;
        }
    }

    /// Copy `input` into `frame` and window it, zero-filling past the input
    pub fn apply_into(&self, input: &[f32], frame: &mut [f32]) {
        for (i, (out, w)) in frame.iter_mut().zip(self.coefficients.iter()).enumerate() {
            *out = input.get(i).copied().unwrap_or(0.0) * w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_hann_endpoints_and_peak() {
        let window = HannWindow::new(9);
        let w = window.coefficients();

        assert_eq!(window.len(), 9);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-7);
        assert_abs_diff_eq!(w[8], 0.0, epsilon = 1e-7);
        assert_abs_diff_eq!(w[4], 1.0, epsilon = 1e-7);
    }

    #[test]
    fn test_hann_is_symmetric() {
        let window = HannWindow::new(2048);
        let w = window.coefficients();
        for n in 0..1024 {
            assert_abs_diff_eq!(w[n], w[2047 - n], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_degenerate_sizes() {
        assert!(HannWindow::new(0).is_empty());
        assert_eq!(HannWindow::new(1).coefficients(), &[1.0]);
    }

    #[test]
    fn test_apply_is_elementwise() {
        let window = HannWindow::new(5);
        let mut frame = vec![2.0; 5];
        window.apply(&mut frame);

        for (out, w) in frame.iter().zip(window.coefficients()) {
            assert_abs_diff_eq!(*out, 2.0 * w, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_apply_into_zero_pads_short_input() {
        let window = HannWindow::new(5);
        let mut frame = vec![9.0; 5];
        window.apply_into(&[1.0, 1.0, 1.0], &mut frame);

        assert_abs_diff_eq!(frame[2], 1.0, epsilon = 1e-7);
        assert_eq!(frame[3], 0.0);
        assert_eq!(frame[4], 0.0);
    }
}
