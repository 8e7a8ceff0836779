//! Overlap-Add Reconstructor
//!
//! Synthesized frames are windowed a second time and summed at synthesis-hop
//! offsets. Alongside the signal the accumulator keeps the sum of squared
//! window values at every position, and `finish` divides the two. That
//! normalization holds for any hop, so the ratio never causes amplitude ripple.

use crate::stretch::window::HannWindow;

/// Fraction of the peak window sum below which a position is divided by the
/// floor instead of its own sum
const MIN_WINDOW_SUM_RATIO: f32 = 0.1;

/// Absolute floor for window sum normalization
const WINDOW_SUM_EPSILON: f32 = 1e-6;

/// Output buffer plus per-sample window energy
#[derive(Debug, Clone)]
pub struct OutputAccumulator {
    output: Vec<f32>,
    window_sum: Vec<f32>,
}

impl OutputAccumulator {
    /// Allocate an accumulator of `len` samples
    pub fn with_len(len: usize) -> Self {
        Self {
            output: vec![0.0; len],
            window_sum: vec![0.0; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.output.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Window `frame` and add it at `offset`
    ///
    /// The accumulator grows if the frame would run past its end.
    pub fn add_frame(&mut self, offset: usize, frame: &[f32], window: &HannWindow) {
        let end = offset + frame.len();
        if end > self.output.len() {
            self.output.resize(end, 0.0);
            self.window_sum.resize(end, 0.0);
        }

        let out = &mut self.output[offset..end];
        let sums = &mut self.window_sum[offset..end];
        for (((o, s), &x), &w) in out
            .iter_mut()
            .zip(sums.iter_mut())
            .zip(frame.iter())
            .zip(window.coefficients().iter())
        {
            *o += x * w;
            *s += w * w;
        }
    }

    /// Normalize by the summed squared window and return the signal
    pub fn finish(self) -> Vec<f32> {
        let Self {
            mut output,
            window_sum,
        } = self;

        let peak = window_sum.iter().fold(0.0_f32, |m, &s| m.max(s));
        let floor = (peak * MIN_WINDOW_SUM_RATIO).max(WINDOW_SUM_EPSILON);

        for (sample, &sum) in output.iter_mut().zip(window_sum.iter()) {
            *sample /= sum.max(floor);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    /// Analysis-window a constant signal, then resynthesize it unchanged
    fn reconstruct_constant(frame_size: usize, hop: usize, frames: usize) -> Vec<f32> {
        let window = HannWindow::new(frame_size);
        let mut acc = OutputAccumulator::with_len((frames - 1) * hop + frame_size);
        for t in 0..frames {
            let mut frame = vec![0.5; frame_size];
            window.apply(&mut frame);
            acc.add_frame(t * hop, &frame, &window);
        }
        acc.finish()
    }

    #[test_case(64, 16 ; "quarter hop")]
    #[test_case(64, 24 ; "stretched hop")]
    #[test_case(64, 8 ; "compressed hop")]
    fn test_interior_is_flat_after_normalization(frame_size: usize, hop: usize) {
        let output = reconstruct_constant(frame_size, hop, 20);

        // Away from the edges every position has full overlap
        for &sample in &output[frame_size..output.len() - frame_size] {
            assert_abs_diff_eq!(sample, 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_add_frame_grows_accumulator() {
        let window = HannWindow::new(8);
        let mut acc = OutputAccumulator::with_len(4);
        acc.add_frame(2, &[1.0; 8], &window);
        assert_eq!(acc.len(), 10);
    }

    #[test]
    fn test_uncovered_positions_stay_zero() {
        let window = HannWindow::new(8);
        let mut acc = OutputAccumulator::with_len(20);
        acc.add_frame(0, &[1.0; 8], &window);
        let output = acc.finish();

        assert!(output[8..].iter().all(|&s| s == 0.0));
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = OutputAccumulator::with_len(0);
        assert!(acc.is_empty());
        assert!(acc.finish().is_empty());
    }
}
