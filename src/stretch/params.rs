//! Stretch parameters
//!
//! The external contract (ratio percent, quality letter, algorithm index)
//! and the frame layout it resolves to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StretchError};
use crate::stretch::fft::nearest_power_of_two;

// ============================================================================
// Constants
// ============================================================================

/// Smallest accepted ratio (half the duration)
pub const MIN_RATIO_PERCENT: u32 = 50;

/// Largest accepted ratio (double the duration)
pub const MAX_RATIO_PERCENT: u32 = 200;

/// Ratio that leaves the duration unchanged
pub const UNITY_RATIO_PERCENT: u32 = 100;

/// Highest algorithm index in the contract
pub const MAX_ALGORITHM_INDEX: u8 = 17;

/// Analysis hop is N / HOP_DIVISOR (75% overlap)
pub const HOP_DIVISOR: usize = 4;

// ============================================================================
// Quality
// ============================================================================

/// Quality tier, ordered from smallest to largest FFT
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    /// Standard (2048-point FFT)
    #[default]
    A,
    /// Better (4096-point FFT)
    B,
    /// Highest (8192-point FFT)
    C,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::A, Quality::B, Quality::C];

    /// FFT frame size for this tier
    pub fn frame_size(&self) -> usize {
        match self {
            Quality::A => 2048,
            Quality::B => 4096,
            Quality::C => 8192,
        }
    }

    /// Human-readable tier name
    pub fn label(&self) -> &'static str {
        match self {
            Quality::A => "Standard",
            Quality::B => "Better",
            Quality::C => "Highest",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Quality::A => "A",
            Quality::B => "B",
            Quality::C => "C",
        };
        f.write_str(letter)
    }
}

impl FromStr for Quality {
    type Err = StretchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(Quality::A),
            "B" => Ok(Quality::B),
            "C" => Ok(Quality::C),
            other => Err(StretchError::invalid_parameter(
                "quality",
                format!("'{}' is not one of A, B, C", other),
            )),
        }
    }
}

// ============================================================================
// Stretch Config
// ============================================================================

/// Validated-on-use stretch request
///
/// `ratio` is a percentage of the input duration: 100 leaves it unchanged,
/// 50 halves it, 200 doubles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StretchConfig {
    pub ratio: u32,
    pub quality: Quality,
    pub algorithm: u8,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            ratio: UNITY_RATIO_PERCENT,
            quality: Quality::A,
            algorithm: 0,
        }
    }
}

impl StretchConfig {
    pub fn new(ratio: u32, quality: Quality, algorithm: u8) -> Self {
        Self {
            ratio,
            quality,
            algorithm,
        }
    }

    /// Check every field against the contract
    pub fn validate(&self) -> Result<()> {
        validate_ratio(self.ratio as i64)?;
        validate_algorithm(self.algorithm as i64)?;
        Ok(())
    }

    /// Resolve the frame size and hops this config implies
    pub fn layout(&self) -> Result<FrameLayout> {
        self.validate()?;
        Ok(FrameLayout::new(self.quality.frame_size(), self.ratio))
    }

    /// Exact output length for an input of `input_len` samples
    ///
    /// `round(input_len * ratio / 100)`, halves rounding up.
    pub fn output_len(&self, input_len: usize) -> usize {
        ((input_len as u64 * self.ratio as u64 + 50) / 100) as usize
    }
}

/// Check a ratio percentage against [50, 200]
pub fn validate_ratio(ratio: i64) -> Result<u32> {
    if !(MIN_RATIO_PERCENT as i64..=MAX_RATIO_PERCENT as i64).contains(&ratio) {
        return Err(StretchError::invalid_parameter(
            "ratio",
            format!(
                "{} is outside {}..={}",
                ratio, MIN_RATIO_PERCENT, MAX_RATIO_PERCENT
            ),
        ));
    }
    Ok(ratio as u32)
}

/// Check an algorithm index against [0, 17]
pub fn validate_algorithm(algorithm: i64) -> Result<u8> {
    if !(0..=MAX_ALGORITHM_INDEX as i64).contains(&algorithm) {
        return Err(StretchError::invalid_parameter(
            "algorithm",
            format!("{} is outside 0..={}", algorithm, MAX_ALGORITHM_INDEX),
        ));
    }
    Ok(algorithm as u8)
}

// ============================================================================
// Frame Layout
// ============================================================================

/// Frame size and hop spacing for one stretch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// FFT frame size N (power of two)
    pub frame_size: usize,
    /// Analysis hop H_a = N / 4
    pub analysis_hop: usize,
    /// Synthesis hop H_s = round(H_a * ratio / 100)
    pub synthesis_hop: usize,
}

impl FrameLayout {
    pub fn new(requested_frame_size: usize, ratio_percent: u32) -> Self {
        let frame_size = nearest_power_of_two(requested_frame_size.max(HOP_DIVISOR));
        let analysis_hop = frame_size / HOP_DIVISOR;
        let synthesis_hop =
            ((analysis_hop as u64 * ratio_percent as u64 + 50) / 100).max(1) as usize;

        Self {
            frame_size,
            analysis_hop,
            synthesis_hop,
        }
    }

    /// Number of frequency bins per frame (N/2 + 1)
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Zero padding added before and after the input (N/2)
    #[inline]
    pub fn padding(&self) -> usize {
        self.frame_size / 2
    }

    /// Effective time-scale factor H_s / H_a
    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.synthesis_hop as f64 / self.analysis_hop as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_quality_parsing() {
        assert_eq!("A".parse::<Quality>().unwrap(), Quality::A);
        assert_eq!("C".parse::<Quality>().unwrap(), Quality::C);

        let err = "D".parse::<Quality>().unwrap_err();
        assert!(matches!(err, StretchError::InvalidParameter { name: "quality", .. }));
        assert!("a".parse::<Quality>().is_err());
    }

    #[test]
    fn test_quality_tiers_are_ordered() {
        assert!(Quality::A < Quality::B && Quality::B < Quality::C);
        assert!(Quality::A.frame_size() < Quality::B.frame_size());
        assert!(Quality::B.frame_size() < Quality::C.frame_size());
        assert_eq!(Quality::B.to_string(), "B");
    }

    #[test_case(50, 256 ; "half")]
    #[test_case(75, 384 ; "three quarters")]
    #[test_case(100, 512 ; "unity")]
    #[test_case(150, 768 ; "one and a half")]
    #[test_case(200, 1024 ; "double")]
    fn test_layout_quality_a(ratio: u32, synthesis_hop: usize) {
        let layout = StretchConfig::new(ratio, Quality::A, 0).layout().unwrap();
        assert_eq!(
            layout,
            FrameLayout {
                frame_size: 2048,
                analysis_hop: 512,
                synthesis_hop,
            }
        );
    }

    #[test]
    fn test_layout_rounds_frame_size() {
        let layout = FrameLayout::new(3000, 100);
        assert_eq!(layout.frame_size, 2048);
        assert_eq!(layout.analysis_hop, 512);
        assert_eq!(layout.padding(), 1024);
        assert_eq!(layout.num_bins(), 1025);
    }

    #[test_case(49 ; "below range")]
    #[test_case(201 ; "above range")]
    #[test_case(0 ; "zero")]
    fn test_ratio_out_of_range(ratio: u32) {
        let err = StretchConfig::new(ratio, Quality::A, 0).validate().unwrap_err();
        assert!(matches!(err, StretchError::InvalidParameter { name: "ratio", .. }));
    }

    #[test]
    fn test_algorithm_out_of_range() {
        assert!(StretchConfig::new(100, Quality::A, 17).validate().is_ok());
        let err = StretchConfig::new(100, Quality::A, 18).validate().unwrap_err();
        assert!(matches!(err, StretchError::InvalidParameter { name: "algorithm", .. }));
        assert!(validate_algorithm(-1).is_err());
    }

    #[test]
    fn test_output_len_rounds_half_up() {
        let config = StretchConfig::new(75, Quality::A, 0);
        assert_eq!(config.output_len(44100), 33075);
        assert_eq!(config.output_len(2), 2); // 1.5 -> 2
        assert_eq!(StretchConfig::new(50, Quality::A, 0).output_len(3), 2); // 1.5 -> 2
        assert_eq!(StretchConfig::new(150, Quality::A, 0).output_len(1), 2); // 1.5 -> 2
    }
}
