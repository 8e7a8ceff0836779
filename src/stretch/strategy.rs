//! Stretch strategy registry
//!
//! The contract exposes eighteen algorithm slots (0-17). Each slot maps to a
//! `StretchStrategy`, which hands the orchestrator one spectral frame
//! processor per channel. Only the phase vocoder exists today; unclaimed
//! slots resolve to it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use serde::Serialize;

use crate::error::{Result, StretchError};
use crate::stretch::params::{validate_algorithm, FrameLayout, MAX_ALGORITHM_INDEX};
use crate::stretch::vocoder::PhaseVocoder;

/// Index every unclaimed slot falls back to
pub const DEFAULT_ALGORITHM_INDEX: u8 = 0;

/// Rewrites one frame's non-negative spectrum in place
///
/// A processor is stateful across the frames of a single channel and is
/// never shared between channels.
pub trait SpectralFrameProcessor: Send {
    fn process_frame(&mut self, spectrum: &mut [Complex<f32>]) -> Result<()>;
}

impl SpectralFrameProcessor for PhaseVocoder {
    fn process_frame(&mut self, spectrum: &mut [Complex<f32>]) -> Result<()> {
        self.process(spectrum).map(|_| ())
    }
}

/// One selectable time-stretch algorithm
pub trait StretchStrategy: Send + Sync + fmt::Debug {
    /// Display name
    fn name(&self) -> &'static str;

    /// Fresh per-channel processor for `layout`
    fn frame_processor(&self, layout: &FrameLayout) -> Box<dyn SpectralFrameProcessor>;
}

/// Phase vocoder with bin-wise phase propagation
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseVocoderStrategy;

impl StretchStrategy for PhaseVocoderStrategy {
    fn name(&self) -> &'static str {
        "Phase Vocoder"
    }

    fn frame_processor(&self, layout: &FrameLayout) -> Box<dyn SpectralFrameProcessor> {
        Box::new(PhaseVocoder::new(layout))
    }
}

/// Row of the algorithm table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmInfo {
    pub index: u8,
    pub name: &'static str,
    /// True when the slot has no strategy of its own
    pub fallback: bool,
}

/// Maps algorithm indices to strategies
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<u8, Arc<dyn StretchStrategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry with the phase vocoder in slot 0
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.strategies.insert(
            DEFAULT_ALGORITHM_INDEX,
            Arc::new(PhaseVocoderStrategy) as Arc<dyn StretchStrategy>,
        );
        registry
    }

    /// Claim slot `index` for `strategy`, replacing any previous owner
    pub fn register(&mut self, index: u8, strategy: Arc<dyn StretchStrategy>) -> Result<()> {
        let index = validate_algorithm(index as i64)?;
        self.strategies.insert(index, strategy);
        Ok(())
    }

    /// Check if a slot has its own strategy
    pub fn has_strategy(&self, index: u8) -> bool {
        self.strategies.contains_key(&index)
    }

    /// Strategy for `index`
    ///
    /// Out-of-range indices are `InvalidParameter`. Unclaimed slots resolve
    /// to slot 0.
    pub fn resolve(&self, index: u8) -> Result<Arc<dyn StretchStrategy>> {
        let index = validate_algorithm(index as i64)?;

        if let Some(strategy) = self.strategies.get(&index) {
            return Ok(Arc::clone(strategy));
        }

        let fallback = self
            .strategies
            .get(&DEFAULT_ALGORITHM_INDEX)
            .ok_or_else(|| {
                StretchError::processing_failure(format!(
                    "algorithm {} is unclaimed and no strategy is registered in slot {}",
                    index, DEFAULT_ALGORITHM_INDEX
                ))
            })?;

        tracing::debug!(
            algorithm = index,
            strategy = fallback.name(),
            "Algorithm slot has no dedicated strategy, using fallback"
        );
        Ok(Arc::clone(fallback))
    }

    /// Every slot 0..=17 and what it resolves to
    pub fn descriptors(&self) -> Vec<AlgorithmInfo> {
        let fallback_name = self
            .strategies
            .get(&DEFAULT_ALGORITHM_INDEX)
            .map(|s| s.name())
            .unwrap_or("unavailable");

        (0..=MAX_ALGORITHM_INDEX)
            .map(|index| match self.strategies.get(&index) {
                Some(strategy) => AlgorithmInfo {
                    index,
                    name: strategy.name(),
                    fallback: false,
                },
                None => AlgorithmInfo {
                    index,
                    name: fallback_name,
                    fallback: true,
                },
            })
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stretch::params::{Quality, StretchConfig};

    #[derive(Debug)]
    struct Silence;

    struct ZeroSpectrum;

    impl SpectralFrameProcessor for ZeroSpectrum {
        fn process_frame(&mut self, spectrum: &mut [Complex<f32>]) -> Result<()> {
            spectrum.fill(Complex::new(0.0, 0.0));
            Ok(())
        }
    }

    impl StretchStrategy for Silence {
        fn name(&self) -> &'static str {
            "Silence"
        }

        fn frame_processor(&self, _layout: &FrameLayout) -> Box<dyn SpectralFrameProcessor> {
            Box::new(ZeroSpectrum)
        }
    }

    #[test]
    fn test_defaults_claim_slot_zero_only() {
        let registry = StrategyRegistry::with_defaults();
        assert!(registry.has_strategy(0));
        assert!(!registry.has_strategy(1));
        assert_eq!(registry.resolve(0).unwrap().name(), "Phase Vocoder");
    }

    #[test]
    fn test_unclaimed_slots_fall_back() {
        let registry = StrategyRegistry::default();
        for index in 1..=MAX_ALGORITHM_INDEX {
            assert_eq!(registry.resolve(index).unwrap().name(), "Phase Vocoder");
        }
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let registry = StrategyRegistry::default();
        let err = registry.resolve(18).unwrap_err();
        assert!(matches!(err, StretchError::InvalidParameter { name: "algorithm", .. }));

        let mut registry = StrategyRegistry::new();
        assert!(registry.register(40, Arc::new(Silence)).is_err());
    }

    #[test]
    fn test_empty_registry_cannot_resolve() {
        let err = StrategyRegistry::new().resolve(3).unwrap_err();
        assert!(matches!(err, StretchError::ProcessingFailure { .. }));
    }

    #[test]
    fn test_registered_strategy_takes_its_slot() {
        let mut registry = StrategyRegistry::with_defaults();
        registry.register(5, Arc::new(Silence)).unwrap();

        assert_eq!(registry.resolve(5).unwrap().name(), "Silence");
        assert_eq!(registry.resolve(6).unwrap().name(), "Phase Vocoder");

        let table = registry.descriptors();
        assert_eq!(table.len(), 18);
        assert_eq!(
            table[5],
            AlgorithmInfo {
                index: 5,
                name: "Silence",
                fallback: false
            }
        );
        assert!(table[6].fallback);
        assert!(!table[0].fallback);
    }

    #[test]
    fn test_phase_vocoder_processor_matches_layout() {
        let layout = StretchConfig::new(150, Quality::B, 0).layout().unwrap();
        let mut processor = PhaseVocoderStrategy.frame_processor(&layout);

        let mut spectrum = vec![Complex::new(1.0, 0.0); layout.num_bins()];
        assert!(processor.process_frame(&mut spectrum).is_ok());

        let mut wrong = vec![Complex::new(1.0, 0.0); 17];
        let err = processor.process_frame(&mut wrong).unwrap_err();
        assert!(matches!(err, StretchError::ProcessingFailure { .. }));
    }
}
