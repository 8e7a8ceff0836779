//! Engine configuration
//!
//! Defaults applied when a request leaves a parameter out, plus output and
//! input limits. Stored as JSON.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::ExportFormat;
use crate::error::{Result, StretchError};
use crate::stretch::{validate_algorithm, validate_ratio, Quality};

/// Bit depths the WAV encoder can write
pub const SUPPORTED_BIT_DEPTHS: [u16; 3] = [16, 24, 32];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ratio used when a request has none
    pub default_ratio: u32,
    pub default_quality: Quality,
    pub default_algorithm: u8,
    /// Average channels to mono before stretching
    pub fold_to_mono: bool,
    /// 16 or 24 (integer PCM), or 32 (float)
    pub output_bit_depth: u16,
    /// Longest accepted input in seconds
    pub max_duration_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ratio: 50,
            default_quality: Quality::A,
            default_algorithm: 0,
            fold_to_mono: true,
            output_bit_depth: 16,
            max_duration_secs: 600.0,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file
    ///
    /// Missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StretchError::FileNotFound {
                path: path.display().to_string(),
                source: None,
            });
        }

        let reader = BufReader::new(File::open(path)?);
        let config: EngineConfig = serde_json::from_reader(reader)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check defaults and limits against the request contract
    pub fn validate(&self) -> Result<()> {
        validate_ratio(self.default_ratio as i64)?;
        validate_algorithm(self.default_algorithm as i64)?;

        if !SUPPORTED_BIT_DEPTHS.contains(&self.output_bit_depth) {
            return Err(StretchError::invalid_parameter(
                "output_bit_depth",
                format!("{} is not one of 16, 24, 32", self.output_bit_depth),
            ));
        }

        if !(self.max_duration_secs.is_finite() && self.max_duration_secs > 0.0) {
            return Err(StretchError::invalid_parameter(
                "max_duration_secs",
                format!("{} must be a positive number", self.max_duration_secs),
            ));
        }

        Ok(())
    }

    pub fn export_format(&self) -> ExportFormat {
        ExportFormat::new(self.output_bit_depth)
    }
}
