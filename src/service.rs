//! Time-stretch request handling
//!
//! Transport-free form of the sampler's time-stretch endpoint: takes the
//! uploaded file bytes and raw query parameters, validates everything before
//! touching the audio, then decodes, stretches and re-encodes to WAV.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{decode_audio_bytes, encode_wav_bytes};
use crate::error::{Result, StretchError};
use crate::stretch::{validate_algorithm, validate_ratio, Quality, StretchConfig, Stretcher};

/// Query parameters as received; absent fields take the config defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStretchParams {
    pub ratio: Option<i64>,
    pub quality: Option<String>,
    pub algorithm: Option<i64>,
}

impl TimeStretchParams {
    pub fn new(ratio: i64, quality: impl Into<String>, algorithm: i64) -> Self {
        Self {
            ratio: Some(ratio),
            quality: Some(quality.into()),
            algorithm: Some(algorithm),
        }
    }

    /// Fill in defaults and check every field
    pub fn resolve(&self, config: &EngineConfig) -> Result<StretchConfig> {
        let ratio = match self.ratio {
            Some(ratio) => validate_ratio(ratio)?,
            None => config.default_ratio,
        };
        let quality = match self.quality.as_deref() {
            Some(letter) => letter.parse::<Quality>()?,
            None => config.default_quality,
        };
        let algorithm = match self.algorithm {
            Some(index) => validate_algorithm(index)?,
            None => config.default_algorithm,
        };

        Ok(StretchConfig::new(ratio, quality, algorithm))
    }
}

/// Stretched audio and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStretchResponse {
    /// WAV file bytes, base64 in JSON
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub sample_rate: u32,
    /// Output length in seconds
    pub duration: f64,
}

/// Error body returned to remote callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub detail: String,
}

impl From<&StretchError> for ErrorResponse {
    fn from(err: &StretchError) -> Self {
        Self {
            code: err.error_code().to_string(),
            detail: err.public_message(),
        }
    }
}

/// HTTP status a transport should use for `err`
///
/// Parameter validation failures are 422; everything else is 500.
pub fn status_code(err: &StretchError) -> u16 {
    if err.is_validation_error() {
        422
    } else {
        500
    }
}

/// Handle one time-stretch request
pub fn process_time_stretch(
    file: &[u8],
    params: &TimeStretchParams,
    config: &EngineConfig,
) -> Result<TimeStretchResponse> {
    process_with(&Stretcher::new(), file, params, config)
}

/// Handle one request on a caller-supplied engine
pub fn process_with(
    stretcher: &Stretcher,
    file: &[u8],
    params: &TimeStretchParams,
    config: &EngineConfig,
) -> Result<TimeStretchResponse> {
    let stretch_config = params.resolve(config)?;

    let decoded = decode_audio_bytes(file)?;
    if decoded.duration_secs() > config.max_duration_secs {
        return Err(StretchError::unsupported_input(format!(
            "sample is {:.1}s long, limit is {:.1}s",
            decoded.duration_secs(),
            config.max_duration_secs
        )));
    }

    let input = if config.fold_to_mono {
        decoded.fold_to_mono()
    } else {
        decoded
    };

    let output = stretcher.stretch(&input, &stretch_config)?;
    let data = encode_wav_bytes(&output, config.export_format())?;

    tracing::info!(
        ratio = stretch_config.ratio,
        quality = %stretch_config.quality,
        input_secs = input.duration_secs(),
        output_secs = output.duration_secs(),
        "Time-stretch request complete"
    );

    Ok(TimeStretchResponse {
        data,
        sample_rate: output.sample_rate,
        duration: output.duration_secs(),
    })
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
