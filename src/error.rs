//! Error handling for mpc-stretch
//!
//! Parameter errors are rejected at the boundary and are always recoverable.
//! Engine failures are deterministic, so they are never retried and are
//! reported to callers without internal numeric detail.

use thiserror::Error;

/// Result type alias for stretch operations
pub type Result<T> = std::result::Result<T, StretchError>;

/// Main error type for the stretch engine and its boundary glue
#[derive(Error, Debug)]
pub enum StretchError {
    // Parameter Errors
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    // Input Errors
    #[error("Unsupported input: {reason}")]
    UnsupportedInput { reason: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Engine Errors
    #[error("Processing failure: {reason}")]
    ProcessingFailure { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StretchError {
    /// Shorthand for an out-of-contract parameter
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        StretchError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Shorthand for input the engine cannot process
    pub fn unsupported_input(reason: impl Into<String>) -> Self {
        StretchError::UnsupportedInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for an internal numeric failure
    pub fn processing_failure(reason: impl Into<String>) -> Self {
        StretchError::ProcessingFailure {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            StretchError::InvalidParameter { .. } => "INVALID_PARAMETER",
            StretchError::UnsupportedInput { .. } => "UNSUPPORTED_INPUT",
            StretchError::InvalidAudio { .. } => "INVALID_AUDIO",
            StretchError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            StretchError::FileNotFound { .. } => "FILE_NOT_FOUND",
            StretchError::ProcessingFailure { .. } => "PROCESSING_FAILURE",
            StretchError::Io(_) => "IO_ERROR",
            StretchError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by changing the request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StretchError::InvalidParameter { .. }
                | StretchError::UnsupportedInput { .. }
                | StretchError::InvalidAudio { .. }
                | StretchError::UnsupportedFormat { .. }
                | StretchError::FileNotFound { .. }
        )
    }

    /// Check if this error was raised by request validation, before any processing
    pub fn is_validation_error(&self) -> bool {
        matches!(self, StretchError::InvalidParameter { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StretchError::InvalidParameter { name, .. } => match *name {
                "ratio" => vec!["Use a ratio between 50 and 200 percent"],
                "quality" => vec!["Use quality A, B or C"],
                "algorithm" => vec!["Use an algorithm index between 0 and 17"],
                _ => vec!["Check the request parameters"],
            },
            StretchError::UnsupportedInput { .. } => vec![
                "Make sure the sample contains audio",
                "Check that the sample rate is set",
            ],
            StretchError::InvalidAudio { .. } => vec![
                "Try converting the file to WAV format first",
                "The file may be corrupted - try re-exporting from source",
            ],
            StretchError::UnsupportedFormat { .. } => vec![
                "Convert to 16-bit, 24-bit or 32-bit float WAV",
                "Enable the 'mp3' feature to load MP3 samples",
            ],
            StretchError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            _ => vec![],
        }
    }

    /// Message safe to hand to a remote caller
    ///
    /// Engine-internal failures collapse to a generic processing error.
    pub fn public_message(&self) -> String {
        match self {
            StretchError::InvalidParameter { .. }
            | StretchError::UnsupportedInput { .. }
            | StretchError::UnsupportedFormat { .. } => self.to_string(),
            _ => "Error processing audio".to_string(),
        }
    }
}
