/// Audio-specific errors
use polymix_core::CoreError;
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// No registered decoder recognized the byte source
    #[error("No decoder recognized the source")]
    NoDecoderFound,

    /// Decoding error
    #[error("Decode error: {0}")]
    Decode(String),

    /// Resampler configuration or kernel error
    #[error("Resample error: {0}")]
    Resample(String),

    /// Core error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
