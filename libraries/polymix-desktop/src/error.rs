/// Desktop audio output errors
use polymix_core::CoreError;
use polymix_playback::PlaybackError;
use thiserror::Error;

/// Result type for desktop output operations
pub type Result<T> = std::result::Result<T, OutputError>;

/// Desktop output errors
#[derive(Debug, Error)]
pub enum OutputError {
    /// Requested audio device does not exist
    #[error("Audio device not found")]
    DeviceNotFound,

    /// Device enumeration or configuration error
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Failed to build the output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuildError(String),

    /// The device offers no sample format the mixer can emit
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Mixer-side error
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Core error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<cpal::BuildStreamError> for OutputError {
    fn from(err: cpal::BuildStreamError) -> Self {
        OutputError::StreamBuildError(err.to_string())
    }
}

impl From<cpal::DevicesError> for OutputError {
    fn from(err: cpal::DevicesError) -> Self {
        OutputError::DeviceError(err.to_string())
    }
}

impl From<cpal::SupportedStreamConfigsError> for OutputError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        OutputError::DeviceError(err.to_string())
    }
}
