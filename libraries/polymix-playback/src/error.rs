/// Error types for playback and mixing
use polymix_audio::AudioError;
use polymix_core::CoreError;
use thiserror::Error;

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The mixer has not been initialized
    #[error("Mixer is not initialized")]
    NotInitialized,

    /// The mixer is already bound to a device
    #[error("Mixer is already initialized")]
    AlreadyInitialized,

    /// The requested or negotiated spec cannot be mixed for
    #[error("Unsupported audio spec: {0}")]
    UnsupportedSpec(String),

    /// Operation requires an opened stream
    #[error("Stream is not open")]
    StreamNotOpen,

    /// Audio pipeline error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Core error
    #[error(transparent)]
    Core(#[from] CoreError),
}
