/// Core error types shared across the polymix crates
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Decoding error
    #[error("Decode error: {0}")]
    Decode(String),

    /// Seek error
    #[error("Seek error: {0}")]
    Seek(String),

    /// Unsupported format or channel layout
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Output device error
    #[error("Device error: {0}")]
    Device(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
