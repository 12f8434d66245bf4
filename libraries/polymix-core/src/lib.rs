//! polymix core
//!
//! Shared traits and types for the polymix audio playback library.
//!
//! This crate defines the seams the rest of the workspace plugs into:
//! - [`ByteSource`] / [`SharedSource`]: where encoded bytes come from
//! - [`AudioDecoder`]: format decoders producing interleaved f32 samples
//! - [`Processor`]: user-supplied per-stream effects
//! - [`OutputDevice`]: the audio device that drives the realtime callback
//! - [`AudioSpec`] / [`SampleFormat`]: the negotiated device configuration

mod error;
mod source;
mod traits;
pub mod types;

pub use error::{CoreError, Result};
pub use source::{ByteSource, SharedSource};
pub use traits::{AudioDecoder, Decoded, DeviceCallback, OutputDevice, Processor};
pub use types::{AudioSpec, SampleFormat, SampleRate};
