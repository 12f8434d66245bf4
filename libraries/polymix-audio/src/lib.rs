//! polymix audio
//!
//! Decoding, format detection, and sample rate conversion for polymix.
//!
//! This crate provides:
//! - Decoder auto-detection over arbitrary byte sources ([`DecoderRegistry`])
//! - A Symphonia-backed streaming decoder (MP3, FLAC, OGG, WAV, AAC by
//!   feature flag)
//! - Channel adaptation between source and device layouts ([`DecoderAdapter`])
//! - A pull-based resampler with pluggable DSP kernels ([`StreamResampler`],
//!   [`RubatoKernel`])
//!
//! # Example: detecting and decoding
//!
//! ```no_run
//! use polymix_audio::DecoderRegistry;
//! use polymix_core::{AudioDecoder, SharedSource};
//! use std::fs::File;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SharedSource::new(File::open("/music/song.flac")?);
//! let mut decoder = DecoderRegistry::with_defaults().detect(source)?;
//!
//! let mut samples = vec![0.0f32; 4096];
//! let decoded = decoder.decode(&mut samples)?;
//! println!("{} samples at {} Hz", decoded.written, decoder.rate());
//! # Ok(())
//! # }
//! ```
//!
//! # Example: resampling to a device rate
//!
//! ```no_run
//! use polymix_audio::{DecoderAdapter, DecoderRegistry, KernelQuality, RubatoKernel, StreamResampler};
//! use polymix_core::SharedSource;
//! use std::fs::File;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SharedSource::new(File::open("/music/song.mp3")?);
//! let decoder = DecoderRegistry::with_defaults().detect(source)?;
//!
//! let adapter = DecoderAdapter::new(decoder, 2);
//! let kernel = RubatoKernel::new(KernelQuality::Balanced);
//! let mut resampler = StreamResampler::new(adapter, Box::new(kernel));
//! resampler.set_spec(48_000, 2, 1024)?;
//!
//! let mut buf = vec![0.0f32; 2048];
//! let n = resampler.resample(&mut buf);
//! println!("{n} samples at 48 kHz");
//! # Ok(())
//! # }
//! ```

mod decoder;
mod error;
mod registry;
mod resampling;
pub mod test_utils;

pub use decoder::symphonia::{SymphoniaDecoder, SymphoniaFactory};
pub use decoder::DecoderAdapter;
pub use error::{AudioError, Result};
pub use registry::{DecoderFactory, DecoderRegistry, DetectionTier};
pub use resampling::{
    KernelQuality, ResampleKernel, RubatoKernel, StreamResampler, MAX_SOURCE_RATE, MIN_SOURCE_RATE,
};
