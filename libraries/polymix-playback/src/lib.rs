//! polymix playback
//!
//! Streams and the mixer: the realtime half of polymix.
//!
//! The [`mixer`] is a process-wide singleton bound to one output device.
//! Each [`Stream`] wraps a decoder (optionally behind a resampler) and is
//! mixed additively with every other active stream on the device's callback
//! thread, with per-stream volume, stereo position, fades, and a processor
//! chain applied along the way.
//!
//! # Example
//!
//! ```no_run
//! use polymix_core::{AudioSpec, SharedSource};
//! use polymix_playback::{mixer, Stream};
//! use std::fs::File;
//! use std::time::Duration;
//!
//! # fn open_device() -> Box<dyn polymix_core::OutputDevice> { unimplemented!() }
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! mixer::init(AudioSpec::default(), open_device())?;
//!
//! let source = SharedSource::new(File::open("/music/song.ogg")?);
//! let stream = Stream::from_source(source)?;
//! stream.open()?;
//! stream.set_volume(0.8);
//! stream.play(1, Duration::from_millis(250))?;
//!
//! // ... later
//! stream.stop(Duration::from_millis(100))?;
//! mixer::quit();
//! # Ok(())
//! # }
//! ```

mod convert;
mod error;
mod fade;
pub mod mixer;
mod stream;

pub use error::{PlaybackError, Result};
pub use stream::{ProcessorId, Stream};

pub use polymix_core::{AudioSpec, OutputDevice, Processor, SampleFormat, SampleRate};
