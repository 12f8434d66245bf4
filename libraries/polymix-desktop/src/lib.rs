//! polymix desktop
//!
//! Cross-platform output for polymix, built on cpal.
//!
//! The usual entry point is [`init`], which opens the default output
//! device and binds the mixer to it:
//!
//! ```no_run
//! use polymix_core::{AudioSpec, SharedSource};
//! use polymix_playback::{mixer, Stream};
//! use std::fs::File;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! polymix_desktop::init(AudioSpec::default())?;
//!
//! let stream = Stream::from_source(SharedSource::new(File::open("/music/song.flac")?))?;
//! stream.open()?;
//! stream.play(1, Duration::ZERO)?;
//!
//! // ... let it play, then
//! mixer::quit();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod backend;
mod device;
mod error;
mod output;

pub use backend::AudioBackend;
pub use device::{default_output_device, list_output_devices};
pub use error::{OutputError, Result};
pub use output::{CpalDevice, DeviceEvent};

use polymix_core::AudioSpec;

/// Bind the mixer to the default output device
pub fn init(spec: AudioSpec) -> Result<()> {
    init_with_device(spec, AudioBackend::Default, None)
}

/// Bind the mixer to a specific backend and device
///
/// # Arguments
/// * `spec` - Requested spec; the device negotiates what it can
/// * `backend` - Audio backend to use
/// * `device_name` - Device name from [`list_output_devices`], or `None`
///   for the backend's default
pub fn init_with_device(
    spec: AudioSpec,
    backend: AudioBackend,
    device_name: Option<String>,
) -> Result<()> {
    let device = CpalDevice::with_device(backend, device_name);
    polymix_playback::mixer::init(spec, Box::new(device))?;
    Ok(())
}
