//! Output device enumeration and lookup

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use polymix_core::CoreError;

use crate::backend::AudioBackend;
use crate::error::Result;

/// Names of the output devices a backend offers
pub fn list_output_devices(backend: AudioBackend) -> Result<Vec<String>> {
    let host = backend.to_cpal_host()?;
    let mut names = Vec::new();
    for device in host.output_devices()? {
        if let Ok(name) = device.name() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Name of the default output device, if one exists
pub fn default_output_device(backend: AudioBackend) -> Result<Option<String>> {
    let host = backend.to_cpal_host()?;
    Ok(host
        .default_output_device()
        .and_then(|device| device.name().ok()))
}

/// Find an output device by its cpal name
pub(crate) fn find_device_by_name(
    host: &cpal::Host,
    name: &str,
) -> polymix_core::Result<Device> {
    let devices = host
        .output_devices()
        .map_err(|e| CoreError::Device(e.to_string()))?;
    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(CoreError::Device(format!("output device not found: {name}")))
}
