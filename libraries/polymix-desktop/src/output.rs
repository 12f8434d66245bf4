//! CPAL output device
//!
//! [`CpalDevice`] implements the mixer's [`OutputDevice`] seam over cpal.
//! The mixer produces raw bytes in the negotiated format; the per-format
//! stream callbacks move those bytes into cpal's typed buffers through a
//! pre-allocated conversion buffer, so the realtime path settles into a
//! steady state with no further allocation.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, SampleFormat as CpalFormat, Stream as CpalStream, StreamConfig,
    SupportedBufferSize,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use polymix_core::{
    AudioSpec, CoreError, DeviceCallback, OutputDevice, SampleFormat, SampleRate,
};

use crate::backend::AudioBackend;
use crate::device::find_device_by_name;

/// Buffer sizes tried when the requested one is not available
const PREFERRED_BUFFER_FRAMES: [u32; 6] = [1024, 512, 256, 2048, 128, 4096];

/// Events surfaced from the audio stream outside the callback path
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// The stream reported an error (device unplugged, xrun, ...)
    Error(String),
}

// cpal's Stream is !Send because some platform handles are thread-affine,
// but it is only ever driven from this holder: created in open(), toggled
// by pause/resume, dropped in close(), all behind the mixer's device slot.
struct StreamHolder(CpalStream);

#[allow(unsafe_code)]
unsafe impl Send for StreamHolder {}

/// CPAL-backed output device for the mixer
pub struct CpalDevice {
    backend: AudioBackend,
    device_name: Option<String>,
    stream: Option<StreamHolder>,
    event_tx: Sender<DeviceEvent>,
    event_rx: Receiver<DeviceEvent>,
}

impl CpalDevice {
    /// Device on the default backend's default output
    pub fn new() -> Self {
        Self::with_device(AudioBackend::Default, None)
    }

    /// Device on a specific backend, optionally by device name
    pub fn with_device(backend: AudioBackend, device_name: Option<String>) -> Self {
        let (event_tx, event_rx) = bounded(32);
        Self {
            backend,
            device_name,
            stream: None,
            event_tx,
            event_rx,
        }
    }

    /// Receiver for stream error events
    pub fn events(&self) -> Receiver<DeviceEvent> {
        self.event_rx.clone()
    }
}

impl Default for CpalDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDevice for CpalDevice {
    fn open(
        &mut self,
        requested: &AudioSpec,
        callback: DeviceCallback,
    ) -> polymix_core::Result<AudioSpec> {
        let host = self
            .backend
            .to_cpal_host()
            .map_err(|e| CoreError::Device(e.to_string()))?;
        let device = match &self.device_name {
            Some(name) => find_device_by_name(&host, name)?,
            None => host
                .default_output_device()
                .ok_or_else(|| CoreError::Device("no default output device".into()))?,
        };

        let (config, cpal_format) = pick_stream_config(&device, requested)?;
        let format = map_format(cpal_format)?;
        let buffer_frames = match config.buffer_size {
            BufferSize::Fixed(frames) => frames,
            BufferSize::Default => requested.buffer_frames,
        };
        let negotiated = AudioSpec::new(
            format,
            SampleRate::new(config.sample_rate.0),
            config.channels,
            buffer_frames,
        );

        let event_tx = self.event_tx.clone();
        let error_callback = move |err: cpal::StreamError| {
            eprintln!("[polymix] audio stream error: {err}");
            let _ = event_tx.try_send(DeviceEvent::Error(err.to_string()));
        };

        let stream = build_stream(&device, &config, cpal_format, callback, error_callback)?;
        self.stream = Some(StreamHolder(stream));
        Ok(negotiated)
    }

    fn pause(&mut self) {
        if let Some(holder) = &self.stream {
            if let Err(e) = holder.0.pause() {
                eprintln!("[polymix] failed to pause stream: {e}");
            }
        }
    }

    fn resume(&mut self) {
        if let Some(holder) = &self.stream {
            if let Err(e) = holder.0.play() {
                eprintln!("[polymix] failed to start stream: {e}");
            }
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

/// Map a cpal format to the mixer's native-endian equivalent
fn map_format(format: CpalFormat) -> polymix_core::Result<SampleFormat> {
    match format {
        CpalFormat::I8 => Ok(SampleFormat::S8),
        CpalFormat::U8 => Ok(SampleFormat::U8),
        CpalFormat::I16 => Ok(SampleFormat::s16_native()),
        CpalFormat::I32 => Ok(SampleFormat::s32_native()),
        CpalFormat::F32 => Ok(SampleFormat::f32_native()),
        other => Err(CoreError::UnsupportedFormat(format!("{other:?}"))),
    }
}

/// Choose the supported config closest to the requested spec
///
/// Prefers the requested channel count (falling back to stereo), then
/// F32 > I32 > I16 sample formats, clamps the rate into the supported
/// range, and fixes an explicit buffer size.
fn pick_stream_config(
    device: &Device,
    requested: &AudioSpec,
) -> polymix_core::Result<(StreamConfig, CpalFormat)> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| CoreError::Device(e.to_string()))?
        .collect();

    let mut candidates: Vec<_> = supported
        .iter()
        .filter(|c| c.channels() == requested.channels)
        .collect();
    if candidates.is_empty() {
        candidates = supported.iter().filter(|c| c.channels() == 2).collect();
    }

    let best = candidates
        .iter()
        .find(|c| c.sample_format() == CpalFormat::F32)
        .or_else(|| candidates.iter().find(|c| c.sample_format() == CpalFormat::I32))
        .or_else(|| candidates.iter().find(|c| c.sample_format() == CpalFormat::I16))
        .copied()
        .ok_or_else(|| {
            CoreError::UnsupportedFormat("device offers no usable sample format".into())
        })?;

    let rate = requested
        .rate
        .as_hz()
        .clamp(best.min_sample_rate().0, best.max_sample_rate().0);
    let buffer_size = match best.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            let frames = if (*min..=*max).contains(&requested.buffer_frames) {
                requested.buffer_frames
            } else {
                PREFERRED_BUFFER_FRAMES
                    .iter()
                    .copied()
                    .find(|f| (*min..=*max).contains(f))
                    .unwrap_or_else(|| requested.buffer_frames.clamp(*min, *max))
            };
            BufferSize::Fixed(frames)
        }
        SupportedBufferSize::Unknown => BufferSize::Fixed(requested.buffer_frames),
    };

    let cpal_format = best.sample_format();
    let mut config: StreamConfig = best.clone().with_sample_rate(cpal::SampleRate(rate)).into();
    config.buffer_size = buffer_size;
    Ok((config, cpal_format))
}

/// Build the typed cpal stream, adapting the byte-oriented mixer callback
fn build_stream(
    device: &Device,
    config: &StreamConfig,
    format: CpalFormat,
    mut callback: DeviceCallback,
    error_callback: impl FnMut(cpal::StreamError) + Send + 'static,
) -> polymix_core::Result<CpalStream> {
    let built = match format {
        CpalFormat::F32 => {
            let mut scratch: Vec<u8> = Vec::new();
            device.build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fit(&mut scratch, data.len() * 4);
                    callback(&mut scratch);
                    for (sample, bytes) in data.iter_mut().zip(scratch.chunks_exact(4)) {
                        *sample = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    }
                },
                error_callback,
                None,
            )
        }
        CpalFormat::I32 => {
            let mut scratch: Vec<u8> = Vec::new();
            device.build_output_stream(
                config,
                move |data: &mut [i32], _: &cpal::OutputCallbackInfo| {
                    fit(&mut scratch, data.len() * 4);
                    callback(&mut scratch);
                    for (sample, bytes) in data.iter_mut().zip(scratch.chunks_exact(4)) {
                        *sample = i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    }
                },
                error_callback,
                None,
            )
        }
        CpalFormat::I16 => {
            let mut scratch: Vec<u8> = Vec::new();
            device.build_output_stream(
                config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    fit(&mut scratch, data.len() * 2);
                    callback(&mut scratch);
                    for (sample, bytes) in data.iter_mut().zip(scratch.chunks_exact(2)) {
                        *sample = i16::from_ne_bytes([bytes[0], bytes[1]]);
                    }
                },
                error_callback,
                None,
            )
        }
        other => {
            return Err(CoreError::UnsupportedFormat(format!("{other:?}")));
        }
    };
    built.map_err(|e| CoreError::Device(e.to_string()))
}

/// Grow or shrink the conversion buffer; settles after the first callback
fn fit(scratch: &mut Vec<u8>, len: usize) {
    if scratch.len() != len {
        scratch.resize(len, 0);
    }
}
