//! Shared fixtures for mixer and stream tests
#![allow(dead_code)]

use polymix_core::{
    AudioDecoder, AudioSpec, CoreError, Decoded, DeviceCallback, OutputDevice, SampleFormat,
    SampleRate,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Serializes tests that touch the process-wide mixer
pub fn mixer_guard() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// The spec the scenario tests run at
pub fn test_spec() -> AudioSpec {
    AudioSpec::new(SampleFormat::F32Le, SampleRate::CD_QUALITY, 2, 1024)
}

struct DeviceShared {
    callback: Mutex<Option<DeviceCallback>>,
    paused: AtomicBool,
    closed: AtomicBool,
}

/// Test device: callbacks run only when the test asks for them
pub struct ManualDevice {
    shared: Arc<DeviceShared>,
}

/// Test-side handle that drives the device callback deterministically
#[derive(Clone)]
pub struct DeviceHandle {
    shared: Arc<DeviceShared>,
}

/// Create a manual device and its driving handle
pub fn manual_device() -> (Box<dyn OutputDevice>, DeviceHandle) {
    let shared = Arc::new(DeviceShared {
        callback: Mutex::new(None),
        paused: AtomicBool::new(true),
        closed: AtomicBool::new(false),
    });
    (
        Box::new(ManualDevice {
            shared: shared.clone(),
        }),
        DeviceHandle { shared },
    )
}

impl OutputDevice for ManualDevice {
    fn open(
        &mut self,
        requested: &AudioSpec,
        callback: DeviceCallback,
    ) -> polymix_core::Result<AudioSpec> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(CoreError::Device("device closed".into()));
        }
        *self.shared.callback.lock().unwrap() = Some(callback);
        // Negotiates exactly what was requested.
        Ok(*requested)
    }

    fn pause(&mut self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.shared.paused.store(false, Ordering::SeqCst);
    }

    fn close(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        *self.shared.callback.lock().unwrap() = None;
    }
}

impl DeviceHandle {
    /// Invoke one device callback, as the audio thread would
    pub fn run_callback(&self, out: &mut [u8]) {
        let mut guard = self.shared.callback.lock().unwrap();
        match guard.as_mut() {
            Some(callback) => callback(out),
            None => out.fill(0),
        }
    }

    /// One callback at the test spec, returned as floats
    pub fn pull_floats(&self, spec: &AudioSpec) -> Vec<f32> {
        let mut bytes = vec![0u8; spec.bytes_per_buffer()];
        self.run_callback(&mut bytes);
        floats_from_le(&bytes)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

/// Reinterpret an F32LE byte buffer as floats
pub fn floats_from_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Fresh mixer at the test spec; tears down any previous one
pub fn init_mixer(spec: AudioSpec) -> DeviceHandle {
    polymix_playback::mixer::quit();
    let (device, handle) = manual_device();
    polymix_playback::mixer::init(spec, device).expect("mixer init");
    handle
}

/// Endless decoder emitting a constant value
pub struct ConstDecoder {
    value: f32,
    rate: u32,
    channels: u16,
}

impl ConstDecoder {
    pub fn new(value: f32, rate: u32, channels: u16) -> Self {
        Self {
            value,
            rate,
            channels,
        }
    }
}

impl AudioDecoder for ConstDecoder {
    fn decode(&mut self, buf: &mut [f32]) -> polymix_core::Result<Decoded> {
        buf.fill(self.value);
        Ok(Decoded::written(buf.len()))
    }

    fn rewind(&mut self) -> polymix_core::Result<()> {
        Ok(())
    }

    fn seek_to_time(&mut self, _position: Duration) -> polymix_core::Result<()> {
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn is_at_end(&self) -> bool {
        false
    }
}

/// Decoder yielding exactly `total` samples of a constant, then end of stream
pub struct FiniteDecoder {
    value: f32,
    total: usize,
    pos: usize,
    rate: u32,
    channels: u16,
}

impl FiniteDecoder {
    pub fn new(value: f32, total: usize, rate: u32, channels: u16) -> Self {
        Self {
            value,
            total,
            pos: 0,
            rate,
            channels,
        }
    }
}

impl AudioDecoder for FiniteDecoder {
    fn decode(&mut self, buf: &mut [f32]) -> polymix_core::Result<Decoded> {
        let n = buf.len().min(self.total - self.pos);
        buf[..n].fill(self.value);
        self.pos += n;
        Ok(Decoded::written(n))
    }

    fn rewind(&mut self) -> polymix_core::Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn seek_to_time(&mut self, _position: Duration) -> polymix_core::Result<()> {
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.total
    }
}

/// Processor multiplying every sample by a constant
pub struct GainProcessor(pub f32);

impl polymix_core::Processor for GainProcessor {
    fn process(&mut self, dst: &mut [f32], src: &[f32]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s * self.0;
        }
    }

    fn name(&self) -> &str {
        "gain"
    }
}

/// Processor adding a constant offset to every sample
pub struct OffsetProcessor(pub f32);

impl polymix_core::Processor for OffsetProcessor {
    fn process(&mut self, dst: &mut [f32], src: &[f32]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s + self.0;
        }
    }

    fn name(&self) -> &str {
        "offset"
    }
}
