/// Core traits for polymix
use crate::error::Result;
use crate::types::AudioSpec;
use std::time::Duration;

/// Outcome of one decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Samples written to the caller's buffer
    pub written: usize,

    /// The decoder's rate or channel count changed mid-stream; the caller
    /// should observe the new values and decode again with fresh buffers
    pub spec_changed: bool,
}

impl Decoded {
    /// No samples, no spec change: end of stream
    pub const fn end_of_stream() -> Self {
        Self {
            written: 0,
            spec_changed: false,
        }
    }

    /// `written` samples with no spec change
    pub const fn written(written: usize) -> Self {
        Self {
            written,
            spec_changed: false,
        }
    }
}

/// Audio decoder trait
///
/// Implementers pull encoded audio from a byte source and produce interleaved
/// f32 samples in the [-1.0, 1.0] range. A decoder is constructed open: once
/// a factory returns one, `rate()` and `channels()` are stable nonzero values
/// until the decoder announces a spec change through [`Decoded::spec_changed`].
pub trait AudioDecoder: Send {
    /// Decode up to `buf.len()` samples into `buf`
    ///
    /// Returns the number of samples written, which is `0` only at end of
    /// stream. A mid-stream sample-rate or channel-count change is reported
    /// via [`Decoded::spec_changed`]; the samples already buffered internally
    /// belong to the new spec and are delivered on the next call.
    fn decode(&mut self, buf: &mut [f32]) -> Result<Decoded>;

    /// Rewind to the beginning of the stream
    fn rewind(&mut self) -> Result<()>;

    /// Seek to a position from the start of the stream
    fn seek_to_time(&mut self, position: Duration) -> Result<()>;

    /// Sample rate of the decoded audio in Hz
    fn rate(&self) -> u32;

    /// Channel count of the decoded audio
    fn channels(&self) -> u16;

    /// Total duration, if the format can tell
    fn duration(&self) -> Option<Duration> {
        None
    }

    /// Whether the stream is exhausted
    fn is_at_end(&self) -> bool;
}

/// Per-stream audio effect
///
/// Processors run on the realtime callback thread, in insertion order,
/// between decoding and mixing. `process` must not allocate or block.
pub trait Processor: Send {
    /// Read `src`, write the processed result to `dst`
    ///
    /// Both buffers hold the same number of interleaved f32 samples.
    fn process(&mut self, dst: &mut [f32], src: &[f32]);

    /// Name for diagnostics
    fn name(&self) -> &str {
        "processor"
    }
}

/// Callback an output device invokes to have a buffer filled
///
/// Called from the device's realtime thread with the whole output buffer;
/// the callee always fills every byte.
pub type DeviceCallback = Box<dyn FnMut(&mut [u8]) + Send + 'static>;

/// Output device trait
///
/// Implementers own the realtime audio thread and call back into the mixer
/// at a steady cadence. Exactly one device is open per process.
pub trait OutputDevice: Send {
    /// Open the device
    ///
    /// `requested` is a hint; the device returns the spec it actually
    /// negotiated, which is what the callback's buffers are laid out as.
    /// The device starts paused; call [`OutputDevice::resume`] to begin
    /// callback delivery.
    fn open(&mut self, requested: &AudioSpec, callback: DeviceCallback) -> Result<AudioSpec>;

    /// Suspend callback delivery
    fn pause(&mut self);

    /// Resume callback delivery
    fn resume(&mut self);

    /// Close the device and stop the audio thread
    fn close(&mut self);
}
