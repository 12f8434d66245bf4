//! Playback streams
//!
//! A [`Stream`] is one logical playback unit: a decoder (optionally behind a
//! resampler), playback state (volume, stereo position, fades, loop count),
//! and a processor chain. Control operations run on the application thread;
//! the mixer pulls samples on the device's callback thread. A single coarse
//! lock per stream keeps the two sides consistent: scalar changes take
//! effect no later than the next callback.

use polymix_audio::{
    DecoderAdapter, DecoderRegistry, KernelQuality, ResampleKernel, RubatoKernel, StreamResampler,
};
use polymix_core::{AudioDecoder, Processor, SharedSource};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::{PlaybackError, Result};
use crate::fade::Fade;
use crate::mixer;

/// Handle returned by [`Stream::add_processor`], used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessorId(u64);

/// Where a stream's samples come from
pub(crate) enum SampleSource {
    /// Straight from the decoder; rates are not converted
    Direct(DecoderAdapter),
    /// Through a resampler to the device rate
    Resampled(StreamResampler),
}

impl SampleSource {
    /// Pull up to `buf.len()` samples; short only at end of source
    pub(crate) fn pull(&mut self, buf: &mut [f32]) -> usize {
        match self {
            Self::Direct(adapter) => {
                let mut len = 0;
                loop {
                    let decoded = adapter.decode(&mut buf[len..]);
                    len += decoded.written;
                    if !decoded.spec_changed || len >= buf.len() {
                        break;
                    }
                }
                len
            }
            Self::Resampled(resampler) => resampler.resample(buf),
        }
    }

    pub(crate) fn rewind(&mut self) -> polymix_audio::Result<()> {
        match self {
            Self::Direct(adapter) => adapter.rewind(),
            Self::Resampled(resampler) => resampler.decoder_mut().rewind(),
        }
    }

    fn seek_to_time(&mut self, position: Duration) -> polymix_audio::Result<()> {
        match self {
            Self::Direct(adapter) => adapter.seek_to_time(position),
            Self::Resampled(resampler) => resampler.decoder_mut().seek_to_time(position),
        }
    }

    fn duration(&self) -> Option<Duration> {
        match self {
            Self::Direct(adapter) => adapter.duration(),
            Self::Resampled(resampler) => resampler.decoder().duration(),
        }
    }
}

/// Pre-open pipeline pieces
struct Parts {
    decoder: Box<dyn AudioDecoder>,
    kernel: Option<Box<dyn ResampleKernel>>,
}

/// Shared per-stream state, locked by both threads
pub(crate) struct StreamInner {
    parts: Option<Parts>,
    pub(crate) source: Option<SampleSource>,
    pub(crate) volume: f32,
    pub(crate) stereo_pos: f32,
    pub(crate) muted: bool,
    pub(crate) paused: bool,
    pub(crate) playing: bool,
    pub(crate) wanted_iterations: u32,
    pub(crate) current_iteration: u32,
    pub(crate) fade: Fade,
    pub(crate) processors: Vec<(ProcessorId, Box<dyn Processor>)>,
    next_processor_id: u64,
    pub(crate) finish_callback: Option<Box<dyn FnMut() + Send>>,
    pub(crate) loop_callback: Option<Box<dyn FnMut() + Send>>,
}

impl StreamInner {
    fn new(decoder: Box<dyn AudioDecoder>, kernel: Option<Box<dyn ResampleKernel>>) -> Self {
        Self {
            parts: Some(Parts { decoder, kernel }),
            source: None,
            volume: 1.0,
            stereo_pos: 0.0,
            muted: false,
            paused: false,
            playing: false,
            wanted_iterations: 1,
            current_iteration: 0,
            fade: Fade::new(),
            processors: Vec::new(),
            next_processor_id: 0,
            finish_callback: None,
            loop_callback: None,
        }
    }

    /// A bare inner with no pipeline, for list-management tests
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            parts: None,
            source: None,
            volume: 1.0,
            stereo_pos: 0.0,
            muted: false,
            paused: false,
            playing: false,
            wanted_iterations: 1,
            current_iteration: 0,
            fade: Fade::new(),
            processors: Vec::new(),
            next_processor_id: 0,
            finish_callback: None,
            loop_callback: None,
        }
    }

    /// Immediate stop: leave the active list caller-side, rewind, go idle
    pub(crate) fn stop_now(&mut self) {
        self.playing = false;
        if let Some(source) = self.source.as_mut() {
            if let Err(e) = source.rewind() {
                warn!("rewind on stop failed: {e}");
            }
        }
    }
}

/// Shared handle the mixer keeps in its active list
pub(crate) type SharedStream = Arc<Mutex<StreamInner>>;

/// One logical playback unit
///
/// Dropping a playing stream removes it from the mixer first.
pub struct Stream {
    inner: SharedStream,
}

impl Stream {
    /// Create a stream that plays the decoder at its own rate
    ///
    /// Use this when the decoder's rate is known to match the device, or
    /// when pitch shift on mismatch is acceptable.
    pub fn new(decoder: Box<dyn AudioDecoder>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StreamInner::new(decoder, None))),
        }
    }

    /// Create a stream that resamples the decoder to the device rate
    pub fn resampled(decoder: Box<dyn AudioDecoder>, kernel: Box<dyn ResampleKernel>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StreamInner::new(decoder, Some(kernel)))),
        }
    }

    /// Auto-detect the source format and build a resampled stream
    pub fn from_source(source: SharedSource) -> Result<Self> {
        let decoder = DecoderRegistry::with_defaults().detect(source)?;
        Ok(Self::resampled(
            decoder,
            Box::new(RubatoKernel::new(KernelQuality::Balanced)),
        ))
    }

    /// Build the playback pipeline against the mixer's device spec
    ///
    /// Requires the mixer to be initialized. On failure the stream stays
    /// unopened and cannot be played.
    pub fn open(&self) -> Result<()> {
        let spec = mixer::device_spec().ok_or(PlaybackError::NotInitialized)?;
        let mut inner = self.inner.lock().unwrap();
        if inner.source.is_some() {
            return Ok(());
        }
        let parts = inner.parts.take().ok_or(PlaybackError::StreamNotOpen)?;
        if parts.decoder.rate() == 0 || !(1..=2).contains(&parts.decoder.channels()) {
            return Err(PlaybackError::UnsupportedSpec(format!(
                "decoder reports {} Hz, {} channels",
                parts.decoder.rate(),
                parts.decoder.channels()
            )));
        }

        let adapter = DecoderAdapter::new(parts.decoder, spec.channels);
        let source = match parts.kernel {
            Some(kernel) => {
                let mut resampler = StreamResampler::new(adapter, kernel);
                resampler.set_spec(spec.rate.as_hz(), spec.channels, spec.buffer_frames as usize)?;
                SampleSource::Resampled(resampler)
            }
            None => {
                if adapter.rate() != spec.rate.as_hz() {
                    warn!(
                        source_rate = adapter.rate(),
                        device_rate = spec.rate.as_hz(),
                        "stream has no resampler and will play pitch-shifted"
                    );
                }
                SampleSource::Direct(adapter)
            }
        };
        inner.source = Some(source);
        Ok(())
    }

    /// Start playback
    ///
    /// `iterations` of 0 loops forever; `n >= 1` plays the source `n` times.
    /// A nonzero `fade_in` ramps the volume from silence. Playing an already
    /// playing stream is a no-op.
    pub fn play(&self, iterations: u32, fade_in: Duration) -> Result<()> {
        match mixer::with_active(|core| {
            let mut inner = self.inner.lock().unwrap();
            if inner.source.is_none() {
                return Err(PlaybackError::StreamNotOpen);
            }
            if inner.playing {
                return Ok(());
            }
            inner.wanted_iterations = iterations;
            inner.current_iteration = 0;
            inner.paused = false;
            if fade_in.is_zero() {
                inner.fade.reset_full();
            } else {
                inner.fade.begin_fade_in(fade_in, Instant::now());
            }
            inner.playing = true;
            core.attach(self.inner.clone());
            Ok(())
        }) {
            Some(result) => result,
            None => Err(PlaybackError::NotInitialized),
        }
    }

    /// Stop playback
    ///
    /// With a zero `fade_out` the stream is removed from the mixer before
    /// this returns. Otherwise it enters a fade-out and is removed when the
    /// fade completes, firing the finish callback.
    pub fn stop(&self, fade_out: Duration) -> Result<()> {
        match mixer::with_active(|core| {
            let mut inner = self.inner.lock().unwrap();
            if !inner.playing {
                return Ok(());
            }
            if fade_out.is_zero() {
                core.detach(&self.inner);
                inner.stop_now();
            } else {
                inner.fade.begin_fade_out(fade_out, true, Instant::now());
            }
            Ok(())
        }) {
            Some(result) => result,
            None => Err(PlaybackError::NotInitialized),
        }
    }

    /// Pause playback, optionally fading out first
    pub fn pause(&self, fade_out: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if inner.paused || !inner.playing {
            return;
        }
        if fade_out.is_zero() {
            inner.paused = true;
        } else {
            inner.fade.begin_fade_out(fade_out, false, Instant::now());
        }
    }

    /// Resume a paused stream, optionally fading back in
    ///
    /// Also cancels a pause-directed fade-out that has not completed yet.
    pub fn resume(&self, fade_in: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if inner.paused {
            inner.paused = false;
            if fade_in.is_zero() {
                inner.fade.reset_full();
            } else {
                inner.fade.begin_fade_in(fade_in, Instant::now());
            }
        } else if inner.fade.is_fading_out() {
            inner.fade.begin_fade_in(fade_in, Instant::now());
        }
    }

    /// Rewind to the beginning of the source
    pub fn rewind(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let source = inner.source.as_mut().ok_or(PlaybackError::StreamNotOpen)?;
        source.rewind()?;
        Ok(())
    }

    /// Seek to a position from the start of the source
    pub fn seek_to_time(&self, position: Duration) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let source = inner.source.as_mut().ok_or(PlaybackError::StreamNotOpen)?;
        source.seek_to_time(position)?;
        Ok(())
    }

    /// Silence the stream without changing its volume setting
    pub fn mute(&self) {
        self.inner.lock().unwrap().muted = true;
    }

    /// Undo [`Stream::mute`]
    pub fn unmute(&self) {
        self.inner.lock().unwrap().muted = false;
    }

    /// Whether the stream is muted
    pub fn is_muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    /// Set the volume; values below zero are clamped
    ///
    /// 1.0 is unity gain. Values above 1.0 amplify and may clip in the
    /// device format conversion.
    pub fn set_volume(&self, volume: f32) {
        self.inner.lock().unwrap().volume = volume.max(0.0);
    }

    /// Current volume
    pub fn volume(&self) -> f32 {
        self.inner.lock().unwrap().volume
    }

    /// Set the stereo position: -1.0 full left, 0.0 centered, +1.0 full right
    pub fn set_stereo_position(&self, position: f32) {
        self.inner.lock().unwrap().stereo_pos = position.clamp(-1.0, 1.0);
    }

    /// Current stereo position
    pub fn stereo_position(&self) -> f32 {
        self.inner.lock().unwrap().stereo_pos
    }

    /// Append a processor to the chain; returns its removal handle
    pub fn add_processor(&self, processor: Box<dyn Processor>) -> ProcessorId {
        let mut inner = self.inner.lock().unwrap();
        let id = ProcessorId(inner.next_processor_id);
        inner.next_processor_id += 1;
        inner.processors.push((id, processor));
        id
    }

    /// Remove a processor; returns whether it was present
    pub fn remove_processor(&self, id: ProcessorId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.processors.len();
        inner.processors.retain(|(pid, _)| *pid != id);
        inner.processors.len() != before
    }

    /// Remove every processor
    pub fn clear_processors(&self) {
        self.inner.lock().unwrap().processors.clear();
    }

    /// Set the callback fired when playback finishes
    ///
    /// Runs on the audio callback thread: keep it short, and do not start,
    /// stop, or drop streams from inside it. Adjusting volume or position of
    /// this stream is fine.
    pub fn set_finish_callback<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().unwrap().finish_callback = Some(Box::new(callback));
    }

    /// Drop the finish callback
    pub fn clear_finish_callback(&self) {
        self.inner.lock().unwrap().finish_callback = None;
    }

    /// Set the callback fired each time the source loops
    ///
    /// Same realtime constraints as [`Stream::set_finish_callback`].
    pub fn set_loop_callback<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().unwrap().loop_callback = Some(Box::new(callback));
    }

    /// Drop the loop callback
    pub fn clear_loop_callback(&self) {
        self.inner.lock().unwrap().loop_callback = None;
    }

    /// Whether [`Stream::open`] succeeded
    pub fn is_open(&self) -> bool {
        self.inner.lock().unwrap().source.is_some()
    }

    /// Whether the stream is in the mixer's active list
    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().playing
    }

    /// Whether the stream is paused
    pub fn is_paused(&self) -> bool {
        self.inner.lock().unwrap().paused
    }

    /// Requested play count; 0 means loop forever
    pub fn wanted_iterations(&self) -> u32 {
        self.inner.lock().unwrap().wanted_iterations
    }

    /// Completed play count within the current [`Stream::play`]
    pub fn current_iteration(&self) -> u32 {
        self.inner.lock().unwrap().current_iteration
    }

    /// Source duration, if the decoder can tell
    pub fn duration(&self) -> Option<Duration> {
        self.inner
            .lock()
            .unwrap()
            .source
            .as_ref()
            .and_then(SampleSource::duration)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        mixer::with_active(|core| core.detach(&self.inner));
        if let Ok(mut inner) = self.inner.lock() {
            inner.playing = false;
        }
    }
}
