//! The mixer
//!
//! A process-wide singleton bound to one output device. [`init`] opens the
//! device and wires its realtime callback to the mix routine; [`quit`] tears
//! everything down. Streams register themselves through [`Stream::play`]
//! (see [`crate::stream`]).
//!
//! # Concurrency
//!
//! One coarse lock guards the mixer state and doubles as the audio lock:
//! the device callback holds it for the duration of a mix, and every control
//! operation that touches the active list acquires it, so list mutations are
//! never observed mid-callback. Per-stream scalars (volume, position, mute,
//! pause) only take the stream's own lock and are picked up no later than
//! the next callback.
//!
//! [`Stream::play`]: crate::Stream::play

use polymix_core::{AudioSpec, DeviceCallback, OutputDevice};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

use crate::convert::{converter_for, SampleConverter};
use crate::error::{PlaybackError, Result};
use crate::fade::FadeStep;
use crate::stream::SharedStream;

/// The one mixer per process, while initialized
static ACTIVE: Mutex<Option<ActiveMixer>> = Mutex::new(None);

struct ActiveMixer {
    core: Arc<Mutex<MixerCore>>,
    device: Box<dyn OutputDevice>,
}

/// Mixer state shared with the device callback
pub(crate) struct MixerCore {
    spec: AudioSpec,
    converter: Option<SampleConverter>,
    bytes_per_sample: usize,
    streams: Vec<SharedStream>,
    final_mix: Vec<f32>,
    strm_buf: Vec<f32>,
    proc_buf: Vec<f32>,
}

impl MixerCore {
    fn new(spec: AudioSpec) -> Self {
        Self {
            spec,
            converter: None,
            bytes_per_sample: spec.format.bytes_per_sample(),
            streams: Vec::new(),
            final_mix: Vec::new(),
            strm_buf: Vec::new(),
            proc_buf: Vec::new(),
        }
    }

    /// Record the negotiated spec and pre-size the scratch buffers
    fn configure(&mut self, negotiated: AudioSpec) {
        self.spec = negotiated;
        self.converter = Some(converter_for(negotiated.format));
        self.bytes_per_sample = negotiated.format.bytes_per_sample();
        let samples = negotiated.samples_per_buffer();
        self.final_mix = vec![0.0; samples];
        self.strm_buf = vec![0.0; samples];
        self.proc_buf = vec![0.0; samples];
    }

    pub(crate) fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Add a stream to the active list, once
    pub(crate) fn attach(&mut self, stream: SharedStream) {
        if !self.streams.iter().any(|s| Arc::ptr_eq(s, &stream)) {
            self.streams.push(stream);
        }
    }

    /// Remove a stream from the active list
    pub(crate) fn detach(&mut self, stream: &SharedStream) {
        self.streams.retain(|s| !Arc::ptr_eq(s, stream));
    }

    #[cfg(test)]
    pub(crate) fn active_count(&self) -> usize {
        self.streams.len()
    }

    /// The realtime mix routine; always fills every byte of `out`
    pub(crate) fn run_callback(&mut self, out: &mut [u8]) {
        let Some(converter) = self.converter else {
            out.fill(0);
            return;
        };
        let wanted = out.len() / self.bytes_per_sample;
        if self.strm_buf.len() != wanted {
            // Sizing is supposed to happen once, at init, from the
            // negotiated spec.
            warn!(
                have = self.strm_buf.len(),
                wanted, "device buffer size changed, resizing scratch buffers in the callback"
            );
            self.final_mix.resize(wanted, 0.0);
            self.strm_buf.resize(wanted, 0.0);
            self.proc_buf.resize(wanted, 0.0);
        }

        self.final_mix.fill(0.0);

        // Iterate over a copy of the stream list; finished streams get
        // removed from the canonical one as we go.
        let snapshot: Vec<SharedStream> = self.streams.clone();
        let now = Instant::now();
        let channels = self.spec.channels;
        let mut finished: Vec<SharedStream> = Vec::new();

        for stream in &snapshot {
            let outcome = mix_stream(
                &mut self.final_mix,
                &mut self.strm_buf,
                &mut self.proc_buf,
                stream,
                channels,
                now,
            );
            if outcome == StreamOutcome::Finished {
                finished.push(stream.clone());
            }
        }
        for stream in &finished {
            self.detach(stream);
        }

        let usable = wanted * self.bytes_per_sample;
        converter(&mut out[..usable], &self.final_mix);
        // A buffer that is not a whole number of samples gets a silent tail.
        out[usable..].fill(0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamOutcome {
    Skipped,
    Mixed,
    Finished,
}

/// Pull, process, and mix one stream into the final mix
fn mix_stream(
    final_mix: &mut [f32],
    strm_buf: &mut [f32],
    proc_buf: &mut [f32],
    stream: &SharedStream,
    channels: u16,
    now: Instant,
) -> StreamOutcome {
    let wanted = strm_buf.len();
    let mut inner = stream.lock().unwrap();

    if inner.wanted_iterations != 0 && inner.current_iteration >= inner.wanted_iterations {
        return StreamOutcome::Skipped;
    }
    if inner.paused || !inner.playing {
        return StreamOutcome::Skipped;
    }
    let Some(mut source) = inner.source.take() else {
        return StreamOutcome::Skipped;
    };

    let mut has_finished = false;
    let mut has_looped = false;
    let mut len = 0usize;
    let mut stalled_pulls = 0u32;

    while len < wanted {
        let pulled = source.pull(&mut strm_buf[len..wanted]);
        len += pulled;
        if len >= wanted {
            break;
        }
        if pulled == 0 {
            stalled_pulls += 1;
            if stalled_pulls > 1 {
                // The source produces nothing even after a rewind; stop the
                // stream rather than spin on the realtime thread.
                warn!("stream source stalled, stopping");
                inner.playing = false;
                has_finished = true;
                break;
            }
        } else {
            stalled_pulls = 0;
        }

        // End of source: rewind, then loop or finish.
        if let Err(e) = source.rewind() {
            warn!("rewind at end of source failed: {e}");
        }
        if inner.wanted_iterations != 0 {
            inner.current_iteration += 1;
            if inner.current_iteration >= inner.wanted_iterations {
                inner.playing = false;
                has_finished = true;
                break;
            }
            has_looped = true;
        } else {
            has_looped = true;
        }
    }

    // Processor chain, in insertion order, over the filled region.
    for (_, processor) in inner.processors.iter_mut() {
        processor.process(&mut proc_buf[..len], &strm_buf[..len]);
        strm_buf[..len].copy_from_slice(&proc_buf[..len]);
    }

    match inner.fade.process(now) {
        FadeStep::FinishStop => {
            inner.playing = false;
            if let Err(e) = source.rewind() {
                warn!("rewind after fade-out failed: {e}");
            }
            has_finished = true;
        }
        FadeStep::FinishPause => {
            inner.paused = true;
        }
        FadeStep::Continue => {}
    }
    inner.source = Some(source);

    let fade_gain = inner.fade.gain();
    let mut volume_left = inner.volume * fade_gain;
    let mut volume_right = inner.volume * fade_gain;
    if inner.stereo_pos < 0.0 {
        volume_right *= 1.0 + inner.stereo_pos;
    } else if inner.stereo_pos > 0.0 {
        volume_left *= 1.0 - inner.stereo_pos;
    }

    // Zero-gain streams contribute nothing; skip the mix entirely.
    if !inner.muted && (volume_left > 0.0 || volume_right > 0.0) {
        if channels == 2 {
            if volume_left != 1.0 || volume_right != 1.0 {
                let mut i = 0;
                while i + 1 < len {
                    final_mix[i] += strm_buf[i] * volume_left;
                    final_mix[i + 1] += strm_buf[i + 1] * volume_right;
                    i += 2;
                }
            } else {
                // Unity gain: plain addition, no scaling pass.
                for i in 0..len {
                    final_mix[i] += strm_buf[i];
                }
            }
        } else {
            // Mono device: stereo position does not apply.
            let gain = inner.volume * fade_gain;
            if gain != 1.0 {
                for i in 0..len {
                    final_mix[i] += strm_buf[i] * gain;
                }
            } else {
                for i in 0..len {
                    final_mix[i] += strm_buf[i];
                }
            }
        }
    }

    // Fire the event callback with the stream lock released, so it can
    // adjust this stream's own scalars.
    let pending = if has_finished {
        inner.finish_callback.take().map(|cb| (cb, true))
    } else if has_looped {
        inner.loop_callback.take().map(|cb| (cb, false))
    } else {
        None
    };
    drop(inner);
    if let Some((mut callback, is_finish)) = pending {
        callback();
        let mut inner = stream.lock().unwrap();
        let slot = if is_finish {
            &mut inner.finish_callback
        } else {
            &mut inner.loop_callback
        };
        if slot.is_none() {
            *slot = Some(callback);
        }
    }

    if has_finished {
        StreamOutcome::Finished
    } else {
        StreamOutcome::Mixed
    }
}

/// Initialize the mixer against an output device
///
/// Opens the device with `spec` as a hint, records what was actually
/// negotiated, and starts callback delivery. Only one mixer exists per
/// process; a second call without [`quit`] fails.
pub fn init(spec: AudioSpec, mut device: Box<dyn OutputDevice>) -> Result<()> {
    let mut guard = ACTIVE.lock().unwrap();
    if guard.is_some() {
        return Err(PlaybackError::AlreadyInitialized);
    }
    validate_requested(&spec)?;

    let core = Arc::new(Mutex::new(MixerCore::new(spec)));
    let callback_core = core.clone();
    let callback: DeviceCallback = Box::new(move |out| {
        callback_core.lock().unwrap().run_callback(out);
    });

    let negotiated = device.open(&spec, callback).map_err(PlaybackError::Core)?;
    if !(1..=2).contains(&negotiated.channels) {
        device.close();
        return Err(PlaybackError::UnsupportedSpec(format!(
            "device negotiated {} channels",
            negotiated.channels
        )));
    }

    core.lock().unwrap().configure(negotiated);
    device.resume();

    info!(
        rate = negotiated.rate.as_hz(),
        channels = negotiated.channels,
        format = ?negotiated.format,
        buffer_frames = negotiated.buffer_frames,
        "mixer initialized"
    );
    *guard = Some(ActiveMixer { core, device });
    Ok(())
}

/// Shut the mixer down
///
/// Pauses and closes the device, detaches every stream, and releases the
/// scratch buffers. Stream operations that need the mixer fail with
/// [`PlaybackError::NotInitialized`] afterwards; [`init`] may be called
/// again.
pub fn quit() {
    let taken = ACTIVE.lock().unwrap().take();
    if let Some(mut active) = taken {
        active.device.pause();
        active.device.close();

        let mut core = active.core.lock().unwrap();
        for stream in core.streams.drain(..) {
            if let Ok(mut inner) = stream.lock() {
                inner.playing = false;
            }
        }
        core.converter = None;
        core.final_mix = Vec::new();
        core.strm_buf = Vec::new();
        core.proc_buf = Vec::new();
        info!("mixer shut down");
    }
}

/// Whether [`init`] has succeeded and [`quit`] has not run since
pub fn is_initialized() -> bool {
    ACTIVE.lock().unwrap().is_some()
}

/// The negotiated device spec, while initialized
pub fn device_spec() -> Option<AudioSpec> {
    with_active(|core| core.spec())
}

/// Run a closure against the live mixer state, if any
///
/// Takes the mixer lock, which pauses callback delivery for the duration.
pub(crate) fn with_active<R>(f: impl FnOnce(&mut MixerCore) -> R) -> Option<R> {
    let core = {
        let guard = ACTIVE.lock().unwrap();
        guard.as_ref()?.core.clone()
    };
    let mut core = core.lock().unwrap();
    Some(f(&mut core))
}

fn validate_requested(spec: &AudioSpec) -> Result<()> {
    if !(1..=2).contains(&spec.channels) {
        return Err(PlaybackError::UnsupportedSpec(format!(
            "{} channels",
            spec.channels
        )));
    }
    if spec.buffer_frames == 0 || !spec.buffer_frames.is_power_of_two() {
        return Err(PlaybackError::UnsupportedSpec(format!(
            "buffer of {} frames is not a power of two",
            spec.buffer_frames
        )));
    }
    Ok(())
}
