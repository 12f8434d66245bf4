//! Decoders
//!
//! Format decoders produce whatever channel layout the file has; the mixer
//! wants samples in the output device's layout. [`DecoderAdapter`] sits
//! between the two and expands mono to stereo or folds stereo down to mono
//! as needed. Counts returned by [`DecoderAdapter::decode`] are always in
//! the output layout.
//!
//! The stock format decoder lives in [`symphonia`].

pub mod symphonia;

use polymix_core::{AudioDecoder, Decoded};
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

/// Expand mono samples to stereo pairs, in place
///
/// The first `n` slots of `buf` hold mono samples; afterwards the first
/// `2 * n` slots hold each sample duplicated into an (L, R) pair. Walks
/// backward so the expansion never overwrites samples it has not read yet.
fn mono_to_stereo(buf: &mut [f32], n: usize) {
    for i in (0..n).rev() {
        let s = buf[i];
        buf[2 * i] = s;
        buf[2 * i + 1] = s;
    }
}

/// Average interleaved stereo pairs down to mono
///
/// Reads `src_len` samples from `src` and writes `src_len / 2` to `dst`.
fn stereo_to_mono(dst: &mut [f32], src: &[f32], src_len: usize) {
    for j in 0..src_len / 2 {
        dst[j] = src[2 * j] * 0.5 + src[2 * j + 1] * 0.5;
    }
}

/// Decoder wrapper that delivers samples in the output channel layout
pub struct DecoderAdapter {
    inner: Box<dyn AudioDecoder>,
    out_channels: u16,
    stereo_scratch: Vec<f32>,
}

impl DecoderAdapter {
    /// Wrap a decoder, adapting its channel count to `out_channels`
    pub fn new(inner: Box<dyn AudioDecoder>, out_channels: u16) -> Self {
        Self {
            inner,
            out_channels,
            stereo_scratch: Vec::new(),
        }
    }

    /// Decode up to `buf.len()` samples in the output layout
    ///
    /// Decoder errors mid-stream are logged and reported as end of stream,
    /// so the realtime pull path never sees an error.
    pub fn decode(&mut self, buf: &mut [f32]) -> Decoded {
        match self.decode_adapted(buf) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("decoder error treated as end of stream: {e}");
                Decoded::end_of_stream()
            }
        }
    }

    fn decode_adapted(&mut self, buf: &mut [f32]) -> Result<Decoded> {
        let src_channels = self.inner.channels();

        if src_channels == 1 && self.out_channels == 2 {
            let half = buf.len() / 2;
            let d = self.inner.decode(&mut buf[..half])?;
            mono_to_stereo(buf, d.written);
            return Ok(Decoded {
                written: d.written * 2,
                spec_changed: d.spec_changed,
            });
        }

        if src_channels == 2 && self.out_channels == 1 {
            let need = buf.len() * 2;
            if self.stereo_scratch.len() != need {
                self.stereo_scratch.resize(need, 0.0);
            }
            let d = self.inner.decode(&mut self.stereo_scratch[..need])?;
            stereo_to_mono(buf, &self.stereo_scratch, d.written);
            return Ok(Decoded {
                written: d.written / 2,
                spec_changed: d.spec_changed,
            });
        }

        Ok(self.inner.decode(buf)?)
    }

    /// Sample rate of the underlying decoder in Hz
    pub fn rate(&self) -> u32 {
        self.inner.rate()
    }

    /// Channel count of the underlying decoder
    pub fn source_channels(&self) -> u16 {
        self.inner.channels()
    }

    /// Channel count this adapter delivers
    pub fn out_channels(&self) -> u16 {
        self.out_channels
    }

    /// Rewind the underlying decoder
    pub fn rewind(&mut self) -> Result<()> {
        Ok(self.inner.rewind()?)
    }

    /// Seek the underlying decoder
    pub fn seek_to_time(&mut self, position: Duration) -> Result<()> {
        Ok(self.inner.seek_to_time(position)?)
    }

    /// Total duration, if the format can tell
    pub fn duration(&self) -> Option<Duration> {
        self.inner.duration()
    }

    /// Whether the underlying decoder is exhausted
    pub fn is_at_end(&self) -> bool {
        self.inner.is_at_end()
    }
}
