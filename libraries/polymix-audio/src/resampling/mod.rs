//! Pull-based sample rate conversion
//!
//! [`StreamResampler`] bridges a decoder producing samples at one rate to a
//! consumer demanding samples at another. It owns the decoder, buffers its
//! output, hands buffered spans to a pluggable [`ResampleKernel`], and yields
//! converted samples on demand. Mid-stream rate changes are absorbed without
//! dropping or duplicating samples: buffered audio is flushed with the old
//! ratio before the new one takes effect.
//!
//! The kernel does the actual DSP; [`RubatoKernel`] is the stock
//! implementation.

mod rubato_kernel;

pub use rubato_kernel::{KernelQuality, RubatoKernel};

use tracing::{debug, warn};

use crate::decoder::DecoderAdapter;
use crate::error::Result;

/// Source rates are clamped to this range before any buffer math
pub const MIN_SOURCE_RATE: u32 = 4_000;
/// Upper bound of the accepted source rate range
pub const MAX_SOURCE_RATE: u32 = 192_000;

/// Resampling DSP kernel
///
/// The resampler calls [`ResampleKernel::adjust_for_output_spec`] whenever
/// either rate changes, giving the kernel a chance to rebuild internal
/// state, then feeds it input spans through [`ResampleKernel::resample`].
pub trait ResampleKernel: Send {
    /// Rebuild internal state for a new rate pair
    fn adjust_for_output_spec(&mut self, dst_rate: u32, src_rate: u32, channels: u16)
        -> Result<()>;

    /// Convert input samples
    ///
    /// Writes at most `dst.len()` samples and returns `(produced, consumed)`.
    /// A kernel may buffer internally: consuming everything while producing
    /// nothing is valid, the converted samples just arrive on a later call.
    fn resample(&mut self, dst: &mut [f32], src: &[f32]) -> (usize, usize);
}

/// Move any samples in `buf[pos..end]` to the beginning
///
/// ```text
/// ....ssss  ->  ssss....
/// ```
///
/// The tracking cursors are adjusted to match.
fn relocate(buf: &mut [f32], pos: &mut usize, end: &mut usize) {
    if *end == 0 {
        return;
    }
    if *pos >= *end {
        *pos = 0;
        *end = 0;
        return;
    }
    if *pos == 0 {
        return;
    }
    let len = *end - *pos;
    buf.copy_within(*pos..*end, 0);
    *pos = 0;
    *end = len;
}

/// Stateful rate converter owning its decoder
pub struct StreamResampler {
    decoder: DecoderAdapter,
    kernel: Box<dyn ResampleKernel>,
    dst_rate: u32,
    src_rate: u32,
    channels: u16,
    chunk_size: usize,
    out_buf: Vec<f32>,
    in_buf: Vec<f32>,
    out_pos: usize,
    out_end: usize,
    in_pos: usize,
    in_end: usize,
    pending_spec_change: bool,
}

impl StreamResampler {
    /// Create an unconfigured resampler; call [`StreamResampler::set_spec`]
    /// before pulling samples
    pub fn new(decoder: DecoderAdapter, kernel: Box<dyn ResampleKernel>) -> Self {
        Self {
            decoder,
            kernel,
            dst_rate: 0,
            src_rate: 0,
            channels: 0,
            chunk_size: 0,
            out_buf: Vec::new(),
            in_buf: Vec::new(),
            out_pos: 0,
            out_end: 0,
            in_pos: 0,
            in_end: 0,
            pending_spec_change: false,
        }
    }

    /// Configure for an output spec
    ///
    /// `chunk_size` is the number of output frames produced per refill.
    /// The source rate is re-read from the decoder and clamped to
    /// [`MIN_SOURCE_RATE`]..=[`MAX_SOURCE_RATE`]. Samples already held in
    /// the input buffer survive the reconfiguration.
    pub fn set_spec(&mut self, dst_rate: u32, channels: u16, chunk_size: usize) -> Result<()> {
        self.dst_rate = dst_rate;
        self.channels = channels;
        self.chunk_size = chunk_size;
        self.src_rate = self.decoder.rate().clamp(MIN_SOURCE_RATE, MAX_SOURCE_RATE);
        self.adjust_buffer_sizes();
        self.kernel
            .adjust_for_output_spec(self.dst_rate, self.src_rate, self.channels)
    }

    /// Destination sample rate in Hz
    pub fn dst_rate(&self) -> u32 {
        self.dst_rate
    }

    /// Current (clamped) source sample rate in Hz
    pub fn src_rate(&self) -> u32 {
        self.src_rate
    }

    /// Configured channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Configured output frames per refill
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Replace the decoder feeding this resampler
    ///
    /// Buffered samples from the previous decoder are discarded. Call
    /// [`StreamResampler::set_spec`] afterwards so the new source rate is
    /// picked up.
    pub fn set_decoder(&mut self, decoder: DecoderAdapter) {
        self.decoder = decoder;
        self.in_pos = 0;
        self.in_end = 0;
        self.out_pos = 0;
        self.out_end = 0;
        self.pending_spec_change = false;
    }

    /// The owned decoder
    pub fn decoder(&self) -> &DecoderAdapter {
        &self.decoder
    }

    /// Mutable access to the owned decoder
    pub fn decoder_mut(&mut self) -> &mut DecoderAdapter {
        &mut self.decoder
    }

    /// Pull up to `dst.len()` converted samples
    ///
    /// Returns the number of samples written. Once configured this never
    /// fails; a short count means true end of stream.
    pub fn resample(&mut self, dst: &mut [f32]) -> usize {
        let dst_len = dst.len();
        let mut total = 0;
        let mut dec_eof = false;

        if self.pending_spec_change {
            // Flush what the buffers still hold at the old ratio.
            if self.flush_buffered(dst, &mut total) {
                // Output still backed up; keep the old spec for now.
                return dst_len;
            }
            self.apply_current_spec();
            self.pending_spec_change = false;
        }

        // Keep converting until the request is satisfied or the decoder has
        // nothing left.
        while total < dst_len && !dec_eof {
            let progress_mark = (total, self.in_pos, self.in_end, self.out_pos, self.out_end);

            if self.in_end < self.in_buf.len() {
                let decoded = {
                    let in_end = self.in_end;
                    self.decoder.decode(&mut self.in_buf[in_end..])
                };
                if decoded.spec_changed {
                    // Convert what is buffered with the old ratio first.
                    self.in_end += decoded.written;
                    if self.flush_buffered(dst, &mut total) {
                        self.pending_spec_change = true;
                        return dst_len;
                    }
                    self.apply_current_spec();
                    continue;
                }
                if decoded.written == 0 {
                    dec_eof = true;
                } else {
                    self.in_end += decoded.written;
                }
            }

            self.resample_from_in_buffer();
            relocate(&mut self.in_buf, &mut self.in_pos, &mut self.in_end);
            total += self.move_from_out_buffer(&mut dst[total..]);
            relocate(&mut self.out_buf, &mut self.out_pos, &mut self.out_end);

            if !dec_eof
                && progress_mark == (total, self.in_pos, self.in_end, self.out_pos, self.out_end)
            {
                // A kernel that neither consumes nor produces would spin here.
                warn!("resampler made no progress, returning short");
                break;
            }
        }
        if dec_eof && total < dst_len {
            // End of stream: hand over everything still sitting in the
            // buffers before reporting short.
            self.flush_buffered(dst, &mut total);
        }
        total
    }

    /// Drain both buffers at the current ratio into `dst`
    ///
    /// Converts buffered input as output room frees up, so no sample decoded
    /// under the old spec is ever re-ratioed under the new one. Returns true
    /// if `dst` filled before the buffers emptied.
    fn flush_buffered(&mut self, dst: &mut [f32], total: &mut usize) -> bool {
        loop {
            *total += self.move_from_out_buffer(&mut dst[*total..]);
            relocate(&mut self.out_buf, &mut self.out_pos, &mut self.out_end);
            if *total >= dst.len() {
                return true;
            }
            if self.in_end == 0 && self.out_end == 0 {
                return false;
            }
            let before = (self.in_pos, self.in_end, self.out_end);
            self.resample_from_in_buffer();
            if before == (self.in_pos, self.in_end, self.out_end) {
                // Whatever is left, the kernel is not releasing it.
                return false;
            }
        }
    }

    /// Re-apply the stored output spec after a source rate change
    fn apply_current_spec(&mut self) {
        let (dst_rate, channels, chunk_size) = (self.dst_rate, self.channels, self.chunk_size);
        debug!(dst_rate, "reconfiguring for new source rate");
        if let Err(e) = self.set_spec(dst_rate, channels, chunk_size) {
            warn!("kernel rejected new spec: {e}");
        }
    }

    /// Size both buffers for the current rate pair
    ///
    /// Output holds one chunk of frames. When actually resampling, input is
    /// scaled by the rate ratio and rounded up to a whole number of frames.
    fn adjust_buffer_sizes(&mut self) {
        relocate(&mut self.in_buf, &mut self.in_pos, &mut self.in_end);
        let held = self.in_end;

        let channels = self.channels.max(1) as usize;
        let out_size = channels * self.chunk_size;
        let mut in_size = if self.dst_rate == self.src_rate {
            // Plain copy from input to output, so the sizes match.
            out_size
        } else {
            let scaled = out_size as u64 * u64::from(self.src_rate);
            (scaled.div_ceil(u64::from(self.dst_rate))) as usize
        };
        in_size = in_size.max(held);
        let remainder = in_size % channels;
        if remainder != 0 {
            in_size += channels - remainder;
        }

        self.out_buf.clear();
        self.out_buf.resize(out_size, 0.0);
        self.out_pos = 0;
        self.out_end = 0;
        self.in_buf.resize(in_size, 0.0);
        self.in_pos = 0;
        self.in_end = held;
    }

    /// Convert buffered input into the output buffer
    fn resample_from_in_buffer(&mut self) {
        let in_len = self.in_end - self.in_pos;
        if self.src_rate == self.dst_rate {
            // No conversion needed; move the samples across as-is.
            let n = (self.out_buf.len() - self.out_end).min(in_len);
            let (from, to) = (self.in_pos, self.out_end);
            self.out_buf[to..to + n].copy_from_slice(&self.in_buf[from..from + n]);
            self.out_end += n;
            self.in_pos += n;
        } else {
            let (produced, consumed) = self.kernel.resample(
                &mut self.out_buf[self.out_end..],
                &self.in_buf[self.in_pos..self.in_end],
            );
            self.out_end += produced;
            self.in_pos += consumed.min(in_len);
        }
        if self.in_pos >= self.in_end {
            self.in_pos = 0;
            self.in_end = 0;
        }
    }

    /// Move at most `dst.len()` samples out of the output buffer
    fn move_from_out_buffer(&mut self, dst: &mut [f32]) -> usize {
        if self.out_end == 0 {
            return 0;
        }
        if self.out_pos >= self.out_end {
            self.out_pos = 0;
            self.out_end = 0;
            return 0;
        }
        let n = (self.out_end - self.out_pos).min(dst.len());
        dst[..n].copy_from_slice(&self.out_buf[self.out_pos..self.out_pos + n]);
        self.out_pos += n;
        if self.out_pos >= self.out_end {
            self.out_pos = 0;
            self.out_end = 0;
        }
        n
    }

    #[cfg(test)]
    fn buffer_state(&self) -> (usize, usize, usize, usize, usize, usize) {
        (
            self.in_pos,
            self.in_end,
            self.in_buf.len(),
            self.out_pos,
            self.out_end,
            self.out_buf.len(),
        )
    }
}
