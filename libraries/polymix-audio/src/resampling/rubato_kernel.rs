//! Rubato-backed resampling kernel
//!
//! Wraps rubato's fixed-input-chunk resamplers behind the free-form
//! [`ResampleKernel`] interface. Rubato wants whole chunks of planar frames;
//! the kernel deinterleaves incoming spans into a pending planar buffer,
//! processes full chunks as they accumulate, and carries converted samples
//! until the caller has room for them.

use rubato::{
    FastFixedIn, PolynomialDegree, Resampler as RubatoResampler, SincFixedIn,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::collections::VecDeque;
use tracing::warn;

use super::ResampleKernel;
use crate::error::{AudioError, Result};

/// Frames per rubato processing chunk
const CHUNK_FRAMES: usize = 512;

/// Conversion quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelQuality {
    /// Polynomial interpolation, cheapest
    Fast,
    /// Windowed sinc, good quality for realtime playback
    #[default]
    Balanced,
    /// Longer sinc, for critical listening
    High,
}

impl KernelQuality {
    fn sinc_parameters(self) -> SincInterpolationParameters {
        match self {
            // Fast never builds a sinc resampler.
            Self::Fast | Self::Balanced => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris,
            },
            Self::High => SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.97,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
        }
    }
}

enum Backend {
    Fast(FastFixedIn<f32>),
    Sinc(SincFixedIn<f32>),
}

/// Rubato resampling kernel
pub struct RubatoKernel {
    quality: KernelQuality,
    backend: Option<Backend>,
    channels: usize,
    /// Incoming samples, planar, waiting to fill a chunk
    pending_in: Vec<Vec<f32>>,
    /// Planar output scratch sized by rubato
    out_scratch: Vec<Vec<f32>>,
    /// Converted interleaved samples not yet claimed by the caller
    carry: VecDeque<f32>,
}

impl RubatoKernel {
    /// Create a kernel with the given quality preset
    pub fn new(quality: KernelQuality) -> Self {
        Self {
            quality,
            backend: None,
            channels: 0,
            pending_in: Vec::new(),
            out_scratch: Vec::new(),
            carry: VecDeque::new(),
        }
    }

    fn build_backend(&self, dst_rate: u32, src_rate: u32, channels: usize) -> Result<Backend> {
        let ratio = f64::from(dst_rate) / f64::from(src_rate);
        let backend = match self.quality {
            KernelQuality::Fast => Backend::Fast(
                FastFixedIn::new(ratio, 1.0, PolynomialDegree::Septic, CHUNK_FRAMES, channels)
                    .map_err(|e| AudioError::Resample(e.to_string()))?,
            ),
            KernelQuality::Balanced | KernelQuality::High => Backend::Sinc(
                SincFixedIn::new(
                    ratio,
                    1.0,
                    self.quality.sinc_parameters(),
                    CHUNK_FRAMES,
                    channels,
                )
                .map_err(|e| AudioError::Resample(e.to_string()))?,
            ),
        };
        Ok(backend)
    }
}

impl ResampleKernel for RubatoKernel {
    fn adjust_for_output_spec(
        &mut self,
        dst_rate: u32,
        src_rate: u32,
        channels: u16,
    ) -> Result<()> {
        let channels = channels.max(1) as usize;
        let backend = self.build_backend(dst_rate, src_rate, channels)?;
        self.out_scratch = match &backend {
            Backend::Fast(r) => r.output_buffer_allocate(true),
            Backend::Sinc(r) => r.output_buffer_allocate(true),
        };
        self.backend = Some(backend);
        self.channels = channels;
        self.pending_in = vec![Vec::with_capacity(CHUNK_FRAMES * 2); channels];
        self.carry.clear();
        Ok(())
    }

    fn resample(&mut self, dst: &mut [f32], src: &[f32]) -> (usize, usize) {
        let Some(backend) = self.backend.as_mut() else {
            return (0, 0);
        };

        // Stash the input, planar.
        for frame in src.chunks_exact(self.channels) {
            for (channel, &sample) in self.pending_in.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        // Convert every whole chunk we now hold.
        while self.pending_in[0].len() >= CHUNK_FRAMES {
            let chunk: Vec<&[f32]> = self
                .pending_in
                .iter()
                .map(|channel| &channel[..CHUNK_FRAMES])
                .collect();
            let processed = match backend {
                Backend::Fast(r) => r.process_into_buffer(&chunk, &mut self.out_scratch, None),
                Backend::Sinc(r) => r.process_into_buffer(&chunk, &mut self.out_scratch, None),
            };
            let (frames_in, frames_out) = match processed {
                Ok(counts) => counts,
                Err(e) => {
                    warn!("rubato processing failed: {e}");
                    break;
                }
            };
            for channel in self.pending_in.iter_mut() {
                channel.drain(..frames_in);
            }
            for frame in 0..frames_out {
                for channel in &self.out_scratch {
                    self.carry.push_back(channel[frame]);
                }
            }
        }

        // Hand over what fits.
        let produced = dst.len().min(self.carry.len());
        for slot in dst[..produced].iter_mut() {
            // carry.len() >= produced, so the queue cannot run dry here
            *slot = self.carry.pop_front().unwrap_or(0.0);
        }
        (produced, src.len())
    }
}
