//! Shared test doubles for the resampler suites
#![allow(dead_code)]

use polymix_audio::ResampleKernel;
use polymix_core::{AudioDecoder, Decoded};
use std::time::Duration;

/// One stretch of a scripted stream, at a fixed spec
pub struct Segment {
    pub rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

/// Decoder that plays scripted segments, announcing a spec change at each
/// segment boundary
pub struct ScriptedDecoder {
    segments: Vec<Segment>,
    seg: usize,
    pos: usize,
}

impl ScriptedDecoder {
    pub fn new(segments: Vec<Segment>) -> Self {
        assert!(!segments.is_empty());
        Self {
            segments,
            seg: 0,
            pos: 0,
        }
    }
}

impl AudioDecoder for ScriptedDecoder {
    fn decode(&mut self, buf: &mut [f32]) -> polymix_core::Result<Decoded> {
        let mut written = 0;
        while written < buf.len() {
            let segment = &self.segments[self.seg];
            let available = segment.samples.len() - self.pos;
            if available == 0 {
                if self.seg + 1 < self.segments.len() {
                    self.seg += 1;
                    self.pos = 0;
                    return Ok(Decoded {
                        written,
                        spec_changed: true,
                    });
                }
                break;
            }
            let n = available.min(buf.len() - written);
            buf[written..written + n]
                .copy_from_slice(&segment.samples[self.pos..self.pos + n]);
            written += n;
            self.pos += n;
        }
        Ok(Decoded::written(written))
    }

    fn rewind(&mut self) -> polymix_core::Result<()> {
        self.seg = 0;
        self.pos = 0;
        Ok(())
    }

    fn seek_to_time(&mut self, _position: Duration) -> polymix_core::Result<()> {
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.segments[self.seg].rate
    }

    fn channels(&self) -> u16 {
        self.segments[self.seg].channels
    }

    fn is_at_end(&self) -> bool {
        self.seg + 1 >= self.segments.len()
            && self.pos >= self.segments[self.seg].samples.len()
    }
}

/// Endless decoder counting 0, 1, 2, ...
pub struct CountingDecoder {
    next: f32,
    rate: u32,
    channels: u16,
}

impl CountingDecoder {
    pub fn new(rate: u32, channels: u16) -> Self {
        Self {
            next: 0.0,
            rate,
            channels,
        }
    }
}

impl AudioDecoder for CountingDecoder {
    fn decode(&mut self, buf: &mut [f32]) -> polymix_core::Result<Decoded> {
        for slot in buf.iter_mut() {
            *slot = self.next;
            self.next += 1.0;
        }
        Ok(Decoded::written(buf.len()))
    }

    fn rewind(&mut self) -> polymix_core::Result<()> {
        self.next = 0.0;
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

/// Exact integer-ratio kernel: repeats every input sample `dst/src` times
///
/// Deterministic by construction, so sample-accounting tests can assert
/// exact sequences across rate changes.
pub struct RepeatKernel {
    factor: usize,
}

impl RepeatKernel {
    pub fn new() -> Self {
        Self { factor: 1 }
    }
}

impl ResampleKernel for RepeatKernel {
    fn adjust_for_output_spec(
        &mut self,
        dst_rate: u32,
        src_rate: u32,
        _channels: u16,
    ) -> polymix_audio::Result<()> {
        assert!(
            dst_rate % src_rate == 0,
            "RepeatKernel only supports integer upsampling ratios"
        );
        self.factor = (dst_rate / src_rate) as usize;
        Ok(())
    }

    fn resample(&mut self, dst: &mut [f32], src: &[f32]) -> (usize, usize) {
        let consumable = src.len().min(dst.len() / self.factor);
        for (i, &s) in src[..consumable].iter().enumerate() {
            for k in 0..self.factor {
                dst[i * self.factor + k] = s;
            }
        }
        (consumable * self.factor, consumable)
    }
}
