//! Symphonia-backed decoder
//!
//! Streams packets from any [`SharedSource`] through Symphonia's probe and
//! codec machinery, delivering interleaved f32 samples. Format support is
//! selected with the crate's cargo features (`mp3`, `flac`, `ogg`, `wav`,
//! `aac`), which map directly onto Symphonia's codec features.

use polymix_core::{AudioDecoder, CoreError, Decoded, SharedSource};
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder as CodecDecoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::{debug, warn};

use crate::error::{AudioError, Result};
use crate::registry::{DecoderFactory, DetectionTier};

/// Bridges a [`SharedSource`] to Symphonia's media source interface
struct MediaSourceAdapter(SharedSource);

impl Read for MediaSourceAdapter {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Seek for MediaSourceAdapter {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.0.seek(pos)
    }
}

impl MediaSource for MediaSourceAdapter {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.0.byte_len()
    }
}

/// Streaming decoder over Symphonia
pub struct SymphoniaDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn CodecDecoder>,
    track_id: u32,
    time_base: Option<TimeBase>,
    n_frames: Option<u64>,
    rate: u32,
    channels: u16,
    sample_buf: Option<SampleBuffer<f32>>,
    sample_buf_spec: Option<SignalSpec>,
    leftover: Vec<f32>,
    leftover_pos: usize,
    pending_spec: Option<(u32, u16)>,
    at_end: bool,
}

impl SymphoniaDecoder {
    /// Probe the source and open a decoder for its default track
    pub fn open(source: SharedSource) -> Result<Self> {
        let mss = MediaSourceStream::new(
            Box::new(MediaSourceAdapter(source)),
            Default::default(),
        );
        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let probed = symphonia::default::get_probe()
            .format(&Hint::new(), mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| AudioError::Decode(format!("probe failed: {e}")))?;
        let reader = probed.format;

        let (track_id, codec_params) = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .map(|t| (t.id, t.codec_params.clone()))
            .ok_or_else(|| AudioError::Decode("no playable track".into()))?;

        let rate = codec_params
            .sample_rate
            .ok_or_else(|| AudioError::Decode("unknown sample rate".into()))?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);
        if !(1..=2).contains(&channels) {
            return Err(AudioError::Core(CoreError::UnsupportedFormat(format!(
                "{channels} channels"
            ))));
        }

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Decode(format!("no codec: {e}")))?;

        debug!(rate, channels, "opened symphonia decoder");

        Ok(Self {
            reader,
            decoder,
            track_id,
            time_base: codec_params.time_base,
            n_frames: codec_params.n_frames,
            rate,
            channels,
            sample_buf: None,
            sample_buf_spec: None,
            leftover: Vec::new(),
            leftover_pos: 0,
            pending_spec: None,
            at_end: false,
        })
    }

    /// Interleave a decoded packet into the leftover buffer
    fn stash(
        sample_buf: &mut Option<SampleBuffer<f32>>,
        sample_buf_spec: &mut Option<SignalSpec>,
        leftover: &mut Vec<f32>,
        decoded: AudioBufferRef<'_>,
    ) {
        let spec = *decoded.spec();
        let frames = decoded.capacity() as u64;

        let fits = match (&sample_buf, *sample_buf_spec) {
            (Some(buf), Some(buf_spec)) => {
                buf_spec == spec && buf.capacity() >= decoded.capacity() * spec.channels.count()
            }
            _ => false,
        };
        if !fits {
            *sample_buf = Some(SampleBuffer::new(frames, spec));
            *sample_buf_spec = Some(spec);
        }
        if let Some(sample_buf) = sample_buf.as_mut() {
            sample_buf.copy_interleaved_ref(decoded);
            leftover.extend_from_slice(sample_buf.samples());
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&mut self, buf: &mut [f32]) -> polymix_core::Result<Decoded> {
        if let Some((rate, channels)) = self.pending_spec.take() {
            self.rate = rate;
            self.channels = channels;
        }

        let mut written = 0;
        loop {
            if self.leftover_pos < self.leftover.len() {
                let n = (buf.len() - written).min(self.leftover.len() - self.leftover_pos);
                buf[written..written + n]
                    .copy_from_slice(&self.leftover[self.leftover_pos..self.leftover_pos + n]);
                written += n;
                self.leftover_pos += n;
                if self.leftover_pos >= self.leftover.len() {
                    self.leftover.clear();
                    self.leftover_pos = 0;
                }
            }
            if written == buf.len() || self.at_end {
                return Ok(Decoded::written(written));
            }

            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.at_end = true;
                    continue;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("format reader requires reset, treating as end of stream");
                    self.at_end = true;
                    continue;
                }
                Err(e) => return Err(CoreError::Decode(format!("packet read failed: {e}"))),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("skipping undecodable packet: {e}");
                    continue;
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.at_end = true;
                    continue;
                }
                Err(e) => return Err(CoreError::Decode(format!("decode failed: {e}"))),
            };

            let spec = *decoded.spec();
            let new_rate = spec.rate;
            let new_channels = spec.channels.count() as u16;
            if new_rate != self.rate || new_channels != self.channels {
                debug!(
                    from_rate = self.rate,
                    to_rate = new_rate,
                    from_channels = self.channels,
                    to_channels = new_channels,
                    "mid-stream spec change"
                );
                self.pending_spec = Some((new_rate, new_channels));
                Self::stash(
                    &mut self.sample_buf,
                    &mut self.sample_buf_spec,
                    &mut self.leftover,
                    decoded,
                );
                return Ok(Decoded {
                    written,
                    spec_changed: true,
                });
            }
            Self::stash(
                &mut self.sample_buf,
                &mut self.sample_buf_spec,
                &mut self.leftover,
                decoded,
            );
        }
    }

    fn rewind(&mut self) -> polymix_core::Result<()> {
        self.seek_to_time(Duration::ZERO)
    }

    fn seek_to_time(&mut self, position: Duration) -> polymix_core::Result<()> {
        let time = Time::new(
            position.as_secs(),
            f64::from(position.subsec_nanos()) / 1_000_000_000.0,
        );
        self.reader
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| CoreError::Seek(e.to_string()))?;
        self.decoder.reset();
        self.leftover.clear();
        self.leftover_pos = 0;
        self.pending_spec = None;
        self.at_end = false;
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn duration(&self) -> Option<Duration> {
        let time_base = self.time_base?;
        let time = time_base.calc_time(self.n_frames?);
        Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
    }

    fn is_at_end(&self) -> bool {
        self.at_end && self.leftover_pos >= self.leftover.len()
    }
}

/// Registers the Symphonia decoder with the auto-detection table
pub struct SymphoniaFactory;

impl DecoderFactory for SymphoniaFactory {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn tier(&self) -> DetectionTier {
        DetectionTier::Structured
    }

    fn open(&self, source: SharedSource) -> Result<Box<dyn AudioDecoder>> {
        Ok(Box::new(SymphoniaDecoder::open(source)?))
    }
}
