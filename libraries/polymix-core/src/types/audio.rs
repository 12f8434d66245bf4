/// Audio-related types
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);
    pub const HIGH_RES_96: Self = Self(96_000);
    pub const HIGH_RES_192: Self = Self(192_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Sample formats the mixer can emit to an output device
///
/// Little- and big-endian variants are spelled out because the mixer writes
/// raw bytes; the desktop backend picks the native-endian variant for the
/// negotiated device format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Signed 8-bit
    S8,
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit, little endian
    S16Le,
    /// Signed 16-bit, big endian
    S16Be,
    /// Signed 32-bit, little endian
    S32Le,
    /// Signed 32-bit, big endian
    S32Be,
    /// 32-bit float, little endian
    F32Le,
    /// 32-bit float, big endian
    F32Be,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::S8 | Self::U8 => 1,
            Self::S16Le | Self::S16Be => 2,
            Self::S32Le | Self::S32Be | Self::F32Le | Self::F32Be => 4,
        }
    }

    /// Whether this is a floating-point format
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32Le | Self::F32Be)
    }

    /// The 32-bit float format in the platform's native byte order
    pub fn f32_native() -> Self {
        if cfg!(target_endian = "big") {
            Self::F32Be
        } else {
            Self::F32Le
        }
    }

    /// The signed 16-bit format in the platform's native byte order
    pub fn s16_native() -> Self {
        if cfg!(target_endian = "big") {
            Self::S16Be
        } else {
            Self::S16Le
        }
    }

    /// The signed 32-bit format in the platform's native byte order
    pub fn s32_native() -> Self {
        if cfg!(target_endian = "big") {
            Self::S32Be
        } else {
            Self::S32Le
        }
    }
}

/// Audio spec requested from, or negotiated with, an output device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSpec {
    /// Device sample format
    pub format: SampleFormat,

    /// Sample rate
    pub rate: SampleRate,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Device buffer size in frames (power of two)
    pub buffer_frames: u32,
}

impl AudioSpec {
    /// Create a new audio spec
    pub fn new(format: SampleFormat, rate: SampleRate, channels: u16, buffer_frames: u32) -> Self {
        Self {
            format,
            rate,
            channels,
            buffer_frames,
        }
    }

    /// Samples (not frames) in one device buffer
    pub fn samples_per_buffer(&self) -> usize {
        self.buffer_frames as usize * self.channels as usize
    }

    /// Bytes in one frame
    pub fn bytes_per_frame(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    /// Bytes in one device buffer
    pub fn bytes_per_buffer(&self) -> usize {
        self.samples_per_buffer() * self.format.bytes_per_sample()
    }
}

impl Default for AudioSpec {
    /// CD-quality stereo at the native float format, 1024-frame buffers
    fn default() -> Self {
        Self {
            format: SampleFormat::f32_native(),
            rate: SampleRate::CD_QUALITY,
            channels: 2,
            buffer_frames: 1024,
        }
    }
}
