//! Decoder auto-detection
//!
//! A registry of decoder factories, tried in tier order against an unknown
//! byte source. Structured formats probe before lossy ones; MIDI factories
//! only run when the source starts with an `MThd` header; tracker/module
//! factories are never tried blindly because their formats accept almost
//! anything. The source is rewound to its starting offset between attempts
//! and the first factory to open it wins.

use polymix_core::{AudioDecoder, SharedSource};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

use crate::error::{AudioError, Result};

/// Detection priority of a decoder factory
///
/// Lower tiers are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DetectionTier {
    /// Lossless and structured formats with reliable headers
    Structured,
    /// Lossy formats whose sync patterns can false-positive
    Lossy,
    /// Tracker and module formats
    Module,
}

/// A factory that can try to open a decoder over a byte source
pub trait DecoderFactory: Send + Sync {
    /// Factory name for diagnostics
    fn name(&self) -> &'static str;

    /// Where this factory sits in the probe order
    fn tier(&self) -> DetectionTier;

    /// Only probe sources that begin with the standard MIDI `MThd` header
    fn needs_midi_header(&self) -> bool {
        false
    }

    /// Whether the factory participates in blind auto-detection
    ///
    /// Tracker formats return `false` here; they can still be opened
    /// explicitly through [`DecoderFactory::open`].
    fn auto_detectable(&self) -> bool {
        true
    }

    /// Attempt to open a decoder over the source
    fn open(&self, source: SharedSource) -> Result<Box<dyn AudioDecoder>>;
}

/// Ordered table of decoder factories
pub struct DecoderRegistry {
    factories: Vec<Box<dyn DecoderFactory>>,
}

impl DecoderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// A registry with the compiled-in decoders registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::decoder::symphonia::SymphoniaFactory));
        registry
    }

    /// Add a factory
    pub fn register(&mut self, factory: Box<dyn DecoderFactory>) {
        self.factories.push(factory);
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factories are registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Find a decoder for an unknown source
    ///
    /// Tries every auto-detectable factory in tier order, rewinding the
    /// source between attempts. Open failures are swallowed; only universal
    /// failure is reported, as [`AudioError::NoDecoderFound`].
    pub fn detect(&self, mut source: SharedSource) -> Result<Box<dyn AudioDecoder>> {
        let start = source.stream_position()?;

        for tier in [
            DetectionTier::Structured,
            DetectionTier::Lossy,
            DetectionTier::Module,
        ] {
            for factory in self.factories.iter().filter(|f| f.tier() == tier) {
                if !factory.auto_detectable() {
                    debug!(factory = factory.name(), "skipped: not auto-detectable");
                    continue;
                }
                if factory.needs_midi_header() && !has_midi_header(&mut source, start)? {
                    continue;
                }

                match factory.open(source.clone()) {
                    Ok(decoder) => {
                        debug!(factory = factory.name(), "source recognized");
                        return Ok(decoder);
                    }
                    Err(e) => {
                        debug!(factory = factory.name(), "rejected source: {e}");
                        source.seek(SeekFrom::Start(start))?;
                    }
                }
            }
        }

        Err(AudioError::NoDecoderFound)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Check for the standard MIDI file header, restoring the read position
fn has_midi_header(source: &mut SharedSource, start: u64) -> Result<bool> {
    let mut head = [0u8; 4];
    let mut filled = 0;
    while filled < head.len() {
        let n = source.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    source.seek(SeekFrom::Start(start))?;
    Ok(filled == head.len() && &head == b"MThd")
}
