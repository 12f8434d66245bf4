//! Byte sources for decoders
//!
//! A byte source is anything decoders can read encoded audio from: a file, an
//! in-memory buffer, a network download spooled to disk. Ownership is
//! transferred into the decoding chain and the source is closed by `Drop` on
//! every exit path.

use std::io::{Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

/// Byte stream a decoder reads encoded audio from
///
/// Blanket-implemented for any seekable reader that can cross threads, so
/// `File`, `Cursor<Vec<u8>>` and friends work out of the box.
pub trait ByteSource: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync + ?Sized> ByteSource for T {}

/// Cheaply cloneable handle to a byte source
///
/// Decoder auto-detection hands the same source to several candidate
/// decoders in turn, rewinding between attempts, and the winning decoder
/// keeps reading from it afterwards. The handle makes that sharing explicit:
/// clones read and seek the same underlying stream.
#[derive(Clone)]
pub struct SharedSource(Arc<Mutex<Box<dyn ByteSource>>>);

impl SharedSource {
    /// Wrap an owned reader
    pub fn new<S: Read + Seek + Send + Sync + 'static>(source: S) -> Self {
        Self(Arc::new(Mutex::new(Box::new(source))))
    }

    /// Wrap an already-boxed source
    pub fn from_boxed(source: Box<dyn ByteSource>) -> Self {
        Self(Arc::new(Mutex::new(source)))
    }

    /// Total length in bytes, if the stream supports it
    ///
    /// Determined with a seek round-trip; the read position is restored.
    pub fn byte_len(&self) -> Option<u64> {
        let mut guard = self.0.lock().unwrap();
        let pos = guard.stream_position().ok()?;
        let len = guard.seek(SeekFrom::End(0)).ok()?;
        guard.seek(SeekFrom::Start(pos)).ok()?;
        Some(len)
    }
}

impl Read for SharedSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().read(buf)
    }
}

impl Seek for SharedSource {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.0.lock().unwrap().seek(pos)
    }
}

impl std::fmt::Debug for SharedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSource").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn clones_share_position() {
        let mut a = SharedSource::new(Cursor::new(vec![1u8, 2, 3, 4]));
        let mut b = a.clone();

        let mut byte = [0u8; 1];
        a.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], 1);
        b.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], 2);
    }

    #[test]
    fn byte_len_restores_position() {
        let mut src = SharedSource::new(Cursor::new(vec![0u8; 16]));
        src.seek(SeekFrom::Start(5)).unwrap();
        assert_eq!(src.byte_len(), Some(16));
        assert_eq!(src.stream_position().unwrap(), 5);
    }
}
