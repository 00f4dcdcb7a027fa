//! Byte sources - Where the feed reads its wire bytes from.
//!
//! The feed only ever asks for an exact number of bytes and blocks until it
//! gets them: first the header, then the rest of the record.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};

use crate::error::SourceError;

/// A blocking stream of wire bytes.
pub trait ByteSource {
    /// Fill `buf` completely, blocking until enough bytes are available.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SourceError>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    #[inline]
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        (**self).read_exact(buf)
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Adapts any blocking [`Read`].
///
/// End of stream, including a record cut short by it, is reported as
/// [`SourceError::Closed`].
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl ReaderSource<BufReader<File>> {
    /// Open a capture file with a large read buffer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|e| SourceError::io("open", e))?;
        Ok(Self::new(BufReader::with_capacity(1 << 20, file)))
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    #[inline]
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        self.reader.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => SourceError::Closed,
            _ => SourceError::io("read", e),
        })
    }
}

// ============================================================================
// Length-prefixed framing
// ============================================================================

/// Strips the 2-byte big-endian length that precedes every record in ITCH
/// BinaryFILE captures and SoupBinTCP sequenced data.
///
/// A zero-length frame marks the end of the session. A read that would run
/// past the end of the current frame means the declared length disagrees
/// with the record's own size, which is reported as
/// [`SourceError::Framing`].
#[derive(Debug)]
pub struct FramedSource<S> {
    inner: S,
    /// Bytes left in the current frame
    remaining: usize,
}

impl<S: ByteSource> FramedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            remaining: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Discard whatever is left of the current frame.
    pub fn skip_frame(&mut self) -> Result<(), SourceError> {
        let mut scratch = [0u8; 64];
        while self.remaining > 0 {
            let n = self.remaining.min(scratch.len());
            self.inner.read_exact(&mut scratch[..n])?;
            self.remaining -= n;
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<(), SourceError> {
        let mut prefix = [0u8; 2];
        self.inner.read_exact(&mut prefix)?;
        match BigEndian::read_u16(&prefix) {
            0 => Err(SourceError::Closed),
            length => {
                self.remaining = length as usize;
                Ok(())
            }
        }
    }
}

impl<S: ByteSource> ByteSource for FramedSource<S> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        if self.remaining == 0 {
            self.next_frame()?;
        }
        if buf.len() > self.remaining {
            return Err(SourceError::Framing {
                requested: buf.len(),
                remaining: self.remaining,
            });
        }
        self.inner.read_exact(buf)?;
        self.remaining -= buf.len();
        Ok(())
    }
}

// ============================================================================
// SPSC ring
// ============================================================================

/// Consumer end of a lock-free single-producer byte ring.
///
/// A receive thread pushes raw bytes into the producer end; the feed thread
/// spins here until a whole read is available.
#[cfg(feature = "runtime")]
pub struct RingSource {
    consumer: rtrb::Consumer<u8>,
}

/// Build a byte ring holding up to `capacity` bytes.
#[cfg(feature = "runtime")]
pub fn ring_channel(capacity: usize) -> (rtrb::Producer<u8>, RingSource) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    (producer, RingSource { consumer })
}

#[cfg(feature = "runtime")]
impl RingSource {
    /// Bytes ready to read without blocking.
    #[inline]
    pub fn available(&self) -> usize {
        self.consumer.slots()
    }
}

#[cfg(feature = "runtime")]
impl ByteSource for RingSource {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        let mut filled = 0;
        while filled < buf.len() {
            let available = self.consumer.slots();
            if available == 0 {
                // Abandonment is checked before the second look at the slots
                // so bytes pushed just before the producer dropped are kept.
                if self.consumer.is_abandoned() && self.consumer.slots() == 0 {
                    return Err(SourceError::Closed);
                }
                std::hint::spin_loop();
                continue;
            }

            let n = available.min(buf.len() - filled);
            if let Ok(chunk) = self.consumer.read_chunk(n) {
                let (first, second) = chunk.as_slices();
                buf[filled..filled + first.len()].copy_from_slice(first);
                buf[filled + first.len()..filled + n].copy_from_slice(second);
                chunk.commit_all();
                filled += n;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(records: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for record in records {
            out.extend_from_slice(&(record.len() as u16).to_be_bytes());
            out.extend_from_slice(record);
        }
        out
    }

    #[test]
    fn test_reader_reads_exact() {
        let mut source = ReaderSource::new(&[1u8, 2, 3, 4, 5][..]);
        let mut buf = [0u8; 3];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        source.read_exact(&mut buf[..2]).unwrap();
        assert_eq!(&buf[..2], &[4, 5]);
    }

    #[test]
    fn test_reader_eof_is_closed() {
        let mut source = ReaderSource::new(&[1u8, 2][..]);
        let mut buf = [0u8; 3];
        assert!(matches!(source.read_exact(&mut buf), Err(SourceError::Closed)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = ReaderSource::open("/nonexistent/capture.itch").unwrap_err();
        assert!(matches!(err, SourceError::Io { op: "open", .. }));
    }

    #[test]
    fn test_framed_strips_prefix() {
        let bytes = framed(&[&[b'S', 1, 2], &[b'D', 9]]);
        let mut source = FramedSource::new(ReaderSource::new(&bytes[..]));

        let mut head = [0u8; 1];
        let mut tail = [0u8; 2];
        source.read_exact(&mut head).unwrap();
        source.read_exact(&mut tail).unwrap();
        assert_eq!((head, tail), ([b'S'], [1, 2]));

        let mut next = [0u8; 2];
        source.read_exact(&mut next).unwrap();
        assert_eq!(next, [b'D', 9]);

        assert!(matches!(source.read_exact(&mut head), Err(SourceError::Closed)));
    }

    #[test]
    fn test_framed_rejects_read_across_frames() {
        let bytes = framed(&[&[1, 2], &[3, 4]]);
        let mut source = FramedSource::new(ReaderSource::new(&bytes[..]));
        let mut buf = [0u8; 3];
        let err = source.read_exact(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Framing {
                requested: 3,
                remaining: 2
            }
        ));
    }

    #[test]
    fn test_framed_skip_frame() {
        let bytes = framed(&[&[1, 2, 3], &[4]]);
        let mut source = FramedSource::new(ReaderSource::new(&bytes[..]));
        let mut buf = [0u8; 1];
        source.read_exact(&mut buf).unwrap();
        source.skip_frame().unwrap();
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [4]);
    }

    #[test]
    fn test_zero_length_frame_ends_session() {
        let bytes = [0u8, 0, 0, 1, 7];
        let mut source = FramedSource::new(ReaderSource::new(&bytes[..]));
        let mut buf = [0u8; 1];
        assert!(matches!(source.read_exact(&mut buf), Err(SourceError::Closed)));
    }

    #[cfg(feature = "runtime")]
    #[test]
    fn test_ring_source_across_threads() {
        let (mut producer, mut source) = ring_channel(8);

        let writer = std::thread::spawn(move || {
            for byte in 0u8..64 {
                while producer.push(byte).is_err() {
                    std::hint::spin_loop();
                }
            }
        });

        let mut buf = [0u8; 16];
        for chunk in 0u8..4 {
            source.read_exact(&mut buf).unwrap();
            let expected: Vec<u8> = (chunk * 16..chunk * 16 + 16).collect();
            assert_eq!(&buf[..], &expected[..]);
        }
        writer.join().unwrap();

        assert!(matches!(source.read_exact(&mut buf[..1]), Err(SourceError::Closed)));
    }

    #[cfg(feature = "runtime")]
    #[test]
    fn test_ring_source_reports_available() {
        let (mut producer, mut source) = ring_channel(8);
        assert_eq!(source.available(), 0);

        for byte in [7u8, 8, 9] {
            producer.push(byte).unwrap();
        }
        assert_eq!(source.available(), 3);

        let mut buf = [0u8; 2];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [7, 8]);
        assert_eq!(source.available(), 1);
    }
}
