//! Byte sources feeding the decoding pipeline
//!
//! A [`ByteSource`] is the minimal contract for a sequential, closable
//! provider of bytes: an in-memory buffer, a file, a network body, or a
//! decompression stream. The pipeline consumes a source single-threaded and
//! sequentially; suspension and retry policy belong to whatever produced it.
//!
//! Two adapters cover the common cases: [`SliceSource`] for bytes already in
//! memory and [`ReadSource`] for anything implementing [`std::io::Read`].
//! Gzip decompression itself is a collaborator outside this crate; callers
//! can use [`looks_gzipped`] on the first bytes of a stream to decide whether
//! to interpose a decompressor before handing the source over.
//!
//! # Examples
//!
//! ```rust
//! use html_charset_stream::{ByteSource, SliceSource};
//!
//! let mut source = SliceSource::new(b"hello");
//! let mut buf = [0u8; 3];
//! assert_eq!(source.read(&mut buf).unwrap(), 3);
//! assert_eq!(&buf, b"hel");
//! ```

use crate::error::DecodeError;
use std::io::{ErrorKind, Read};

/// The gzip magic number, the first two bytes of any gzip stream
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Check whether a byte prefix carries the gzip magic number
///
/// Returns `false` for prefixes shorter than two bytes.
pub fn looks_gzipped(prefix: &[u8]) -> bool {
    prefix.len() >= 2 && prefix[..2] == GZIP_MAGIC
}

/// A sequential, closable provider of bytes
///
/// Every read blocks until data or EOF. `Ok(0)` means end of stream; any
/// operation after [`close`](ByteSource::close) must fail with
/// [`DecodeError::StreamClosed`]. There is no cancellation primitive beyond
/// closing the source.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into `buf`, returning the count read
    ///
    /// Returns `Ok(0)` only at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError>;

    /// Close the source; subsequent reads fail with `StreamClosed`
    fn close(&mut self);
}

/// A [`ByteSource`] over an in-memory byte slice
///
/// Cheap to clone, which makes it the natural backing for
/// [`ChunkedCharDecoder::clone`](crate::ChunkedCharDecoder::clone).
#[derive(Clone, Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    closed: bool,
}

impl<'a> SliceSource<'a> {
    /// Create a source over `data`, positioned at its start
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            closed: false,
        }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        if self.closed {
            return Err(DecodeError::StreamClosed);
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A [`ByteSource`] over any [`std::io::Read`] implementation
///
/// Covers files, sockets, and decompression streams. I/O failures propagate
/// as [`DecodeError::Io`] without retry; only `ErrorKind::Interrupted` is
/// transparently retried, matching the blocking-until-data-or-EOF contract.
#[derive(Debug)]
pub struct ReadSource<R: Read> {
    inner: R,
    closed: bool,
}

impl<R: Read> ReadSource<R> {
    /// Wrap a reader as a byte source
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            closed: false,
        }
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        if self.closed {
            return Err(DecodeError::StreamClosed);
        }
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(DecodeError::Io(err)),
            }
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source_sequential_reads() {
        let mut source = SliceSource::new(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(source.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_slice_source_read_after_close_fails() {
        let mut source = SliceSource::new(b"abc");
        source.close();
        let mut buf = [0u8; 1];
        assert!(matches!(
            source.read(&mut buf),
            Err(DecodeError::StreamClosed)
        ));
    }

    #[test]
    fn test_read_source_over_std_reader() {
        let mut source = ReadSource::new(&b"stream body"[..]);
        let mut buf = [0u8; 64];
        assert_eq!(source.read(&mut buf).unwrap(), 11);
        assert_eq!(&buf[..11], b"stream body");
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_read_source_close() {
        let mut source = ReadSource::new(&b"x"[..]);
        source.close();
        let mut buf = [0u8; 1];
        assert!(matches!(
            source.read(&mut buf),
            Err(DecodeError::StreamClosed)
        ));
    }

    #[test]
    fn test_gzip_magic_detection() {
        assert!(looks_gzipped(&[0x1F, 0x8B, 0x08, 0x00]));
        assert!(!looks_gzipped(b"<html>"));
        assert!(!looks_gzipped(&[0x1F]));
        assert!(!looks_gzipped(&[]));
    }
}
