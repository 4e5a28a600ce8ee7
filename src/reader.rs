//! Markable byte reader with bounded replay
//!
//! [`MarkableByteReader`] wraps a [`ByteSource`] and adds mark/reset at the
//! byte level via a replay buffer. The charset detector uses it to peek a few
//! kilobytes of the stream, decide on an encoding, and rewind to the start;
//! the character decoder uses the same window to make its own mark/reset
//! exact even though the source itself cannot be re-read.
//!
//! # Replay window
//!
//! While a mark is active, every byte delivered between the mark offset and
//! the declared read limit is retained so [`reset`](MarkableByteReader::reset)
//! can redeliver it. Reads past the limit are delivered straight from the
//! source and invalidate the mark instead of raising an error; only an actual
//! `reset` beyond the retained range fails. Reads are served in exactly one
//! of three ways, in order:
//!
//! 1. the cursor is inside the retained window: serve from the replay buffer;
//! 2. the cursor is at the live edge and still under the read limit: pull
//!    from the source *and* retain;
//! 3. otherwise: pull straight from the source, dropping any mark first.
//!
//! Collapsing cases 2 and 3 would either grow the buffer without bound or
//! hand back wrong bytes after a reset, so the split is load-bearing.
//!
//! # Examples
//!
//! ```rust
//! use html_charset_stream::{MarkableByteReader, SliceSource};
//!
//! let mut reader = MarkableByteReader::new(SliceSource::new(b"abcdef"));
//! reader.mark(16);
//! let mut buf = [0u8; 3];
//! reader.read(&mut buf).unwrap();
//! assert_eq!(&buf, b"abc");
//! reader.reset().unwrap();
//! reader.read(&mut buf).unwrap();
//! assert_eq!(&buf, b"abc");
//! ```

use crate::error::DecodeError;
use crate::source::ByteSource;

/// A byte reader with mark/reset/skip over a non-rewindable source
///
/// Created once per parse invocation and discarded at the end; instances are
/// not reused or pooled across parses.
#[derive(Clone, Debug)]
pub struct MarkableByteReader<S: ByteSource> {
    source: S,
    /// Logical read cursor
    pos: u64,
    /// How far the underlying source has been consumed; equals `pos` except
    /// when the cursor has been reset into the replay buffer
    source_pos: u64,
    mark_offset: Option<u64>,
    replay_limit: u64,
    /// Bytes `[mark_offset, mark_offset + replay.len())`, retained while a
    /// mark is active
    replay: Vec<u8>,
    eof_seen: bool,
    closed: bool,
}

impl<S: ByteSource> MarkableByteReader<S> {
    /// Wrap a byte source, positioned at logical offset zero
    pub fn new(source: S) -> Self {
        Self {
            source,
            pos: 0,
            source_pos: 0,
            mark_offset: None,
            replay_limit: 0,
            replay: Vec::new(),
            eof_seen: false,
            closed: false,
        }
    }

    /// The current logical offset from the start of the stream
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Place or extend a mark at the current position
    ///
    /// With no mark active, the current offset becomes the mark offset and
    /// future reads are retained until `read_limit` bytes past it (saturating
    /// to unbounded on overflow). With a mark already active the mark offset
    /// never moves; the retention limit only grows, far enough to cover
    /// `read_limit` bytes of lookahead from the current position.
    pub fn mark(&mut self, read_limit: usize) {
        let wanted = self.pos.saturating_add(read_limit as u64);
        match self.mark_offset {
            None => {
                self.mark_offset = Some(self.pos);
                self.replay_limit = wanted;
                self.replay.clear();
            }
            Some(_) => {
                self.replay_limit = self.replay_limit.max(wanted);
            }
        }
    }

    /// Rewind the cursor to the mark offset
    pub fn reset(&mut self) -> Result<(), DecodeError> {
        match self.mark_offset {
            Some(offset) => self.reset_to(offset),
            None => Err(DecodeError::OutOfRangeReset(
                "no active mark".to_string(),
            )),
        }
    }

    /// Rewind the cursor to an absolute offset inside the retained window
    ///
    /// Valid targets are `mark_offset ..= mark_offset + replay.len()`; anything
    /// else, or a reader whose mark was invalidated by reading past the limit,
    /// fails with [`DecodeError::OutOfRangeReset`].
    pub fn reset_to(&mut self, offset: u64) -> Result<(), DecodeError> {
        if self.closed {
            return Err(DecodeError::StreamClosed);
        }
        let Some(mark) = self.mark_offset else {
            return Err(DecodeError::OutOfRangeReset(format!(
                "offset {} requested but the mark is gone",
                offset
            )));
        };
        if offset < mark || offset > self.source_pos {
            return Err(DecodeError::OutOfRangeReset(format!(
                "offset {} outside retained window [{}, {}]",
                offset, mark, self.source_pos
            )));
        }
        self.pos = offset;
        Ok(())
    }

    /// Read up to `buf.len()` bytes; `Ok(0)` means end of stream
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        if self.closed {
            return Err(DecodeError::StreamClosed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(mark) = self.mark_offset {
            // case 1: cursor inside the retained window
            if self.pos < self.source_pos {
                let start = (self.pos - mark) as usize;
                let n = buf.len().min(self.replay.len() - start);
                buf[..n].copy_from_slice(&self.replay[start..start + n]);
                self.pos += n as u64;
                return Ok(n);
            }
            // case 3 precondition: the caller has read past what it promised
            // to retain, so the mark dies here rather than growing forever
            if self.pos >= self.replay_limit {
                self.mark_offset = None;
                self.replay = Vec::new();
            }
        }
        let n = self.source.read(buf)?;
        if n == 0 {
            self.eof_seen = true;
            return Ok(0);
        }
        self.source_pos += n as u64;
        self.pos = self.source_pos;
        if self.mark_offset.is_some() {
            // case 2: live read under the limit, retain for replay
            self.replay.extend_from_slice(&buf[..n]);
        }
        Ok(n)
    }

    /// Advance the cursor by up to `n` bytes, returning how many were skipped
    ///
    /// Short only at end of stream.
    pub fn skip(&mut self, n: u64) -> Result<u64, DecodeError> {
        if self.closed {
            return Err(DecodeError::StreamClosed);
        }
        let mut remaining = n;
        let mut scratch = [0u8; 1024];
        while remaining > 0 {
            if self.mark_offset.is_some() && self.pos < self.source_pos {
                // replayed bytes are already retained, jump over them
                let step = (self.source_pos - self.pos).min(remaining);
                self.pos += step;
                remaining -= step;
                continue;
            }
            let want = scratch.len().min(remaining.min(usize::MAX as u64) as usize);
            let got = self.read(&mut scratch[..want])?;
            if got == 0 {
                break;
            }
            remaining -= got as u64;
        }
        Ok(n - remaining)
    }

    /// Whether end of stream has been observed and the cursor has caught up
    /// to it
    ///
    /// Never probes the source; returns `false` until a read has actually hit
    /// EOF.
    pub fn exhausted(&self) -> bool {
        self.eof_seen && self.pos >= self.source_pos
    }

    /// Close the underlying source; every subsequent operation fails with
    /// [`DecodeError::StreamClosed`]
    pub fn close(&mut self) {
        self.closed = true;
        self.source.close();
    }
}
