//! Chunked character decoding with character-level mark/reset
//!
//! [`ChunkedCharDecoder`] composes a [`MarkableByteReader`] and a
//! [`CharsetCodec`] into the character-producing interface the tokenizer
//! consumes: `read`, `skip`, `mark`, `reset`, `clone`, `exhausted`. Raw bytes
//! are pulled in fixed-size chunks, but the chunk size is purely a
//! performance knob: for any input and any chunk size ≥ 1, the sequence of
//! characters produced by any interleaving of these operations is identical.
//! That invariant is the reason this type exists.
//!
//! The decoder keeps two buffers: `pending`, characters decoded but not yet
//! delivered, and `raw`, bytes pulled from the reader that the codec has not
//! consumed yet (at most one chunk plus the incomplete tail of a multi-byte
//! sequence). A character-level mark snapshots both and pins the byte reader,
//! so a reset lands exactly on the boundary the snapshot represents, no
//! matter how the transport chunked the bytes in between.
//!
//! # Examples
//!
//! ```rust
//! use html_charset_stream::{CharsetCodec, ChunkedCharDecoder, MarkableByteReader, SliceSource};
//!
//! let reader = MarkableByteReader::new(SliceSource::new("héllo".as_bytes()));
//! let mut decoder = ChunkedCharDecoder::new(reader, CharsetCodec::utf8(), 2);
//! decoder.mark(16);
//! assert_eq!(decoder.read(3).unwrap(), "hél");
//! decoder.reset().unwrap();
//! assert_eq!(decoder.read(5).unwrap(), "héllo");
//! assert!(decoder.exhausted().unwrap());
//! ```

use crate::codec::CharsetCodec;
use crate::error::DecodeError;
use crate::pool::BufferPool;
use crate::reader::MarkableByteReader;
use crate::source::ByteSource;
use std::mem;
use std::rc::Rc;

/// Default raw-byte chunk size for callers without an opinion
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Clone, Debug)]
struct MarkSnapshot {
    pending: String,
    pending_len: usize,
    raw: Vec<u8>,
    byte_pos: u64,
}

/// A character reader over a byte source, decoded in chunks
///
/// Created once per parse invocation and discarded at the end. See the
/// module documentation for the chunk-size-independence invariant.
#[derive(Clone, Debug)]
pub struct ChunkedCharDecoder<S: ByteSource> {
    reader: MarkableByteReader<S>,
    codec: CharsetCodec,
    chunk_size: usize,
    /// Bytes pulled from the reader that the codec has not consumed yet
    raw: Vec<u8>,
    /// Decoded characters not yet delivered
    pending: String,
    /// Character count of `pending`, tracked to avoid re-counting
    pending_len: usize,
    snapshot: Option<MarkSnapshot>,
    pool: Option<Rc<BufferPool>>,
}

impl<S: ByteSource> ChunkedCharDecoder<S> {
    /// Create a decoder reading `chunk_size` bytes at a time
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(reader: MarkableByteReader<S>, codec: CharsetCodec, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be at least 1");
        Self {
            reader,
            codec,
            chunk_size,
            raw: Vec::with_capacity(chunk_size),
            pending: String::new(),
            pending_len: 0,
            snapshot: None,
            pool: None,
        }
    }

    /// Like [`new`](Self::new), drawing the raw scratch buffer from `pool`
    ///
    /// The buffer is returned to the pool when the decoder is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn with_pool(
        reader: MarkableByteReader<S>,
        codec: CharsetCodec,
        chunk_size: usize,
        pool: Rc<BufferPool>,
    ) -> Self {
        assert!(chunk_size > 0, "chunk size must be at least 1");
        let raw = pool.acquire(chunk_size);
        Self {
            reader,
            codec,
            chunk_size,
            raw,
            pending: String::new(),
            pending_len: 0,
            snapshot: None,
            pool: Some(pool),
        }
    }

    /// The codec this decoder was built with
    pub fn codec(&self) -> &CharsetCodec {
        &self.codec
    }

    /// Read up to `count` characters
    ///
    /// The result is shorter than `count` only at end of stream.
    pub fn read(&mut self, count: usize) -> Result<String, DecodeError> {
        self.fill_pending(count)?;
        Ok(self.take_pending(count))
    }

    /// Discard up to `count` characters, returning how many were skipped
    pub fn skip(&mut self, count: usize) -> Result<usize, DecodeError> {
        self.fill_pending(count)?;
        let taken = self.take_pending(count);
        Ok(taken.chars().count())
    }

    /// Read every remaining character to end of stream
    pub fn read_to_end(&mut self) -> Result<String, DecodeError> {
        self.fill_pending(usize::MAX)?;
        self.pending_len = 0;
        Ok(mem::take(&mut self.pending))
    }

    /// Remember the current character position, retaining up to `read_limit`
    /// characters of lookahead for a later [`reset`](Self::reset)
    ///
    /// Snapshots the pending characters and the undecoded raw tail, and pins
    /// the byte reader so the bytes behind the lookahead stay replayable.
    pub fn mark(&mut self, read_limit: usize) {
        // a character is at most four bytes in any supported encoding
        self.reader.mark(read_limit.saturating_mul(4));
        self.snapshot = Some(MarkSnapshot {
            pending: self.pending.clone(),
            pending_len: self.pending_len,
            raw: self.raw.clone(),
            byte_pos: self.reader.pos(),
        });
    }

    /// Rewind to the position captured by the last [`mark`](Self::mark)
    ///
    /// Restores the snapshot, rewinds the byte reader to the exact byte
    /// boundary the snapshot represents, and clears the mark. Fails with
    /// [`DecodeError::OutOfRangeReset`] if no mark is active or the byte
    /// reader has read past its retention promise.
    pub fn reset(&mut self) -> Result<(), DecodeError> {
        let snapshot = self.snapshot.take().ok_or_else(|| {
            DecodeError::OutOfRangeReset("reset without an active mark".to_string())
        })?;
        if let Err(err) = self.reader.reset_to(snapshot.byte_pos) {
            self.snapshot = Some(snapshot);
            return Err(err);
        }
        self.pending = snapshot.pending;
        self.pending_len = snapshot.pending_len;
        self.raw = snapshot.raw;
        Ok(())
    }

    /// Whether every character has been delivered
    ///
    /// May pull from the source to find out, like any read.
    pub fn exhausted(&mut self) -> Result<bool, DecodeError> {
        self.fill_pending(1)?;
        Ok(self.pending_len == 0)
    }

    /// Close the underlying source
    pub fn close(&mut self) {
        self.reader.close();
    }

    /// Decode until `pending` holds `want` characters or the stream ends
    fn fill_pending(&mut self, want: usize) -> Result<(), DecodeError> {
        while self.pending_len < want {
            let (text, consumed) = self.codec.decode(&self.raw);
            if consumed > 0 {
                self.pending_len += text.chars().count();
                self.pending.push_str(&text);
                self.raw.drain(..consumed);
                continue;
            }
            // no complete sequence buffered; pull another chunk
            let old = self.raw.len();
            self.raw.resize(old + self.chunk_size, 0);
            let got = self.reader.read(&mut self.raw[old..])?;
            self.raw.truncate(old + got);
            if got == 0 {
                if !self.raw.is_empty() {
                    // the stream ends mid-sequence; finalize what is left
                    let tail = self.codec.decode_final(&self.raw);
                    self.pending_len += tail.chars().count();
                    self.pending.push_str(&tail);
                    self.raw.clear();
                }
                break;
            }
        }
        Ok(())
    }

    /// Remove and return the first `count` pending characters
    fn take_pending(&mut self, count: usize) -> String {
        let take = count.min(self.pending_len);
        let split = self
            .pending
            .char_indices()
            .nth(take)
            .map_or(self.pending.len(), |(i, _)| i);
        let rest = self.pending.split_off(split);
        let out = mem::replace(&mut self.pending, rest);
        self.pending_len -= take;
        out
    }
}

impl<S: ByteSource> Drop for ChunkedCharDecoder<S> {
    fn drop(&mut self) {
        if let Some(pool) = &self.pool {
            pool.release(mem::take(&mut self.raw));
        }
    }
}
