//! Charset detection and incremental byte-to-character decoding for HTML
//!
//! This library turns an arbitrary, possibly huge, possibly non-rewindable
//! byte stream into a character stream for an HTML parser, without knowing up
//! front what encoding the bytes use. Decoded output is identical no matter
//! how the transport chunks the bytes, mark/reset is exact at both the byte
//! and the character level, and charset auto-detection can discard and redo
//! work when a document turns out to declare a different encoding than the
//! one it was provisionally parsed under.
//!
//! # Architecture
//!
//! Data flows one direction through a small stack of components:
//!
//! - `source`: the [`ByteSource`] contract plus adapters for in-memory
//!   buffers and `std::io::Read` streams
//! - `reader`: [`MarkableByteReader`], byte-level mark/reset via a bounded
//!   replay buffer
//! - `codec`: [`CharsetCodec`], incremental per-encoding decoding that never
//!   splits a multi-byte sequence
//! - `decoder`: [`ChunkedCharDecoder`], the character-level reader the
//!   tokenizer consumes
//! - `charset`: BOM sniffing, declaration parsing, and the two-phase
//!   [`detect_charset`] protocol
//! - `parser`: the end-to-end pipeline handing decoded text to html5ever
//! - `pool`: optional scratch-buffer reuse
//!
//! The charset detector is the only component that rewinds the byte reader
//! after decoding has tentatively begun.
//!
//! # Examples
//!
//! ```rust
//! use html_charset_stream::parse_bytes;
//!
//! // the document declares its own (non-UTF-8) encoding; detection finds it
//! // and re-decodes the stream accordingly
//! let mut html = b"<html><head><meta charset=windows-1252></head><body>caf".to_vec();
//! html.push(0xE9); // "é" in windows-1252
//! html.extend_from_slice(b"</body></html>");
//!
//! let doc = parse_bytes(&html, None).unwrap();
//! assert_eq!(doc.charset(), "windows-1252");
//! assert_eq!(doc.text(), "café");
//! ```

// Module declarations
pub mod charset;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod parser;
pub mod pool;
pub mod reader;
pub mod source;

// Re-export main types for convenience
pub use charset::{detect_charset, extract_charset_from_content_type, Detection, DEFAULT_CHARSET};
pub use codec::CharsetCodec;
pub use decoder::{ChunkedCharDecoder, DEFAULT_CHUNK_SIZE};
pub use error::DecodeError;
pub use parser::{parse_bytes, parse_source, parse_with_content_type, HtmlDocument};
pub use pool::BufferPool;
pub use reader::MarkableByteReader;
pub use source::{looks_gzipped, ByteSource, ReadSource, SliceSource, GZIP_MAGIC};
