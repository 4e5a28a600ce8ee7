//! Error types for the decoding pipeline

use std::fmt;
use std::io;

/// Errors that can occur while reading, decoding, or detecting charsets
///
/// Charset problems are deliberately absent from this enum: an unsupported or
/// malformed charset name never surfaces as an error. Detection silently
/// substitutes the UTF-8 default and parsing proceeds, possibly producing
/// garbled text for truly undetectable encodings.
#[derive(Debug)]
pub enum DecodeError {
    /// `reset()` was called beyond the retained replay window, or after the
    /// mark was invalidated by reading past its read limit
    OutOfRangeReset(String),
    /// An operation was attempted after `close()`
    StreamClosed,
    /// The underlying byte source failed; propagated as-is, never retried
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::OutOfRangeReset(msg) => write!(f, "Reset out of range: {}", msg),
            DecodeError::StreamClosed => write!(f, "Stream closed"),
            DecodeError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Io(err)
    }
}
