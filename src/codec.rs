//! Incremental charset codecs
//!
//! A [`CharsetCodec`] is the immutable configuration for one named encoding:
//! decoding is a pure function from a byte range to text plus a consumed-byte
//! count. The contract that everything downstream leans on is that a call
//! never consumes a trailing incomplete multi-byte sequence; the caller
//! re-presents the undecoded tail together with newly arrived bytes on the
//! next call, which is what makes chunk boundaries invisible and mark/reset
//! exact.
//!
//! Codecs are backed by [`encoding_rs`] for every encoding the Encoding
//! Standard defines. UTF-32BE/LE are implemented locally: the standard (and
//! therefore `encoding_rs`) excludes them, but byte-order-mark detection has
//! to be able to decode a stream that opens with a UTF-32 BOM.
//!
//! All codecs are constructed without BOM handling. Whether a leading BOM is
//! skipped is the charset detector's explicit decision, never something a
//! codec does behind the caller's back.
//!
//! # Examples
//!
//! ```rust
//! use html_charset_stream::CharsetCodec;
//!
//! let utf8 = CharsetCodec::utf8();
//! // the trailing 0xC3 opens a two-byte sequence and stays unconsumed
//! let (text, consumed) = utf8.decode(&[b'a', b'b', 0xC3]);
//! assert_eq!(text, "ab");
//! assert_eq!(consumed, 2);
//! ```

use encoding_rs::{CoderResult, DecoderResult, Encoding};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    Standard(&'static Encoding),
    Utf32Be,
    Utf32Le,
}

/// A named bidirectional byte↔character conversion
///
/// Copyable configuration; decoding keeps no state between calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharsetCodec {
    backend: Backend,
}

impl CharsetCodec {
    /// The UTF-8 codec, the detection default
    pub fn utf8() -> Self {
        Self {
            backend: Backend::Standard(encoding_rs::UTF_8),
        }
    }

    /// The UTF-16 big-endian codec
    pub fn utf16be() -> Self {
        Self {
            backend: Backend::Standard(encoding_rs::UTF_16BE),
        }
    }

    /// The UTF-16 little-endian codec
    pub fn utf16le() -> Self {
        Self {
            backend: Backend::Standard(encoding_rs::UTF_16LE),
        }
    }

    /// The UTF-32 big-endian codec
    pub fn utf32be() -> Self {
        Self {
            backend: Backend::Utf32Be,
        }
    }

    /// The UTF-32 little-endian codec
    pub fn utf32le() -> Self {
        Self {
            backend: Backend::Utf32Le,
        }
    }

    /// Look up a codec by charset name
    ///
    /// The candidate is trimmed, stripped of surrounding quotes, and matched
    /// case-insensitively against the supported-charset table. An unsupported
    /// or empty name yields `None`; lookup never fails with an error, it only
    /// affects which codec gets selected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use html_charset_stream::CharsetCodec;
    ///
    /// assert_eq!(CharsetCodec::for_name(" \"UTF-8\" ").unwrap().name(), "UTF-8");
    /// assert_eq!(CharsetCodec::for_name("gb2312").unwrap().name(), "GBK");
    /// assert!(CharsetCodec::for_name("iso-8").is_none());
    /// assert!(CharsetCodec::for_name("").is_none());
    /// ```
    pub fn for_name(name: &str) -> Option<Self> {
        let trimmed = name.trim().trim_matches(|c| c == '"' || c == '\'');
        if trimmed.is_empty() {
            return None;
        }
        // UTF-32 is outside the encoding_rs label table; unsuffixed UTF-32
        // is big-endian per its IANA registration
        if trimmed.eq_ignore_ascii_case("utf-32") || trimmed.eq_ignore_ascii_case("utf-32be") {
            return Some(Self::utf32be());
        }
        if trimmed.eq_ignore_ascii_case("utf-32le") {
            return Some(Self::utf32le());
        }
        Encoding::for_label(trimmed.as_bytes()).map(|encoding| Self {
            backend: Backend::Standard(encoding),
        })
    }

    /// The canonical name of this codec's encoding, e.g. `"UTF-8"` or `"GBK"`
    pub fn name(&self) -> &'static str {
        match self.backend {
            Backend::Standard(encoding) => encoding.name(),
            Backend::Utf32Be => "UTF-32BE",
            Backend::Utf32Le => "UTF-32LE",
        }
    }

    /// Whether this is the UTF-8 detection default
    pub fn is_utf8(&self) -> bool {
        matches!(self.backend, Backend::Standard(encoding) if encoding == encoding_rs::UTF_8)
    }

    /// Decode a byte range into text, without splitting a multi-byte sequence
    ///
    /// Returns the decoded text and the number of bytes consumed, which is
    /// shorter than `bytes.len()` exactly when the tail of the range opens a
    /// multi-byte sequence the range does not finish. Malformed sequences in
    /// the interior decode to U+FFFD. An empty range decodes to nothing.
    pub fn decode(&self, bytes: &[u8]) -> (String, usize) {
        match self.backend {
            Backend::Standard(encoding) => decode_standard(encoding, bytes, false),
            Backend::Utf32Be => decode_utf32(bytes, false, u32::from_be_bytes),
            Backend::Utf32Le => decode_utf32(bytes, false, u32::from_le_bytes),
        }
    }

    /// Decode the final byte range of a stream
    ///
    /// Identical to [`decode`](Self::decode) except that a trailing
    /// incomplete sequence, which can never be completed now, decodes to
    /// U+FFFD and every byte counts as consumed.
    pub fn decode_final(&self, bytes: &[u8]) -> String {
        match self.backend {
            Backend::Standard(encoding) => decode_standard(encoding, bytes, true).0,
            Backend::Utf32Be => decode_utf32(bytes, true, u32::from_be_bytes).0,
            Backend::Utf32Le => decode_utf32(bytes, true, u32::from_le_bytes).0,
        }
    }

    /// Encode text into this codec's byte representation
    ///
    /// Unmappable characters follow the Encoding Standard: they become
    /// numeric character references. Note that per that standard the UTF-16
    /// encodings have no encoder and serialize as UTF-8.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self.backend {
            Backend::Standard(encoding) => encoding.encode(text).0.into_owned(),
            Backend::Utf32Be => text
                .chars()
                .flat_map(|c| (c as u32).to_be_bytes())
                .collect(),
            Backend::Utf32Le => text
                .chars()
                .flat_map(|c| (c as u32).to_le_bytes())
                .collect(),
        }
    }

    /// Whether `ch` round-trips through this codec without substitution
    ///
    /// Used by output serialization to decide when a character must be
    /// escaped instead of encoded.
    pub fn can_encode(&self, ch: char) -> bool {
        match self.backend {
            Backend::Standard(encoding) => {
                let mut buf = [0u8; 4];
                let (_, _, had_unmappable) = encoding.encode(ch.encode_utf8(&mut buf));
                !had_unmappable
            }
            // every scalar value has a UTF-32 representation
            Backend::Utf32Be | Backend::Utf32Le => true,
        }
    }
}

fn decode_standard(encoding: &'static Encoding, bytes: &[u8], last: bool) -> (String, usize) {
    if bytes.is_empty() {
        return (String::new(), 0);
    }
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut out = String::new();
    let mut remaining = bytes;
    loop {
        let needed = decoder
            .max_utf8_buffer_length(remaining.len())
            .unwrap_or(8192)
            .clamp(4, 8192);
        out.reserve(needed);
        let (result, read, _) = decoder.decode_to_string(remaining, &mut out, last);
        remaining = &remaining[read..];
        match result {
            CoderResult::InputEmpty => break,
            CoderResult::OutputFull => continue,
        }
    }
    if last {
        return (out, bytes.len());
    }
    // Any bytes still buffered inside the decoder are the start of a
    // multi-byte sequence cut off by the range boundary. Flushing a fresh
    // probe reports them as a malformed tail of known length; those bytes
    // stay unconsumed for the caller to re-present.
    let mut probe = String::with_capacity(16);
    let held = match decoder.decode_to_string_without_replacement(&[], &mut probe, true) {
        (DecoderResult::Malformed(len, _), _) => len as usize,
        _ => 0,
    };
    (out, bytes.len() - held)
}

fn decode_utf32(bytes: &[u8], last: bool, read_u32: fn([u8; 4]) -> u32) -> (String, usize) {
    let complete = bytes.len() - bytes.len() % 4;
    let mut out = String::with_capacity(complete / 4);
    for quad in bytes[..complete].chunks_exact(4) {
        let value = read_u32([quad[0], quad[1], quad[2], quad[3]]);
        out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    if last && complete < bytes.len() {
        out.push(char::REPLACEMENT_CHARACTER);
        return (out, bytes.len());
    }
    (out, complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Name lookup and validation
    // ========================================================================

    #[test]
    fn test_for_name_trims_and_strips_quotes() {
        assert_eq!(CharsetCodec::for_name("  utf-8  ").unwrap().name(), "UTF-8");
        assert_eq!(CharsetCodec::for_name("\"UTF-8\"").unwrap().name(), "UTF-8");
        assert_eq!(CharsetCodec::for_name("'utf-8'").unwrap().name(), "UTF-8");
    }

    #[test]
    fn test_for_name_is_case_insensitive() {
        assert_eq!(CharsetCodec::for_name("Utf-16BE").unwrap().name(), "UTF-16BE");
        assert_eq!(CharsetCodec::for_name("ISO-8859-2").unwrap().name(), "ISO-8859-2");
    }

    #[test]
    fn test_for_name_rejects_garbage() {
        assert!(CharsetCodec::for_name("iso-8").is_none());
        assert!(CharsetCodec::for_name("").is_none());
        assert!(CharsetCodec::for_name("   ").is_none());
        assert!(CharsetCodec::for_name("not a charset").is_none());
    }

    #[test]
    fn test_for_name_utf32_variants() {
        assert_eq!(CharsetCodec::for_name("UTF-32").unwrap().name(), "UTF-32BE");
        assert_eq!(CharsetCodec::for_name("utf-32le").unwrap().name(), "UTF-32LE");
        assert_eq!(CharsetCodec::for_name("UTF-32BE").unwrap().name(), "UTF-32BE");
    }

    #[test]
    fn test_gb2312_label_resolves() {
        // the Encoding Standard folds the gb2312 label into GBK
        assert_eq!(CharsetCodec::for_name("gb2312").unwrap().name(), "GBK");
    }

    // ========================================================================
    // Incremental decoding
    // ========================================================================

    #[test]
    fn test_decode_empty_range() {
        let (text, consumed) = CharsetCodec::utf8().decode(&[]);
        assert_eq!(text, "");
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_decode_holds_back_incomplete_utf8_tail() {
        // "é" is C3 A9; presenting only C3 must consume nothing of it
        let (text, consumed) = CharsetCodec::utf8().decode(&[b'x', 0xC3]);
        assert_eq!(text, "x");
        assert_eq!(consumed, 1);
        // re-presenting the tail with its continuation completes the char
        let (text, consumed) = CharsetCodec::utf8().decode(&[0xC3, 0xA9]);
        assert_eq!(text, "é");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_decode_holds_back_three_and_four_byte_tails() {
        let snowman = "\u{2603}".as_bytes(); // E2 98 83
        let (text, consumed) = CharsetCodec::utf8().decode(&snowman[..2]);
        assert_eq!(text, "");
        assert_eq!(consumed, 0);

        let emoji = "\u{1F600}".as_bytes(); // F0 9F 98 80
        let (text, consumed) = CharsetCodec::utf8().decode(&emoji[..3]);
        assert_eq!(text, "");
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_decode_final_replaces_dangling_tail() {
        let text = CharsetCodec::utf8().decode_final(&[b'a', 0xC3]);
        assert_eq!(text, "a\u{FFFD}");
    }

    #[test]
    fn test_decode_interior_garbage_becomes_replacement() {
        let (text, consumed) = CharsetCodec::utf8().decode(&[b'a', 0xFF, b'b']);
        assert_eq!(text, "a\u{FFFD}b");
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_decode_gbk_multibyte() {
        // "新" is D0 C2 in GBK/GB2312
        let codec = CharsetCodec::for_name("gb2312").unwrap();
        let (text, consumed) = codec.decode(&[0xD0, 0xC2]);
        assert_eq!(text, "新");
        assert_eq!(consumed, 2);
        // a lone lead byte stays unconsumed
        let (text, consumed) = codec.decode(&[b'a', 0xD0]);
        assert_eq!(text, "a");
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_decode_utf16be_pairwise() {
        let codec = CharsetCodec::utf16be();
        let (text, consumed) = codec.decode(&[0x00, b'h', 0x00, b'i']);
        assert_eq!(text, "hi");
        assert_eq!(consumed, 4);
        // an odd trailing byte is half a code unit
        let (text, consumed) = codec.decode(&[0x00, b'h', 0x00]);
        assert_eq!(text, "h");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_decode_utf32_quads() {
        let codec = CharsetCodec::utf32be();
        let mut bytes = Vec::new();
        for c in "a✓".chars() {
            bytes.extend_from_slice(&(c as u32).to_be_bytes());
        }
        let (text, consumed) = codec.decode(&bytes);
        assert_eq!(text, "a✓");
        assert_eq!(consumed, 8);

        // a partial quad stays unconsumed until finalized
        let (text, consumed) = codec.decode(&bytes[..6]);
        assert_eq!(text, "a");
        assert_eq!(consumed, 4);
        let text = codec.decode_final(&bytes[..6]);
        assert_eq!(text, "a\u{FFFD}");
    }

    #[test]
    fn test_decode_utf32_invalid_scalar() {
        let codec = CharsetCodec::utf32le();
        let bytes = 0xFFFF_FFFFu32.to_le_bytes();
        let (text, consumed) = codec.decode(&bytes);
        assert_eq!(text, "\u{FFFD}");
        assert_eq!(consumed, 4);
    }

    // ========================================================================
    // Encoding and round-trip capability
    // ========================================================================

    #[test]
    fn test_encode_utf8_round_trip() {
        let codec = CharsetCodec::utf8();
        let bytes = codec.encode("Übergrößenträger");
        assert_eq!(codec.decode_final(&bytes), "Übergrößenträger");
    }

    #[test]
    fn test_encode_utf32_round_trip() {
        let codec = CharsetCodec::utf32le();
        let bytes = codec.encode("a✓\u{1F600}");
        assert_eq!(codec.decode_final(&bytes), "a✓\u{1F600}");
    }

    #[test]
    fn test_can_encode() {
        let latin1 = CharsetCodec::for_name("iso-8859-1").unwrap();
        assert!(latin1.can_encode('é'));
        assert!(!latin1.can_encode('新'));
        assert!(CharsetCodec::utf8().can_encode('新'));
        assert!(CharsetCodec::utf32be().can_encode('\u{1F600}'));
    }
}
