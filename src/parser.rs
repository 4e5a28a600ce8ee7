//! End-to-end parse pipeline
//!
//! This module wires the pieces together the way a caller consumes them: a
//! [`ByteSource`] is wrapped in a [`MarkableByteReader`], the charset
//! detector peeks and decides, and a [`ChunkedCharDecoder`] turns the bytes
//! into text for the HTML parser. Parsing itself is delegated to html5ever,
//! which implements the WHATWG parsing algorithm and handles malformed
//! markup gracefully; this crate owns everything up to the character stream.
//!
//! The finally-selected charset travels with the parsed document so that
//! re-serialization can use a consistent encoding.
//!
//! # Examples
//!
//! ```rust
//! use html_charset_stream::parse_bytes;
//!
//! let doc = parse_bytes(b"<html><body><p>Hello</p></body></html>", None).unwrap();
//! assert_eq!(doc.charset(), "UTF-8");
//! assert_eq!(doc.text(), "Hello");
//! ```
//!
//! When the document declares a non-default charset, the whole stream is
//! re-decoded with it:
//!
//! ```rust
//! use html_charset_stream::parse_bytes;
//!
//! // "é" is E9 in windows-1252
//! let mut html = b"<html><head><meta charset=windows-1252></head><body>".to_vec();
//! html.push(0xE9);
//! html.extend_from_slice(b"</body></html>");
//! let doc = parse_bytes(&html, None).unwrap();
//! assert_eq!(doc.charset(), "windows-1252");
//! assert_eq!(doc.text(), "é");
//! ```

use crate::charset::{detect_charset, extract_charset_from_content_type};
use crate::decoder::{ChunkedCharDecoder, DEFAULT_CHUNK_SIZE};
use crate::error::DecodeError;
use crate::reader::MarkableByteReader;
use crate::source::{ByteSource, SliceSource};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// A parsed HTML document together with its resolved charset
///
/// The charset is the one the byte stream was actually decoded with, whether from a
/// BOM, a declaration, content sniffing, or the UTF-8 default, and is what
/// re-serialization should use.
pub struct HtmlDocument {
    dom: RcDom,
    charset: String,
}

impl HtmlDocument {
    /// The parsed DOM tree
    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    /// Consume the document, yielding the DOM tree
    pub fn into_dom(self) -> RcDom {
        self.dom
    }

    /// The canonical name of the charset the document was decoded with
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// The document's text content, whitespace-normalized
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.dom.document, &mut out);
        let mut normalized = String::with_capacity(out.len());
        for word in out.split_whitespace() {
            if !normalized.is_empty() {
                normalized.push(' ');
            }
            normalized.push_str(word);
        }
        normalized
    }
}

/// Parse an HTML document from a byte source, detecting its charset
///
/// Runs the full pipeline: peek-and-detect, then either reuse the detection
/// phase's provisional parse (when it already covered the entire source under
/// the final charset) or re-decode the whole stream with the selected codec
/// and parse that.
///
/// `declared_charset` is a charset name known from outside the document,
/// e.g. a `Content-Type` header; it loses only to a byte-order mark.
///
/// # Errors
///
/// I/O failures from the source and stream-state violations surface as
/// [`DecodeError`]. An unrecognized `declared_charset` is not an error; it is
/// ignored in favor of sniffing, per the detection policy.
pub fn parse_source<S: ByteSource>(
    source: S,
    declared_charset: Option<&str>,
) -> Result<HtmlDocument, DecodeError> {
    let mut reader = MarkableByteReader::new(source);
    let detection = detect_charset(&mut reader, declared_charset)?;
    let charset = detection.codec.name().to_string();

    if let Some(dom) = detection.provisional {
        return Ok(HtmlDocument { dom, charset });
    }

    if detection.bom_bytes > 0 {
        reader.skip(detection.bom_bytes as u64)?;
    }
    let mut decoder = ChunkedCharDecoder::new(reader, detection.codec, DEFAULT_CHUNK_SIZE);
    let text = decoder.read_to_end()?;
    Ok(HtmlDocument {
        dom: parse_dom(&text),
        charset,
    })
}

/// Parse an in-memory HTML document, detecting its charset
///
/// Convenience wrapper over [`parse_source`] with a [`SliceSource`].
pub fn parse_bytes(html: &[u8], declared_charset: Option<&str>) -> Result<HtmlDocument, DecodeError> {
    parse_source(SliceSource::new(html), declared_charset)
}

/// Parse an in-memory HTML document, taking the declared charset from a
/// `Content-Type` header value
///
/// The header's `charset` parameter, when present and recognized, seeds
/// detection the same way `declared_charset` does in [`parse_source`].
///
/// # Examples
///
/// ```rust
/// use html_charset_stream::parse_with_content_type;
///
/// let doc = parse_with_content_type(
///     b"<html><body>ok</body></html>",
///     Some("text/html; charset=UTF-8"),
/// )
/// .unwrap();
/// assert_eq!(doc.charset(), "UTF-8");
/// ```
pub fn parse_with_content_type(
    html: &[u8],
    content_type: Option<&str>,
) -> Result<HtmlDocument, DecodeError> {
    let declared = content_type.and_then(extract_charset_from_content_type);
    parse_source(SliceSource::new(html), declared.as_deref())
}

/// Parse already-decoded text into a DOM tree
pub(crate) fn parse_dom(text: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(text)
}

/// Append the text content of `node` and its descendants to `out`
fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => {
            out.push_str(&contents.borrow());
        }
        NodeData::Element { name, .. } => {
            // script and style payloads are code, not document text
            if matches!(name.local.as_ref(), "script" | "style") {
                return;
            }
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}
