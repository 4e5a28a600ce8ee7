//! Character encoding detection
//!
//! This module implements the two-phase charset detection protocol that
//! decides which [`CharsetCodec`] decodes a document and whether a leading
//! byte-order mark must be skipped.
//!
//! # Detection cascade
//!
//! Detection peeks a bounded prefix of the stream through the byte reader's
//! mark/reset window, then decides in priority order:
//!
//! 1. **Byte-order mark**: the standard signatures for UTF-32BE, UTF-32LE,
//!    UTF-16BE, UTF-16LE, and UTF-8, most specific first. A BOM overrides
//!    any caller-supplied or sniffed charset.
//! 2. **Declared charset**: a validated caller-supplied name (typically from
//!    a `Content-Type` header) is used directly, with no sniffing. An
//!    invalid name is treated as absent.
//! 3. **Content sniffing**: the peeked prefix is optimistically decoded as
//!    UTF-8 and provisionally parsed; the first `<meta>` element carrying a
//!    charset wins, else the XML declaration's `encoding` pseudo-attribute.
//! 4. **Default**: UTF-8.
//!
//! A sniffed charset that differs from UTF-8 discards the provisional parse
//! and forces a full re-decode. When the sniff confirms UTF-8 (or finds
//! nothing), the provisional parse is reusable only if the peek exhausted
//! the source, since otherwise only a prefix was parsed.
//!
//! Detection never raises an error for a bad charset name: unsupported and
//! malformed declarations silently degrade to the UTF-8 default.
//!
//! # Examples
//!
//! ```rust
//! use html_charset_stream::{detect_charset, MarkableByteReader, SliceSource};
//!
//! let html = b"<html><head><meta charset=\"windows-1251\"></head></html>";
//! let mut reader = MarkableByteReader::new(SliceSource::new(html));
//! let detection = detect_charset(&mut reader, None).unwrap();
//! assert_eq!(detection.codec.name(), "windows-1251");
//! ```

use crate::codec::CharsetCodec;
use crate::error::DecodeError;
use crate::parser::parse_dom;
use crate::reader::MarkableByteReader;
use crate::source::ByteSource;
use log::debug;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::sync::OnceLock;

/// Default charset when detection finds nothing better
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// How many bytes detection peeks before committing to a charset
const PEEK_BYTES: usize = 5 * 1024;

/// UTF-8 BOM bytes
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
/// UTF-16 big-endian BOM bytes
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
/// UTF-16 little-endian BOM bytes
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-32 big-endian BOM bytes
const UTF32_BE_BOM: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];
/// UTF-32 little-endian BOM bytes
const UTF32_LE_BOM: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];

/// The outcome of charset detection
pub struct Detection {
    /// The codec the document must be decoded with
    pub codec: CharsetCodec,
    /// Leading bytes to skip before decoding (the BOM length, 0 when none)
    pub bom_bytes: usize,
    /// A reusable provisional parse, present only when the peek consumed the
    /// entire source under the finally-selected charset
    pub provisional: Option<RcDom>,
}

impl Detection {
    /// Whether a byte-order mark was found and must be skipped
    pub fn skip_leading_bom(&self) -> bool {
        self.bom_bytes > 0
    }
}

/// Detect the charset of the stream behind `reader`
///
/// Peeks up to a few kilobytes through the reader's mark/reset window and
/// runs the detection cascade described in the module documentation. On
/// return the reader is rewound to where it started; the caller decodes from
/// there (skipping [`Detection::bom_bytes`] first) unless
/// [`Detection::provisional`] already holds the whole parsed document.
///
/// `declared` is a caller-supplied charset name, typically extracted from a
/// `Content-Type` header with [`extract_charset_from_content_type`].
///
/// # Errors
///
/// Only I/O and stream-state failures surface; charset problems never do.
pub fn detect_charset<S: ByteSource>(
    reader: &mut MarkableByteReader<S>,
    declared: Option<&str>,
) -> Result<Detection, DecodeError> {
    let start = reader.pos();
    reader.mark(PEEK_BYTES);
    let mut peek = vec![0u8; PEEK_BYTES];
    let mut filled = 0;
    let mut fully_read = false;
    while filled < peek.len() {
        let got = reader.read(&mut peek[filled..])?;
        if got == 0 {
            fully_read = true;
            break;
        }
        filled += got;
    }
    peek.truncate(filled);
    reader.reset_to(start)?;

    if let Some((codec, bom_bytes)) = sniff_bom(&peek) {
        debug!("BOM detected, decoding as {}", codec.name());
        return Ok(Detection {
            codec,
            bom_bytes,
            provisional: None,
        });
    }

    if let Some(name) = declared {
        if let Some(codec) = CharsetCodec::for_name(name) {
            debug!("using declared charset {}", codec.name());
            return Ok(Detection {
                codec,
                bom_bytes: 0,
                provisional: None,
            });
        }
        debug!("declared charset {:?} not recognized, sniffing content", name);
    }

    // optimistic pre-parse: decode the prefix as UTF-8 and look for an
    // in-document declaration; an incomplete trailing sequence at the window
    // edge is simply left undecoded
    let (text, _) = CharsetCodec::utf8().decode(&peek);
    let provisional = parse_dom(&text);
    let found = charset_from_meta(&provisional.document)
        .or_else(|| charset_from_xml_decl(&provisional.document));

    let codec = match found.as_deref().and_then(CharsetCodec::for_name) {
        Some(codec) if !codec.is_utf8() => {
            debug!(
                "sniffed charset {}, provisional parse discarded for re-decode",
                codec.name()
            );
            return Ok(Detection {
                codec,
                bom_bytes: 0,
                provisional: None,
            });
        }
        Some(codec) => codec,
        None => {
            if let Some(name) = &found {
                debug!("sniffed charset {:?} not recognized, defaulting to UTF-8", name);
            }
            CharsetCodec::utf8()
        }
    };

    // the provisional parse covered only a prefix unless the peek hit EOF
    Ok(Detection {
        codec,
        bom_bytes: 0,
        provisional: fully_read.then_some(provisional),
    })
}

/// Match the leading bytes against the standard BOM signatures
///
/// Four-byte marks are checked before two-byte marks: `FF FE 00 00` must be
/// UTF-32LE, not a UTF-16LE BOM followed by two NULs.
fn sniff_bom(peek: &[u8]) -> Option<(CharsetCodec, usize)> {
    if peek.starts_with(&UTF32_BE_BOM) {
        return Some((CharsetCodec::utf32be(), UTF32_BE_BOM.len()));
    }
    if peek.starts_with(&UTF32_LE_BOM) {
        return Some((CharsetCodec::utf32le(), UTF32_LE_BOM.len()));
    }
    if peek.starts_with(&UTF8_BOM) {
        return Some((CharsetCodec::utf8(), UTF8_BOM.len()));
    }
    if peek.starts_with(&UTF16_BE_BOM) {
        return Some((CharsetCodec::utf16be(), UTF16_BE_BOM.len()));
    }
    if peek.starts_with(&UTF16_LE_BOM) {
        return Some((CharsetCodec::utf16le(), UTF16_LE_BOM.len()));
    }
    None
}

/// Find the first `<meta>` element in document order that names a charset
///
/// Within one element an `http-equiv="Content-Type"` declaration wins over a
/// bare `charset` attribute; across elements, document order wins.
fn charset_from_meta(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, attrs, .. } => {
            if name.local.as_ref() == "meta"
                && let Some(charset) = meta_element_charset(&attrs.borrow())
            {
                return Some(charset);
            }
            for child in node.children.borrow().iter() {
                if let Some(charset) = charset_from_meta(child) {
                    return Some(charset);
                }
            }
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                if let Some(charset) = charset_from_meta(child) {
                    return Some(charset);
                }
            }
        }
        _ => {}
    }
    None
}

/// Extract a charset from one meta element's attributes
fn meta_element_charset(attrs: &[html5ever::Attribute]) -> Option<String> {
    if let Some(http_equiv) = attr_value(attrs, "http-equiv")
        && http_equiv.trim().eq_ignore_ascii_case("content-type")
        && let Some(content) = attr_value(attrs, "content")
        && let Some(charset) = extract_charset_from_content_type(content)
    {
        return Some(charset);
    }
    let charset = attr_value(attrs, "charset")?.trim();
    if charset.is_empty() {
        None
    } else {
        Some(charset.to_string())
    }
}

/// Get an attribute value from an element's attribute list
fn attr_value<'a>(attrs: &'a [html5ever::Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.as_ref())
}

/// Extract the `encoding` pseudo-attribute of a leading XML declaration
///
/// The HTML parser surfaces `<?xml ... ?>` as a bogus comment before the root
/// element; anything after the root element cannot be an XML declaration.
fn charset_from_xml_decl(document: &Handle) -> Option<String> {
    static XML_ENCODING_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = XML_ENCODING_REGEX
        .get_or_init(|| Regex::new(r#"(?i)encoding\s*=\s*['"]?([^'"\s?>]+)"#).ok())
        .as_ref()?;

    for child in document.children.borrow().iter() {
        match &child.data {
            NodeData::Comment { contents } => {
                let contents = contents.trim_start();
                if contents
                    .get(..4)
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case("?xml"))
                {
                    return regex
                        .captures(contents)
                        .and_then(|caps| caps.get(1))
                        .map(|m| m.as_str().to_string());
                }
            }
            NodeData::Element { .. } => break,
            _ => {}
        }
    }
    None
}

/// Extract the charset parameter from a `Content-Type` header value
///
/// Handles the usual shapes: `text/html; charset=UTF-8`, quoted values, no
/// space after the semicolon, and trailing parameters.
///
/// # Examples
///
/// ```rust
/// use html_charset_stream::extract_charset_from_content_type;
///
/// assert_eq!(
///     extract_charset_from_content_type("text/html; charset=ISO-8859-1"),
///     Some("ISO-8859-1".to_string())
/// );
/// assert_eq!(extract_charset_from_content_type("text/html"), None);
/// ```
pub fn extract_charset_from_content_type(content_type: &str) -> Option<String> {
    static CHARSET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = CHARSET_REGEX
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*['"]?([^'";,\s]+)"#).ok())
        .as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
