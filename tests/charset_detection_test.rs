//! End-to-end charset detection tests
//!
//! These tests exercise the whole pipeline through the public parse entry
//! points: BOM precedence, meta/Content-Type/XML-declaration sniffing, the
//! re-decode decision, and the silent-fallback error policy.

use html_charset_stream::{
    looks_gzipped, parse_bytes, parse_source, parse_with_content_type, CharsetCodec, ReadSource,
};

fn utf16be(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

// ============================================================================
// BOM precedence
// ============================================================================

#[test]
fn test_utf16be_bom_wins_over_contradicting_meta() {
    let bytes = utf16be("<html><head><meta charset=shift_jis></head><body>wide</body></html>");
    let doc = parse_bytes(&bytes, None).unwrap();
    assert_eq!(doc.charset(), "UTF-16BE");
    assert_eq!(doc.text(), "wide");
}

#[test]
fn test_utf16be_bom_wins_over_declared_charset() {
    let bytes = utf16be("<html><body>declared loses</body></html>");
    let doc = parse_bytes(&bytes, Some("windows-1251")).unwrap();
    assert_eq!(doc.charset(), "UTF-16BE");
    assert_eq!(doc.text(), "declared loses");
}

#[test]
fn test_utf32be_bom_document_parses() {
    let mut bytes = vec![0x00, 0x00, 0xFE, 0xFF];
    for c in "<html><body>quad</body></html>".chars() {
        bytes.extend_from_slice(&(c as u32).to_be_bytes());
    }
    let doc = parse_bytes(&bytes, None).unwrap();
    assert_eq!(doc.charset(), "UTF-32BE");
    assert_eq!(doc.text(), "quad");
}

// ============================================================================
// Sniffed charsets and the re-decode decision
// ============================================================================

#[test]
fn test_gb2312_meta_redecode() {
    // "新" is D0 C2 in GB2312; the provisional UTF-8 parse cannot represent
    // it, so detection must force a full re-decode
    let mut html = b"<html><head><meta charset=gb2312></head><body>".to_vec();
    html.extend_from_slice(&[0xD0, 0xC2]);
    html.extend_from_slice(b"</body></html>");

    let doc = parse_bytes(&html, None).unwrap();
    assert_eq!(doc.charset(), CharsetCodec::for_name("gb2312").unwrap().name());
    assert_eq!(doc.text(), "新");
}

#[test]
fn test_meta_beyond_peek_window_is_not_seen() {
    // a declaration buried past the peek window cannot influence detection;
    // the document still parses under the UTF-8 default
    let mut html = b"<html><head><title>".to_vec();
    html.extend(std::iter::repeat_n(b't', 6 * 1024));
    html.extend_from_slice(b"</title><meta charset=windows-1251></head><body>late</body></html>");
    let doc = parse_bytes(&html, None).unwrap();
    assert_eq!(doc.charset(), "UTF-8");
    assert!(doc.text().contains("late"));
}

#[test]
fn test_xml_declaration_drives_full_redecode() {
    // "ä" is E4 in ISO-8859-2
    let mut html = b"<?xml version=\"1.0\" encoding=\"ISO-8859-2\"?><html><body>".to_vec();
    html.push(0xE4);
    html.extend_from_slice(b"</body></html>");
    let doc = parse_bytes(&html, None).unwrap();
    assert_eq!(doc.charset(), "ISO-8859-2");
    assert_eq!(doc.text(), "ä");
}

// ============================================================================
// Content-Type header integration
// ============================================================================

#[test]
fn test_content_type_charset_applies() {
    let mut html = b"<html><body>na".to_vec();
    html.push(0xEF); // "ï" in windows-1252
    html.extend_from_slice(b"ve</body></html>");
    let doc = parse_with_content_type(&html, Some("text/html; charset=windows-1252")).unwrap();
    assert_eq!(doc.charset(), "windows-1252");
    assert_eq!(doc.text(), "naïve");
}

#[test]
fn test_content_type_without_charset_falls_back_to_sniffing() {
    let html = b"<html><head><meta charset=koi8-r></head><body>ok</body></html>";
    let doc = parse_with_content_type(html, Some("text/html")).unwrap();
    assert_eq!(doc.charset(), "KOI8-R");
}

// ============================================================================
// Error policy: detection failures never abort parsing
// ============================================================================

#[test]
fn test_unsupported_meta_charset_silently_defaults() {
    let html = b"<html><head><meta charset=iso-8></head><body><p>content</p></body></html>";
    let doc = parse_bytes(html, None).unwrap();
    assert_eq!(doc.charset(), "UTF-8");
    assert_eq!(doc.text(), "content");
}

#[test]
fn test_empty_charset_declaration_silently_defaults() {
    let html = b"<html><head><meta charset=\"\"></head><body>x</body></html>";
    let doc = parse_bytes(html, None).unwrap();
    assert_eq!(doc.charset(), "UTF-8");
}

#[test]
fn test_unsupported_declared_charset_still_parses() {
    let html = b"<html><body>graceful</body></html>";
    let doc = parse_bytes(html, Some("definitely-not-a-charset")).unwrap();
    assert_eq!(doc.charset(), "UTF-8");
    assert_eq!(doc.text(), "graceful");
}

// ============================================================================
// Alternative sources
// ============================================================================

#[test]
fn test_parse_from_io_reader() {
    let html: &[u8] = b"<html><head><meta charset=windows-1252></head><body>reader</body></html>";
    let doc = parse_source(ReadSource::new(html), None).unwrap();
    assert_eq!(doc.charset(), "windows-1252");
    assert_eq!(doc.text(), "reader");
}

#[test]
fn test_gzip_magic_is_recognizable_before_the_pipeline() {
    // decompression is a collaborator's job; this crate only exposes the sniff
    assert!(looks_gzipped(&[0x1F, 0x8B, 0x08]));
    assert!(!looks_gzipped(b"<!DOCTYPE html>"));
}
