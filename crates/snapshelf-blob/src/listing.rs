//! Container listing parser.
//!
//! The list response is an XML enumeration; the only thing we need from it
//! is the `<Name>` of each blob, so the body is scanned for those tokens
//! rather than parsed as a document.

const OPEN: &str = "<Name>";
const CLOSE: &str = "</Name>";

/// Extract every `<Name>...</Name>` value, in document order.
///
/// A dangling open tag ends the scan. Entity escapes for the five XML
/// predefined entities are decoded.
pub fn parse_blob_names(body: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        names.push(unescape(&after[..end]));
        rest = &after[end + CLOSE.len()..];
    }
    names
}

fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
