use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::{CodecError, CodecResult};

/// Media type assumed when a payload does not name one.
pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

const BASE64_MARKER: &str = "base64,";

/// A decoded inline image ready for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineImage {
    pub data: Bytes,
    pub media_type: String,
}

impl InlineImage {
    /// Decode a `<media-type>;base64,<body>` payload.
    ///
    /// Both `image/png;base64,...` and the `data:image/png;base64,...` URL
    /// form are accepted. A missing, malformed or unsupported media type falls back
    /// to [`DEFAULT_MEDIA_TYPE`] instead of failing; a body that is not valid
    /// base64, or decodes to nothing, is an error.
    pub fn decode(payload: &str) -> CodecResult<Self> {
        let payload = payload.trim();
        let (prefix, body) = match payload.find(BASE64_MARKER) {
            Some(at) => (&payload[..at], &payload[at + BASE64_MARKER.len()..]),
            None => ("", payload),
        };
        let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let data = BASE64_STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| CodecError::InvalidImage(e.to_string()))?;
        if data.is_empty() {
            return Err(CodecError::InvalidImage("empty image body".into()));
        }
        Ok(Self {
            data: Bytes::from(data),
            media_type: media_type_from_prefix(prefix),
        })
    }

    /// File extension for this image's media type.
    pub fn extension(&self) -> &'static str {
        extension_for_media_type(&self.media_type)
    }
}

fn media_type_from_prefix(prefix: &str) -> String {
    let token = prefix.trim().trim_end_matches(';');
    let token = token.strip_prefix("data:").unwrap_or(token);
    // Drop parameters such as `;charset=...`.
    let token = token.split(';').next().unwrap_or_default().trim();
    match token.split_once('/') {
        Some((kind, sub)) if is_token(kind) && is_token(sub) => {
            let media_type = token.to_ascii_lowercase();
            // Stored media type and blob extension must agree.
            if is_supported(&media_type) {
                media_type
            } else {
                DEFAULT_MEDIA_TYPE.to_string()
            }
        }
        _ => DEFAULT_MEDIA_TYPE.to_string(),
    }
}

fn is_supported(media_type: &str) -> bool {
    matches!(
        media_type,
        "image/jpeg" | "image/jpg" | "image/png" | "image/gif" | "image/webp"
    )
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_'))
}

/// Fixed media type to extension table; anything else maps to `jpg`.
pub fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn decodes_bare_media_type_prefix() {
        let image = InlineImage::decode("image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(image.media_type, "image/png");
        assert_eq!(&image.data[..], &PNG_SIGNATURE);
        assert_eq!(image.extension(), "png");
    }

    #[test]
    fn decodes_data_url() {
        let image = InlineImage::decode("data:image/webp;base64,AAEC").unwrap();
        assert_eq!(image.media_type, "image/webp");
        assert_eq!(&image.data[..], &[0, 1, 2]);
    }

    #[test]
    fn missing_media_type_defaults_to_jpeg() {
        for payload in ["AAEC", ";base64,AAEC", "data:;base64,AAEC", "garbage;base64,AAEC"] {
            let image = InlineImage::decode(payload).unwrap();
            assert_eq!(image.media_type, DEFAULT_MEDIA_TYPE, "payload {payload:?}");
            assert_eq!(image.extension(), "jpg");
        }
    }

    #[test]
    fn unsupported_media_types_fall_back_to_jpeg() {
        for payload in [
            "image/tiff;base64,AAEC",
            "text/html;base64,AAEC",
            "data:image/svg+xml;base64,AAEC",
        ] {
            let image = InlineImage::decode(payload).unwrap();
            assert_eq!(image.media_type, DEFAULT_MEDIA_TYPE, "payload {payload:?}");
            assert_eq!(image.extension(), "jpg");
        }
    }

    #[test]
    fn media_type_is_normalized() {
        let image = InlineImage::decode("data:Image/GIF;name=x.gif;base64,AAEC").unwrap();
        assert_eq!(image.media_type, "image/gif");
    }

    #[test]
    fn whitespace_in_body_is_ignored() {
        let image = InlineImage::decode("image/png;base64,iVBO\nRw0K\r\nGgo=").unwrap();
        assert_eq!(&image.data[..], &PNG_SIGNATURE);
    }

    #[test]
    fn invalid_bodies_fail() {
        assert!(matches!(
            InlineImage::decode("image/png;base64,***"),
            Err(CodecError::InvalidImage(_))
        ));
        assert!(matches!(
            InlineImage::decode("image/png;base64,"),
            Err(CodecError::InvalidImage(_))
        ));
    }

    #[test]
    fn extension_table() {
        assert_eq!(extension_for_media_type("image/jpeg"), "jpg");
        assert_eq!(extension_for_media_type("image/jpg"), "jpg");
        assert_eq!(extension_for_media_type("IMAGE/PNG"), "png");
        assert_eq!(extension_for_media_type("image/gif"), "gif");
        assert_eq!(extension_for_media_type("image/webp"), "webp");
        assert_eq!(extension_for_media_type("image/tiff"), "jpg");
        assert_eq!(extension_for_media_type(""), "jpg");
    }
}
