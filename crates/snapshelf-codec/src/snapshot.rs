use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snapshelf_types::{Comment, Photo};

use crate::error::{CodecError, CodecResult};

/// Media type of both index documents.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Codec for the photo and comment index documents.
///
/// The photo index is an array of photos with their comments nested; the
/// comment index is a flat array of every comment, each tagged with its
/// photo id. Neither carries a schema version.
pub struct SnapshotCodec;

impl SnapshotCodec {
    pub fn encode_photos(photos: &[Photo]) -> CodecResult<Bytes> {
        encode(photos)
    }

    /// Decode a photo index. There is no partial recovery: one bad record
    /// fails the whole document.
    pub fn decode_photos(data: &[u8]) -> CodecResult<Vec<Photo>> {
        decode(data)
    }

    pub fn encode_comments(comments: &[Comment]) -> CodecResult<Bytes> {
        encode(comments)
    }

    pub fn decode_comments(data: &[u8]) -> CodecResult<Vec<Comment>> {
        decode(data)
    }

    /// Every comment of every photo, in photo order then thread order,
    /// re-tagged with the id of the photo that holds it.
    pub fn flatten_comments(photos: &[Photo]) -> Vec<Comment> {
        photos
            .iter()
            .flat_map(|photo| {
                photo.comments.iter().map(move |comment| Comment {
                    photo_id: photo.id.clone(),
                    ..comment.clone()
                })
            })
            .collect()
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> CodecResult<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| CodecError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> CodecResult<T> {
    serde_json::from_slice(data).map_err(|e| CodecError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use snapshelf_types::Principal;

    fn photo(id: &str, comments: &[(&str, &str)]) -> Photo {
        let owner = Principal::new("1", "alice");
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut photo = Photo::new(id, &owner, format!("https://h/photos/photo-{id}.jpg"), "t", None, at);
        for (cid, text) in comments {
            // Deliberately stale back-reference; flattening must fix it.
            photo.comments.push(Comment::new(*cid, "stale", &owner, *text, at));
        }
        photo
    }

    #[test]
    fn photo_index_is_a_json_array() {
        let bytes = SnapshotCodec::encode_photos(&[photo("1", &[("5", "hi")])]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["id"], "1");
        assert_eq!(array[0]["comments"][0]["content"], "hi");

        let decoded = SnapshotCodec::decode_photos(&bytes).unwrap();
        assert_eq!(decoded, vec![photo("1", &[("5", "hi")])]);
    }

    #[test]
    fn empty_index_encodes_as_empty_array() {
        assert_eq!(&SnapshotCodec::encode_photos(&[]).unwrap()[..], b"[]");
        assert!(SnapshotCodec::decode_photos(b"[]").unwrap().is_empty());
        assert!(SnapshotCodec::decode_comments(b"[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_index_is_an_error() {
        for bad in [&b""[..], b"{", b"{}", b"[{\"id\":\"1\"}]"] {
            assert!(matches!(
                SnapshotCodec::decode_photos(bad),
                Err(CodecError::Deserialization(_))
            ));
        }
    }

    #[test]
    fn flatten_retags_comments_with_parent_id() {
        let photos = vec![
            photo("1", &[("1", "a"), ("3", "c")]),
            photo("2", &[]),
            photo("4", &[("2", "b")]),
        ];
        let flat = SnapshotCodec::flatten_comments(&photos);
        let view: Vec<(&str, &str)> = flat
            .iter()
            .map(|c| (c.id.as_str(), c.photo_id.as_str()))
            .collect();
        assert_eq!(view, vec![("1", "1"), ("3", "1"), ("2", "4")]);

        let bytes = SnapshotCodec::encode_comments(&flat).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[2]["photoId"], "4");
    }
}
