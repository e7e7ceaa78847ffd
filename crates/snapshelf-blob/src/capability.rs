use std::fmt;

use crate::error::{BlobError, BlobResult};

/// Query appended to a bucket root to enumerate its blobs.
const LIST_QUERY: &str = "restype=container&comp=list";

/// A bucket's root capability URL, split into base path and access token.
///
/// `https://acct.example.net/photos?sv=2024&sig=abc` parses into the base
/// `https://acct.example.net/photos` and the token `sv=2024&sig=abc`. The
/// token is kept verbatim; it is opaque to us.
#[derive(Clone, PartialEq, Eq)]
pub struct CapabilityRoot {
    base: String,
    token: String,
}

impl CapabilityRoot {
    /// Parse and validate a root capability URL.
    ///
    /// The URL must be absolute http(s) with a host and a bucket path. The
    /// token may be empty (public or emulator buckets).
    pub fn parse(url: &str) -> BlobResult<Self> {
        let url = url.trim();
        let (path, token) = match url.split_once('?') {
            Some((path, token)) => (path, token),
            None => (url, ""),
        };
        let rest =
            strip_scheme(path).ok_or_else(|| BlobError::MalformedUrl(redact(url).to_string()))?;
        let base = path.trim_end_matches('/');
        let host_and_bucket = rest.trim_end_matches('/');
        match host_and_bucket.split_once('/') {
            Some((host, bucket)) if !host.is_empty() && !bucket.is_empty() => {}
            _ => return Err(BlobError::MalformedUrl(redact(url).to_string())),
        }
        Ok(Self {
            base: base.to_string(),
            token: token.trim_start_matches('?').to_string(),
        })
    }

    /// Bucket path without the token.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Full request URL for `blob_name` under this root.
    pub fn resolve(&self, blob_name: &str) -> String {
        self.with_token(format!("{}/{}", self.base, blob_name), None)
    }

    /// URL that enumerates the bucket.
    pub fn list_url(&self) -> String {
        self.with_token(self.base.clone(), Some(LIST_QUERY))
    }

    /// Whether `url` addresses a blob directly inside this bucket,
    /// regardless of which token it carries.
    pub fn contains(&self, url: &str) -> bool {
        match redact(url).rsplit_once('/') {
            Some((parent, name)) => parent == self.base && !name.is_empty(),
            None => false,
        }
    }

    /// Whether `url` has the shape of a blob URL issued by a root like this
    /// one: http(s), the same path depth as this bucket, and a blob name.
    /// Host, bucket and token may all differ.
    pub fn matches_shape(&self, url: &str) -> bool {
        let Some(rest) = strip_scheme(redact(url)) else {
            return false;
        };
        let segments: Vec<&str> = rest.split('/').collect();
        segments.len() == self.depth() + 1 && segments.iter().all(|s| !s.is_empty())
    }

    /// Re-issue `url` under this root: same blob name, current base and
    /// token.
    ///
    /// Any URL with blob URL shape is moved, including ones issued by an
    /// earlier root on another host or bucket. Returns `None` for anything
    /// else, which the caller should leave untouched.
    pub fn refresh(&self, url: &str) -> Option<String> {
        if !self.matches_shape(url) {
            return None;
        }
        extract_blob_name(url).ok().map(|name| self.resolve(name))
    }

    /// Host plus bucket path segments.
    fn depth(&self) -> usize {
        strip_scheme(&self.base).map_or(0, |rest| rest.split('/').count())
    }

    fn with_token(&self, mut url: String, extra: Option<&str>) -> String {
        let params: Vec<&str> = [Some(self.token.as_str()), extra]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

// Never print the token.
impl fmt::Debug for CapabilityRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRoot")
            .field("base", &self.base)
            .field("has_token", &self.has_token())
            .finish()
    }
}

impl fmt::Display for CapabilityRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// Recover the bare blob name from a URL issued by [`CapabilityRoot::resolve`]:
/// everything after the last path separator, up to the query marker.
pub fn extract_blob_name(url: &str) -> BlobResult<&str> {
    match redact(url).rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => Ok(name),
        _ => Err(BlobError::MalformedUrl(redact(url).to_string())),
    }
}

fn strip_scheme(url: &str) -> Option<&str> {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
}

/// Strip the query string (and with it any access token) from a URL.
pub fn redact(url: &str) -> &str {
    match url.split_once('?') {
        Some((path, _)) => path,
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "https://acct.blob.example.net/photos?sv=2024-01-01&sp=rwdl&sig=abc%3D";

    #[test]
    fn resolve_joins_base_name_and_token() {
        let root = CapabilityRoot::parse(ROOT).unwrap();
        assert_eq!(root.base(), "https://acct.blob.example.net/photos");
        assert_eq!(
            root.resolve("photo-1.png"),
            "https://acct.blob.example.net/photos/photo-1.png?sv=2024-01-01&sp=rwdl&sig=abc%3D"
        );
    }

    #[test]
    fn resolve_without_token() {
        let root = CapabilityRoot::parse("http://127.0.0.1:10000/devstore/photos/").unwrap();
        assert!(!root.has_token());
        assert_eq!(
            root.resolve("photos.json"),
            "http://127.0.0.1:10000/devstore/photos/photos.json"
        );
        assert_eq!(
            root.list_url(),
            "http://127.0.0.1:10000/devstore/photos?restype=container&comp=list"
        );
    }

    #[test]
    fn list_url_appends_to_token() {
        let root = CapabilityRoot::parse(ROOT).unwrap();
        assert_eq!(
            root.list_url(),
            "https://acct.blob.example.net/photos?sv=2024-01-01&sp=rwdl&sig=abc%3D&restype=container&comp=list"
        );
    }

    #[test]
    fn parse_rejects_malformed_roots() {
        for bad in ["", "photos", "ftp://host/photos", "https://", "https://host", "https://host/"] {
            assert!(
                matches!(CapabilityRoot::parse(bad), Err(BlobError::MalformedUrl(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_error_does_not_leak_token() {
        let err = CapabilityRoot::parse("https://host?sig=secret").unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn extract_blob_name_strips_path_and_query() {
        let url = "https://acct.blob.example.net/photos/photo-12.jpg?sv=x&sig=y";
        assert_eq!(extract_blob_name(url).unwrap(), "photo-12.jpg");
        assert_eq!(extract_blob_name("https://h/b/photos.json").unwrap(), "photos.json");
        assert!(extract_blob_name("https://h/b/?sig=x").is_err());
        assert!(extract_blob_name("no-slashes").is_err());
    }

    #[test]
    fn refresh_reissues_under_new_token() {
        let old = "https://acct.blob.example.net/photos/photo-3.gif?sig=expired";
        let root = CapabilityRoot::parse("https://acct.blob.example.net/photos?sig=fresh").unwrap();
        assert!(root.contains(old));
        assert_eq!(
            root.refresh(old).unwrap(),
            "https://acct.blob.example.net/photos/photo-3.gif?sig=fresh"
        );
    }

    #[test]
    fn refresh_moves_blobs_from_another_host_and_bucket() {
        let root = CapabilityRoot::parse("https://new.example.net/shots?sig=new").unwrap();
        assert_eq!(
            root.refresh("https://old.example.net/photos/photo-1.jpg?sig=old").unwrap(),
            "https://new.example.net/shots/photo-1.jpg?sig=new"
        );
        assert_eq!(
            root.refresh("http://old.example.net/photos/photo-2.png").unwrap(),
            "https://new.example.net/shots/photo-2.png?sig=new"
        );
    }

    #[test]
    fn refresh_follows_bucket_depth() {
        let root = CapabilityRoot::parse("http://127.0.0.1:10000/devstore/photos?sig=n").unwrap();
        assert_eq!(
            root.refresh("https://acct.example.net/account/photos/photo-4.gif?sig=o").unwrap(),
            "http://127.0.0.1:10000/devstore/photos/photo-4.gif?sig=n"
        );
        assert!(root.refresh("https://acct.example.net/photos/photo-4.gif").is_none());
    }

    #[test]
    fn refresh_ignores_urls_without_blob_shape() {
        let root = CapabilityRoot::parse(ROOT).unwrap();
        for url in [
            "https://cdn.example.com/static/img/cat.png",
            "https://acct.blob.example.net/photos/nested/p.png",
            "https://acct.blob.example.net/photos/",
            "ftp://acct.blob.example.net/photos/p.png",
            "/photos/p.png",
            "data:image/png;base64,AAEC",
            "",
        ] {
            assert!(root.refresh(url).is_none(), "{url:?} should be left alone");
            assert!(!root.matches_shape(url));
        }
    }

    #[test]
    fn debug_hides_token() {
        let root = CapabilityRoot::parse(ROOT).unwrap();
        let debug = format!("{root:?}");
        assert!(!debug.contains("sig="));
        assert!(debug.contains("has_token: true"));
        assert_eq!(root.to_string(), "https://acct.blob.example.net/photos");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn extract_recovers_resolved_name(
                name in "[A-Za-z0-9._-]{1,40}",
                token in "[a-z]{1,8}=[A-Za-z0-9%]{1,16}",
            ) {
                let root = CapabilityRoot::parse(&format!("https://h.example/bucket?{token}")).unwrap();
                let url = root.resolve(&name);
                prop_assert_eq!(extract_blob_name(&url).unwrap(), name.as_str());
                prop_assert!(root.contains(&url));
                prop_assert_eq!(root.refresh(&url), Some(url.clone()));
            }
        }
    }
}
