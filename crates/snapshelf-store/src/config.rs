use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snapshelf_blob::CapabilityRoot;

use crate::error::{StoreError, StoreResult};

pub const ENV_PHOTOS_URL: &str = "SNAPSHELF_PHOTOS_URL";
pub const ENV_COMMENTS_URL: &str = "SNAPSHELF_COMMENTS_URL";

/// Store configuration, read once at startup.
///
/// Rotating a capability token means changing `photos_url`/`comments_url`
/// and restarting; nothing is reloaded at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root capability URL of the bucket holding images and the photo index.
    pub photos_url: String,
    /// Root capability URL of the bucket holding the comment index.
    pub comments_url: String,
    pub photo_index_blob: String,
    pub comment_index_blob: String,
    /// Image blobs are named `{image_prefix}{id}.{ext}`.
    pub image_prefix: String,
    /// First comment id handed out when no comments exist yet.
    pub comment_id_floor: u64,
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            photos_url: String::new(),
            comments_url: String::new(),
            photo_index_blob: "photos.json".into(),
            comment_index_blob: "comments.json".into(),
            image_prefix: "photo-".into(),
            comment_id_floor: 1,
            request_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> StoreResult<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    StoreError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override the capability roots from `lookup` (normally the process
    /// environment). Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_PHOTOS_URL).filter(|v| !v.trim().is_empty()) {
            self.photos_url = url;
        }
        if let Some(url) = lookup(ENV_COMMENTS_URL).filter(|v| !v.trim().is_empty()) {
            self.comments_url = url;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration into bucket handles.
    pub fn buckets(&self) -> StoreResult<Buckets> {
        let photos = parse_root("photos_url", &self.photos_url)?;
        let comments = parse_root("comments_url", &self.comments_url)?;
        for (field, value) in [
            ("photo_index_blob", &self.photo_index_blob),
            ("comment_index_blob", &self.comment_index_blob),
        ] {
            if value.is_empty() || value.contains(['/', '?']) {
                return Err(StoreError::Config(format!("{field} must be a bare blob name")));
            }
        }
        if self.image_prefix.contains(['/', '?']) {
            return Err(StoreError::Config("image_prefix must not contain '/' or '?'".into()));
        }
        Ok(Buckets {
            photos,
            comments,
            photo_index: self.photo_index_blob.clone(),
            comment_index: self.comment_index_blob.clone(),
            image_prefix: self.image_prefix.clone(),
            comment_id_floor: self.comment_id_floor.max(1),
        })
    }
}

fn parse_root(field: &str, value: &str) -> StoreResult<CapabilityRoot> {
    if value.trim().is_empty() {
        return Err(StoreError::Config(format!("{field} is not set")));
    }
    CapabilityRoot::parse(value).map_err(|e| StoreError::Config(format!("{field}: {e}")))
}

/// Which bucket an operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Photos,
    Comments,
}

/// Validated bucket roots and well-known blob names.
#[derive(Clone, Debug)]
pub struct Buckets {
    pub photos: CapabilityRoot,
    pub comments: CapabilityRoot,
    pub photo_index: String,
    pub comment_index: String,
    pub image_prefix: String,
    pub comment_id_floor: u64,
}

impl Buckets {
    pub fn root(&self, bucket: Bucket) -> &CapabilityRoot {
        match bucket {
            Bucket::Photos => &self.photos,
            Bucket::Comments => &self.comments,
        }
    }

    pub fn photo_index_url(&self) -> String {
        self.photos.resolve(&self.photo_index)
    }

    pub fn comment_index_url(&self) -> String {
        self.comments.resolve(&self.comment_index)
    }

    /// Blob name of a photo's image, computable from id and extension alone.
    pub fn image_blob_name(&self, photo_id: &str, extension: &str) -> String {
        format!("{}{}.{}", self.image_prefix, photo_id, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTOS: &str = "https://acct.example.net/photos?sig=p";
    const COMMENTS: &str = "https://acct.example.net/comments?sig=c";

    fn configured() -> StoreConfig {
        StoreConfig {
            photos_url: PHOTOS.into(),
            comments_url: COMMENTS.into(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let c = StoreConfig::default();
        assert_eq!(c.photo_index_blob, "photos.json");
        assert_eq!(c.comment_index_blob, "comments.json");
        assert_eq!(c.image_prefix, "photo-");
        assert_eq!(c.comment_id_floor, 1);
        assert_eq!(c.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn parse_toml_with_partial_fields() {
        let c = StoreConfig::from_toml_str(&format!(
            "photos_url = \"{PHOTOS}\"\ncomments_url = \"{COMMENTS}\"\ncomment_id_floor = 1000\n"
        ))
        .unwrap();
        assert_eq!(c.comment_id_floor, 1000);
        assert_eq!(c.image_prefix, "photo-");
        assert!(StoreConfig::from_toml_str("photos_url = 3").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshelf.toml");
        std::fs::write(&path, format!("photos_url = \"{PHOTOS}\"\n")).unwrap();
        let c = StoreConfig::load(Some(&path)).unwrap();
        // The environment may override, but only with a non-empty URL.
        assert!(!c.photos_url.is_empty());

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            StoreConfig::load(Some(&missing)),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn env_overrides_roots() {
        let mut c = configured();
        c.apply_env(|key| match key {
            ENV_PHOTOS_URL => Some("https://acct.example.net/photos?sig=rotated".into()),
            ENV_COMMENTS_URL => Some("  ".into()),
            _ => None,
        });
        assert_eq!(c.photos_url, "https://acct.example.net/photos?sig=rotated");
        assert_eq!(c.comments_url, COMMENTS);
    }

    #[test]
    fn buckets_validate_roots() {
        let b = configured().buckets().unwrap();
        assert_eq!(
            b.photo_index_url(),
            "https://acct.example.net/photos/photos.json?sig=p"
        );
        assert_eq!(
            b.comment_index_url(),
            "https://acct.example.net/comments/comments.json?sig=c"
        );
        assert_eq!(b.image_blob_name("7", "png"), "photo-7.png");
        assert_eq!(b.root(Bucket::Comments).base(), "https://acct.example.net/comments");

        let unset = StoreConfig::default().buckets().unwrap_err();
        assert!(unset.to_string().contains("photos_url is not set"));

        let bad = StoreConfig {
            comments_url: "not a url".into(),
            ..configured()
        };
        assert!(bad.buckets().unwrap_err().to_string().contains("comments_url"));
    }

    #[test]
    fn buckets_reject_path_like_names() {
        let c = StoreConfig {
            photo_index_blob: "nested/photos.json".into(),
            ..configured()
        };
        assert!(matches!(c.buckets(), Err(StoreError::Config(_))));

        let c = StoreConfig {
            comment_id_floor: 0,
            ..configured()
        };
        assert_eq!(c.buckets().unwrap().comment_id_floor, 1);
    }
}
