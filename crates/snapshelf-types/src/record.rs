use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::principal::Principal;

/// An uploaded photograph together with its comment thread.
///
/// `image_url` is a derived value: it is recomputed from the image blob name
/// and the currently configured capability root whenever the collection is
/// loaded, so a persisted URL with an expired token is never served.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub owner_id: String,
    pub owner_display_name: String,
    pub image_url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Insertion order is chronological order.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Photo {
    pub fn new(
        id: impl Into<String>,
        owner: &Principal,
        image_url: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner.id.clone(),
            owner_display_name: owner.display_name.clone(),
            image_url: image_url.into(),
            title: title.into(),
            description,
            created_at,
            comments: Vec::new(),
        }
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    /// Remove the first comment matching both `comment_id` and `owner_id`.
    pub fn remove_comment_owned_by(&mut self, comment_id: &str, owner_id: &str) -> Option<Comment> {
        let index = self
            .comments
            .iter()
            .position(|c| c.id == comment_id && c.owner_id == owner_id)?;
        Some(self.comments.remove(index))
    }
}

/// A single comment on a photo.
///
/// `photo_id` is a back-reference for the flat comment index, not an
/// ownership link: the comment lives inside its photo's `comments` list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub photo_id: String,
    pub owner_id: String,
    pub owner_display_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        id: impl Into<String>,
        photo_id: impl Into<String>,
        owner: &Principal,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            photo_id: photo_id.into(),
            owner_id: owner.id.clone(),
            owner_display_name: owner.display_name.clone(),
            content: content.into(),
            created_at,
        }
    }

    /// Trim comment text, rejecting content that is empty afterwards.
    pub fn normalize_content(content: &str) -> Result<String, TypeError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyComment);
        }
        Ok(trimmed.to_string())
    }
}

/// Input for creating a photo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub title: String,
    /// Inline image payload, `<media-type>;base64,<body>`.
    pub image: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPhoto {
    pub fn new(title: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image: image.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trim the title and description and check required fields.
    pub fn normalized(self) -> Result<Self, TypeError> {
        let title = normalize_title(&self.title)?;
        if self.image.trim().is_empty() {
            return Err(TypeError::EmptyImage);
        }
        Ok(Self {
            title,
            image: self.image,
            description: normalize_description(self.description.as_deref()),
        })
    }
}

/// Partial update of a photo's editable fields.
///
/// `None` leaves a field untouched. An empty description clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PhotoPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: Some(description.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Validate the patch ahead of any mutation.
    pub fn normalized(self) -> Result<Self, TypeError> {
        let title = match self.title {
            Some(t) => Some(normalize_title(&t)?),
            None => None,
        };
        let description = self
            .description
            .map(|d| d.trim().to_string());
        Ok(Self { title, description })
    }

    /// Apply a normalized patch.
    pub fn apply(&self, photo: &mut Photo) {
        if let Some(title) = &self.title {
            photo.title = title.clone();
        }
        if let Some(description) = &self.description {
            photo.description = normalize_description(Some(description));
        }
    }
}

fn normalize_title(title: &str) -> Result<String, TypeError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TypeError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
