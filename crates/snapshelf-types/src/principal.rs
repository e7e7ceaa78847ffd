use serde::{Deserialize, Serialize};

/// The acting user, as handed over by the authentication layer per call.
///
/// The store never looks identities up; it only compares `id` against the
/// owner recorded on a photo or comment, and copies `display_name` onto new
/// records.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub display_name: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Strict equality against a recorded owner id. No admin override exists.
    pub fn owns(&self, owner_id: &str) -> bool {
        self.id == owner_id
    }
}
