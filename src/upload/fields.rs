//! Upload request fields and the allow-list filter applied to them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller-supplied fields an upload request may carry
pub const ALLOWED_FIELDS: [&str; 7] = [
    "stash",
    "filekey",
    "filename",
    "comment",
    "text",
    "watchlist",
    "ignorewarnings",
];

pub const ACTION_UPLOAD: &str = "upload";

/// Field name the binary content is sent under
pub const FILE_FIELD: &str = "file";

/// Field name the authorization token is sent under
pub const TOKEN_FIELD: &str = "token";

/// An ordered mapping of request field names to values
///
/// Flags follow the API convention: present means true, absent means false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadFields(BTreeMap<String, String>);

impl UploadFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set (`true`) or clear (`false`) a flag field
    pub fn flag(mut self, key: impl Into<String>, enabled: bool) -> Self {
        let key = key.into();
        if enabled {
            self.0.insert(key, "1".to_string());
        } else {
            self.0.remove(&key);
        }
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether the field is present with a non-empty value
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drop every field outside [`ALLOWED_FIELDS`]
    pub fn filtered(mut self) -> Self {
        self.0.retain(|key, _| ALLOWED_FIELDS.contains(&key.as_str()));
        self
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts
    pub fn merged(mut self, other: &UploadFields) -> Self {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// Whether the request names its target, either by filename or as a stash upload
    pub fn has_target(&self) -> bool {
        self.has("filename") || self.has("stash")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UploadFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for UploadFields {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl IntoIterator for UploadFields {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Filter caller fields and merge them over the client's defaults with
/// `action=upload` forced.
pub fn prepare_fields(defaults: &UploadFields, fields: UploadFields) -> UploadFields {
    defaults
        .clone()
        .merged(&fields.filtered())
        .set("action", ACTION_UPLOAD)
}
