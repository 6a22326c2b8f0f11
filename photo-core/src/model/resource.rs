//! ``src/model/resource.rs``
//! ============================================================================
//! # Remote resources: folders, images and the keys that cache them
//!
//! Wire shapes follow the backend's JSON (`_id`, `parent`, `folder`); the
//! Rust names follow the explorer's vocabulary.

use std::fmt;

use bytes::Bytes;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Opaque, server-assigned folder identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(CompactString);

impl FolderId {
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FolderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A folder in the user's tree. `parent_id == None` means root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    #[serde(rename = "_id", alias = "id")]
    pub id: FolderId,

    pub name: String,

    #[serde(rename = "parent", default)]
    pub parent_id: Option<FolderId>,
}

/// An image stored at the media host and registered in one folder (or root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLeaf {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    pub name: String,

    pub url: String,

    #[serde(rename = "folder", default)]
    pub folder_id: Option<FolderId>,
}

/// Resource collections the explorer lists per folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Folders,
    Images,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'_ str = match self {
            Self::Folders => "folders",
            Self::Images => "images",
        };

        write!(f, "{s}")
    }
}

/// Exact-match cache key: one collection of one kind in one folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub folder: Option<FolderId>,
}

impl CacheKey {
    #[must_use]
    pub const fn new(kind: ResourceKind, folder: Option<FolderId>) -> Self {
        Self { kind, folder }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.folder {
            Some(id) => write!(f, "{}:{id}", self.kind),
            None => write!(f, "{}:<root>", self.kind),
        }
    }
}

/// Body of `POST /api/folders`.
#[derive(Debug, Clone, Serialize)]
pub struct NewFolder {
    pub name: String,
    pub parent: Option<FolderId>,
}

/// Body of the image registration call.
#[derive(Debug, Clone, Serialize)]
pub struct NewImage {
    pub name: String,
    pub url: String,
    pub folder: Option<FolderId>,
    pub public_id: String,
}

/// A local binary picked for upload.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the media host returns for a stored binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaAsset {
    pub secure_url: String,
    pub public_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_wire_shape() {
        let nodes: Vec<FolderNode> = serde_json::from_str(
            r#"[
                {"_id": "f1", "name": "Vacation", "parent": null, "user": "u1"},
                {"_id": "f2", "name": "Beach", "parent": "f1"},
                {"id": "f3", "name": "Loose"}
            ]"#,
        )
        .unwrap();

        assert_eq!(nodes[0].parent_id, None);
        assert_eq!(nodes[1].parent_id, Some(FolderId::from("f1")));
        assert_eq!(nodes[2].id.as_str(), "f3");
    }

    #[test]
    fn test_new_image_body_uses_backend_field_names() {
        let body = NewImage {
            name: "sunset.png".into(),
            url: "https://cdn/x.png".into(),
            folder: None,
            public_id: "x".into(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["folder"], serde_json::Value::Null);
        assert_eq!(json["public_id"], "x");
    }

    #[test]
    fn test_cache_key_display() {
        assert_eq!(
            CacheKey::new(ResourceKind::Images, None).to_string(),
            "images:<root>"
        );
        assert_eq!(
            CacheKey::new(ResourceKind::Folders, Some("f1".into())).to_string(),
            "folders:f1"
        );
    }
}
