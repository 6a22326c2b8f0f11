//! src/view/snapshots.rs
//! ============================================================
//! Immutable snapshots of the explorer, built under the
//! controller lock and published after it is released.
//!
//! Every snapshot is `Clone + Send + Sync` and holds no interior
//! mutability, so a view can keep one for as long as it likes
//! without blocking the controller.

use std::fmt;
use std::sync::Arc;

use crate::model::navigation::BreadcrumbEntry;
use crate::model::resource::{FolderId, FolderNode, ImageLeaf};

/// Load status of the current location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocationStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Failed load; message is shown until dismissed or retried.
    Error(String),
}

impl LocationStatus {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading => f.write_str("loading"),
            Self::Ready => f.write_str("ready"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Everything a view needs to render one frame of the explorer.
#[derive(Debug, Clone, Default)]
pub struct ExplorerSnapshot {
    /// `None` at root
    pub current_folder: Option<FolderId>,

    pub breadcrumbs: Arc<[BreadcrumbEntry]>,

    /// Child folders of the current location
    pub folders: Arc<[FolderNode]>,

    /// All images of the current location, unfiltered
    pub images: Arc<[ImageLeaf]>,

    /// Raw search text; empty means no filter
    pub search: String,

    pub status: LocationStatus,
}

impl ExplorerSnapshot {
    /// Images of the current folder that match the search text.
    /// Folders are never filtered.
    pub fn visible_images(&self) -> impl Iterator<Item = &ImageLeaf> {
        let needle = self.search.to_lowercase();
        self.images
            .iter()
            .filter(move |image| matches_search(&image.name, &needle))
    }

    /// Breadcrumb bar text: `root / Vacation / Beach`
    #[must_use]
    pub fn path(&self) -> String {
        self.breadcrumbs
            .iter()
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    #[must_use]
    pub fn is_at_root(&self) -> bool {
        self.current_folder.is_none()
    }
}

/// Case-insensitive substring match; `needle` must already be lowercase.
/// An empty needle matches everything.
#[must_use]
pub fn matches_search(name: &str, needle: &str) -> bool {
    needle.is_empty() || name.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> ImageLeaf {
        ImageLeaf {
            id: name.to_string(),
            name: name.to_string(),
            url: format!("https://cdn.test/{name}"),
            folder_id: None,
        }
    }

    fn snapshot_with(search: &str) -> ExplorerSnapshot {
        ExplorerSnapshot {
            images: Arc::from(vec![image("Sunset.png"), image("beach.jpg"), image("SUNRISE.gif")]),
            folders: Arc::from(vec![FolderNode {
                id: "f1".into(),
                name: "Vacation".to_string(),
                parent_id: None,
            }]),
            search: search.to_string(),
            ..ExplorerSnapshot::default()
        }
    }

    #[test]
    fn test_empty_search_shows_all_images() {
        let snapshot = snapshot_with("");
        assert_eq!(snapshot.visible_images().count(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let snapshot = snapshot_with("SUN");
        let names: Vec<_> = snapshot.visible_images().map(|i| i.name.as_str()).collect();

        assert_eq!(names, vec!["Sunset.png", "SUNRISE.gif"]);
        // folders are untouched by search
        assert_eq!(snapshot.folders.len(), 1);
    }

    #[test]
    fn test_status_error_message() {
        let status = LocationStatus::Error("Network failure: timeout".to_string());
        assert_eq!(status.error(), Some("Network failure: timeout"));
        assert!(!status.is_loading());
        assert_eq!(LocationStatus::Ready.error(), None);
    }
}
