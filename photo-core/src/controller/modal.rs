//! Create-folder and upload-image dialogs.
//!
//! A modal owns its inputs until submit, hands them to the controller and
//! either closes (success) or stays open with the inputs and an error
//! message (failure).

use tracing::debug;

use crate::{
    controller::explorer::ExplorerController,
    error::{ExplorerError, ExplorerResult},
    model::resource::{FolderNode, ImageLeaf, MediaFile},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModalPhase {
    #[default]
    Open,
    Submitting,
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct CreateFolderModal {
    pub name: String,
    phase: ModalPhase,
    error: Option<String>,
}

impl CreateFolderModal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn phase(&self) -> ModalPhase {
        self.phase
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Submit button state
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.phase == ModalPhase::Open && !self.name.trim().is_empty()
    }

    pub fn cancel(&mut self) {
        self.name.clear();
        self.error = None;
        self.phase = ModalPhase::Closed;
    }

    pub async fn submit(&mut self, explorer: &ExplorerController) -> ExplorerResult<FolderNode> {
        ensure_open(self.phase)?;
        self.phase = ModalPhase::Submitting;
        self.error = None;

        let result = explorer.create_folder(&self.name).await;
        match &result {
            Ok(folder) => {
                debug!(folder_id = %folder.id, "Create-folder modal closed");
                self.name.clear();
                self.phase = ModalPhase::Closed;
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.phase = ModalPhase::Open;
            }
        }
        result
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadImageModal {
    pub name: String,
    pub file: Option<MediaFile>,
    phase: ModalPhase,
    error: Option<String>,
}

impl UploadImageModal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn phase(&self) -> ModalPhase {
        self.phase
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.phase == ModalPhase::Open
            && !self.name.trim().is_empty()
            && self.file.as_ref().is_some_and(|f| !f.is_empty())
    }

    pub fn cancel(&mut self) {
        self.name.clear();
        self.file = None;
        self.error = None;
        self.phase = ModalPhase::Closed;
    }

    pub async fn submit(&mut self, explorer: &ExplorerController) -> ExplorerResult<ImageLeaf> {
        ensure_open(self.phase)?;
        self.phase = ModalPhase::Submitting;
        self.error = None;

        let result = explorer.upload_image(self.file.clone(), &self.name).await;
        match &result {
            Ok(image) => {
                debug!(image_id = %image.id, "Upload modal closed");
                self.name.clear();
                self.file = None;
                self.phase = ModalPhase::Closed;
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.phase = ModalPhase::Open;
            }
        }
        result
    }
}

/// Only an open modal may reach the controller.
fn ensure_open(phase: ModalPhase) -> ExplorerResult<()> {
    if phase == ModalPhase::Open {
        Ok(())
    } else {
        Err(ExplorerError::validation("modal", format!("cannot submit while {phase:?}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::query_cache::QueryCache;
    use crate::config::CacheConfig;
    use crate::remote::fake::FakeRemote;
    use crate::remote::{MediaUploader, ResourceClient};

    fn controller(remote: &Arc<FakeRemote>) -> ExplorerController {
        let client: Arc<dyn ResourceClient> = remote.clone();
        let media: Arc<dyn MediaUploader> = remote.clone();
        let cache = Arc::new(QueryCache::new(Arc::clone(&client), CacheConfig::default()));
        ExplorerController::new(client, media, cache)
    }

    #[test]
    fn test_can_submit_rules() {
        let mut folder = CreateFolderModal::new();
        assert!(!folder.can_submit());
        folder.name = "Beach".to_string();
        assert!(folder.can_submit());

        let mut upload = UploadImageModal::new();
        upload.name = "sea".to_string();
        assert!(!upload.can_submit());
        upload.file = Some(MediaFile::new("sea.png", vec![1u8]));
        assert!(upload.can_submit());

        upload.cancel();
        assert_eq!(upload.phase(), ModalPhase::Closed);
        assert!(upload.file.is_none());
    }

    #[tokio::test]
    async fn test_create_folder_success_closes() {
        let remote = Arc::new(FakeRemote::new());
        let explorer = controller(&remote);
        let mut modal = CreateFolderModal::new();
        modal.name = "Beach".to_string();

        modal.submit(&explorer).await.unwrap();

        assert_eq!(modal.phase(), ModalPhase::Closed);
        assert!(modal.name.is_empty());
        assert!(modal.error().is_none());
    }

    #[tokio::test]
    async fn test_closed_modal_never_reaches_controller() {
        let remote = Arc::new(FakeRemote::new());
        let explorer = controller(&remote);

        let mut folder = CreateFolderModal::new();
        folder.name = "Beach".to_string();
        folder.submit(&explorer).await.unwrap();
        folder.name = "Beach again".to_string();
        let err = folder.submit(&explorer).await.unwrap_err();
        assert!(matches!(err, ExplorerError::Validation { .. }));
        assert_eq!(folder.phase(), ModalPhase::Closed);
        assert_eq!(remote.create_calls(), 1);

        let mut upload = UploadImageModal::new();
        upload.name = "sea".to_string();
        upload.file = Some(MediaFile::new("sea.png", vec![1u8]));
        upload.cancel();
        upload.name = "sea".to_string();
        upload.file = Some(MediaFile::new("sea.png", vec![1u8]));
        assert!(!upload.can_submit());
        assert!(upload.submit(&explorer).await.is_err());
        assert_eq!(remote.media_uploads(), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_inputs_for_retry() {
        let remote = Arc::new(FakeRemote::new());
        remote.fail_create_folder(ExplorerError::network("timeout"));
        let explorer = controller(&remote);
        let mut modal = CreateFolderModal::new();
        modal.name = "Beach".to_string();

        assert!(modal.submit(&explorer).await.is_err());
        assert_eq!(modal.phase(), ModalPhase::Open);
        assert_eq!(modal.name, "Beach");
        assert!(modal.error().is_some_and(|e| e.contains("timeout")));
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_file() {
        let remote = Arc::new(FakeRemote::new());
        remote.fail_media(Some(ExplorerError::upload("quota exceeded")));
        let explorer = controller(&remote);
        let mut modal = UploadImageModal::new();
        modal.name = "sea".to_string();
        modal.file = Some(MediaFile::new("sea.png", vec![1u8, 2]));

        assert!(modal.submit(&explorer).await.is_err());
        assert_eq!(modal.phase(), ModalPhase::Open);
        assert!(modal.file.is_some());
        assert!(modal.can_submit());

        remote.fail_media(None);
        modal.submit(&explorer).await.unwrap();
        assert_eq!(modal.phase(), ModalPhase::Closed);
        assert!(modal.file.is_none());
    }
}
