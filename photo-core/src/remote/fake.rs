//! In-memory backend used by the unit tests: call counters, per-key latency
//! and failure injection for every collaborator trait.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::{ExplorerError, ExplorerResult},
    model::resource::{
        CacheKey, FolderId, FolderNode, ImageLeaf, MediaAsset, MediaFile, NewFolder, NewImage,
        ResourceKind,
    },
    remote::{AuthClient, Credentials, MediaUploader, ResourceClient},
};

#[derive(Default)]
struct FakeState {
    folders: Vec<FolderNode>,
    images: Vec<ImageLeaf>,
    next_id: u64,

    list_calls: HashMap<CacheKey, usize>,
    latency: HashMap<CacheKey, Duration>,
    listing_failures: HashMap<CacheKey, ExplorerError>,

    create_failure: Option<ExplorerError>,
    register_failure: Option<ExplorerError>,
    media_failure: Option<ExplorerError>,
    refresh_failure: Option<ExplorerError>,
    logout_failure: Option<ExplorerError>,

    create_calls: usize,
    registrations: usize,
    media_uploads: usize,
    auth_calls: Vec<&'static str>,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(self, id: &str, name: &str, parent: Option<&str>) -> Self {
        self.state.lock().folders.push(FolderNode {
            id: id.into(),
            name: name.to_string(),
            parent_id: parent.map(FolderId::from),
        });
        self
    }

    pub fn with_image(self, id: &str, name: &str, folder: Option<&str>) -> Self {
        self.state.lock().images.push(ImageLeaf {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("https://cdn.test/{id}.png"),
            folder_id: folder.map(FolderId::from),
        });
        self
    }

    /// Add a folder directly on the "server", bypassing the client.
    pub fn insert_folder(&self, id: &str, name: &str, parent: Option<&str>) {
        self.state.lock().folders.push(FolderNode {
            id: id.into(),
            name: name.to_string(),
            parent_id: parent.map(FolderId::from),
        });
    }

    pub fn set_latency(&self, kind: ResourceKind, folder: Option<&str>, latency: Duration) {
        self.state
            .lock()
            .latency
            .insert(key(kind, folder), latency);
    }

    pub fn fail_listing(&self, kind: ResourceKind, folder: Option<&str>, err: ExplorerError) {
        self.state
            .lock()
            .listing_failures
            .insert(key(kind, folder), err);
    }

    pub fn clear_listing_failure(&self, kind: ResourceKind, folder: Option<&str>) {
        self.state.lock().listing_failures.remove(&key(kind, folder));
    }

    pub fn fail_create_folder(&self, err: ExplorerError) {
        self.state.lock().create_failure = Some(err);
    }

    pub fn fail_registration(&self, err: ExplorerError) {
        self.state.lock().register_failure = Some(err);
    }

    pub fn fail_media(&self, err: Option<ExplorerError>) {
        self.state.lock().media_failure = err;
    }

    pub fn fail_refresh(&self, err: ExplorerError) {
        self.state.lock().refresh_failure = Some(err);
    }

    pub fn fail_logout(&self, err: ExplorerError) {
        self.state.lock().logout_failure = Some(err);
    }

    pub fn list_calls(&self, kind: ResourceKind, folder: Option<&str>) -> usize {
        self.state
            .lock()
            .list_calls
            .get(&key(kind, folder))
            .copied()
            .unwrap_or(0)
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().create_calls
    }

    pub fn registrations(&self) -> usize {
        self.state.lock().registrations
    }

    pub fn media_uploads(&self) -> usize {
        self.state.lock().media_uploads
    }

    pub fn auth_calls(&self) -> Vec<&'static str> {
        self.state.lock().auth_calls.clone()
    }

    pub fn image_count(&self) -> usize {
        self.state.lock().images.len()
    }

    fn next_id(state: &mut FakeState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }

    /// Read the collection when the call starts, then wait out the latency.
    async fn listing<T, F>(&self, kind: ResourceKind, folder: Option<&FolderId>, read: F) -> ExplorerResult<Vec<T>>
    where
        F: FnOnce(&FakeState) -> Vec<T>,
    {
        let cache_key = CacheKey::new(kind, folder.cloned());
        let (result, latency) = {
            let mut state = self.state.lock();
            *state.list_calls.entry(cache_key.clone()).or_default() += 1;
            let result = match state.listing_failures.get(&cache_key) {
                Some(err) => Err(err.clone()),
                None => Ok(read(&*state)),
            };
            (result, state.latency.get(&cache_key).copied())
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

fn key(kind: ResourceKind, folder: Option<&str>) -> CacheKey {
    CacheKey::new(kind, folder.map(FolderId::from))
}

#[async_trait]
impl ResourceClient for FakeRemote {
    async fn list_folders(&self, parent: Option<&FolderId>) -> ExplorerResult<Vec<FolderNode>> {
        self.listing(ResourceKind::Folders, parent, |state| {
            state
                .folders
                .iter()
                .filter(|node| node.parent_id.as_ref() == parent)
                .cloned()
                .collect()
        })
        .await
    }

    async fn list_images(&self, folder: Option<&FolderId>) -> ExplorerResult<Vec<ImageLeaf>> {
        self.listing(ResourceKind::Images, folder, |state| {
            state
                .images
                .iter()
                .filter(|image| image.folder_id.as_ref() == folder)
                .cloned()
                .collect()
        })
        .await
    }

    async fn create_folder(&self, folder: &NewFolder) -> ExplorerResult<FolderNode> {
        let mut state = self.state.lock();
        state.create_calls += 1;
        if let Some(err) = state.create_failure.clone() {
            return Err(err);
        }

        let node = FolderNode {
            id: FolderId::new(Self::next_id(&mut state, "folder")),
            name: folder.name.clone(),
            parent_id: folder.parent.clone(),
        };
        state.folders.push(node.clone());
        Ok(node)
    }

    async fn register_image(&self, image: &NewImage) -> ExplorerResult<ImageLeaf> {
        let mut state = self.state.lock();
        if let Some(err) = state.register_failure.clone() {
            return Err(err);
        }

        state.registrations += 1;
        let leaf = ImageLeaf {
            id: Self::next_id(&mut state, "image"),
            name: image.name.clone(),
            url: image.url.clone(),
            folder_id: image.folder.clone(),
        };
        state.images.push(leaf.clone());
        Ok(leaf)
    }
}

#[async_trait]
impl MediaUploader for FakeRemote {
    async fn upload(&self, file: &MediaFile) -> ExplorerResult<MediaAsset> {
        let mut state = self.state.lock();
        if let Some(err) = state.media_failure.clone() {
            return Err(err);
        }

        state.media_uploads += 1;
        let public_id = Self::next_id(&mut state, "media");
        Ok(MediaAsset {
            secure_url: format!("https://cdn.test/{public_id}/{}", file.file_name),
            public_id,
        })
    }
}

#[async_trait]
impl AuthClient for FakeRemote {
    async fn signup(&self, _credentials: &Credentials) -> ExplorerResult<()> {
        self.state.lock().auth_calls.push("signup");
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> ExplorerResult<()> {
        self.state.lock().auth_calls.push("login");
        if credentials.password == "wrong-password" {
            return Err(ExplorerError::NotAuthenticated);
        }
        Ok(())
    }

    async fn refresh(&self) -> ExplorerResult<()> {
        let mut state = self.state.lock();
        state.auth_calls.push("refresh");
        state.refresh_failure.clone().map_or(Ok(()), Err)
    }

    async fn logout(&self) -> ExplorerResult<()> {
        let mut state = self.state.lock();
        state.auth_calls.push("logout");
        state.logout_failure.clone().map_or(Ok(()), Err)
    }
}
