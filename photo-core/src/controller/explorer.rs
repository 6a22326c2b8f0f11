//! src/controller/explorer.rs
//! ============================================================================
//! # `ExplorerController`: navigation, listing and mutations
//!
//! The controller owns the `NavigationState`, the search filter and the load
//! status of the current location. It reads collections through the shared
//! `QueryCache`, issues mutations through the remote collaborators and
//! publishes an immutable `ExplorerSnapshot` after every state change.
//!
//! Every location load carries a `LocationToken`. Results are applied only
//! while the token is still current, so a slow response for a folder the
//! user already left never overwrites the newer location.

use std::sync::Arc;

use futures::future::try_join;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    cache::query_cache::QueryCache,
    error::{ExplorerError, ExplorerResult},
    model::{
        navigation::NavigationState,
        resource::{
            FolderId, FolderNode, ImageLeaf, MediaFile, NewFolder, NewImage, ResourceKind,
        },
    },
    remote::{MediaUploader, ResourceClient},
    view::snapshots::{ExplorerSnapshot, LocationStatus},
};

/// Identifies one load of one location.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationToken {
    sequence: u64,
    folder: Option<FolderId>,
}

/// Result of a command that (re)loads the current location.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The load finished and its collections are now current.
    Applied(Arc<ExplorerSnapshot>),

    /// The user moved on before the load finished; its result was dropped.
    Superseded,

    /// Nothing to load (`back` at root).
    Unchanged,
}

impl LoadOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

struct ExplorerState {
    navigation: NavigationState,
    search: String,
    status: LocationStatus,
    folders: Arc<[FolderNode]>,
    images: Arc<[ImageLeaf]>,
    token: LocationToken,
}

impl ExplorerState {
    fn new() -> Self {
        Self {
            navigation: NavigationState::new(),
            search: String::new(),
            status: LocationStatus::Idle,
            folders: Arc::from([]),
            images: Arc::from([]),
            token: LocationToken {
                sequence: 0,
                folder: None,
            },
        }
    }

    fn snapshot(&self) -> ExplorerSnapshot {
        ExplorerSnapshot {
            current_folder: self.navigation.current_folder().cloned(),
            breadcrumbs: Arc::from(self.navigation.breadcrumbs()),
            folders: Arc::clone(&self.folders),
            images: Arc::clone(&self.images),
            search: self.search.clone(),
            status: self.status.clone(),
        }
    }

    /// Start a new load of whatever location navigation now points at.
    fn next_token(&mut self) -> LocationToken {
        self.token = LocationToken {
            sequence: self.token.sequence + 1,
            folder: self.navigation.current_folder().cloned(),
        };
        self.token.clone()
    }
}

pub struct ExplorerController {
    cache: Arc<QueryCache>,
    client: Arc<dyn ResourceClient>,
    media: Arc<dyn MediaUploader>,
    state: Mutex<ExplorerState>,
    snapshots: watch::Sender<Arc<ExplorerSnapshot>>,
}

impl ExplorerController {
    pub fn new(
        client: Arc<dyn ResourceClient>,
        media: Arc<dyn MediaUploader>,
        cache: Arc<QueryCache>,
    ) -> Self {
        let state = ExplorerState::new();
        let (snapshots, _) = watch::channel(Arc::new(state.snapshot()));

        Self {
            cache,
            client,
            media,
            state: Mutex::new(state),
            snapshots,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<ExplorerSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receive every snapshot published from now on
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ExplorerSnapshot>> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn current_folder(&self) -> Option<FolderId> {
        self.state.lock().navigation.current_folder().cloned()
    }

    fn publish(&self, state: &ExplorerState) -> Arc<ExplorerSnapshot> {
        let snapshot = Arc::new(state.snapshot());
        self.snapshots.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    fn update<R>(&self, f: impl FnOnce(&mut ExplorerState) -> R) -> R {
        let mut state = self.state.lock();
        let out = f(&mut state);
        self.publish(&state);
        out
    }

    // ------------------------------------------------------------------
    // Location loading
    // ------------------------------------------------------------------

    /// Load the root location at session start.
    pub async fn start(&self) -> ExplorerResult<LoadOutcome> {
        self.refresh().await
    }

    /// Enter a child folder of the current location.
    #[instrument(skip(self))]
    pub async fn open(&self, id: FolderId, name: &str) -> ExplorerResult<LoadOutcome> {
        let token = self.update(|state| {
            state.navigation.open_folder(id, name);
            state.folders = Arc::from([]);
            state.images = Arc::from([]);
            state.status = LocationStatus::Loading;
            state.next_token()
        });

        self.load(token).await
    }

    /// Go up one level. At root this does nothing and performs no I/O.
    #[instrument(skip(self))]
    pub async fn back(&self) -> ExplorerResult<LoadOutcome> {
        let token = {
            let mut state = self.state.lock();
            if !state.navigation.go_back() {
                debug!("Back at root ignored");
                return Ok(LoadOutcome::Unchanged);
            }

            state.folders = Arc::from([]);
            state.images = Arc::from([]);
            state.status = LocationStatus::Loading;
            let token = state.next_token();
            self.publish(&state);
            token
        };

        self.load(token).await
    }

    /// Re-load the current location, keeping the old listings on screen
    /// until the new ones arrive.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> ExplorerResult<LoadOutcome> {
        let token = self.update(|state| {
            state.status = LocationStatus::Loading;
            state.next_token()
        });

        self.load(token).await
    }

    async fn load(&self, token: LocationToken) -> ExplorerResult<LoadOutcome> {
        let folder = token.folder.as_ref();
        let result = try_join(self.cache.folders(folder), self.cache.images(folder)).await;

        let mut state = self.state.lock();
        if state.token != token {
            debug!(
                marker = "EXPLORER_COMMAND",
                operation_type = "load_superseded",
                sequence = token.sequence,
                current = state.token.sequence,
                "Dropping result for a location the user already left"
            );
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok((folders, images)) => {
                state.folders = folders;
                state.images = images;
                state.status = LocationStatus::Ready;
                debug!(
                    marker = "EXPLORER_COMMAND",
                    operation_type = "load_applied",
                    folder = ?token.folder,
                    folders = state.folders.len(),
                    images = state.images.len(),
                    "Location loaded"
                );
                Ok(LoadOutcome::Applied(self.publish(&state)))
            }
            Err(e) => {
                warn!(
                    marker = "EXPLORER_COMMAND",
                    operation_type = e.operation_type(),
                    folder = ?token.folder,
                    error = %e,
                    "Location load failed"
                );
                state.status = LocationStatus::Error(e.to_string());
                self.publish(&state);
                Err(e)
            }
        }
    }

    /// Re-load `folder` if the user is still looking at it. Failures end up
    /// in the location status only; the mutation itself already succeeded.
    async fn refresh_if_current(&self, folder: Option<&FolderId>) {
        if self.current_folder().as_ref() != folder {
            debug!(folder = ?folder, "Mutated folder is no longer current, skipping refresh");
            return;
        }

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after mutation failed");
        }
    }

    // ------------------------------------------------------------------
    // Local-only commands
    // ------------------------------------------------------------------

    /// Filter the current folder's images by name. Never touches the network.
    pub fn search(&self, text: &str) -> Arc<ExplorerSnapshot> {
        let mut state = self.state.lock();
        text.clone_into(&mut state.search);
        self.publish(&state)
    }

    /// Clear a load error. Only `Error -> Idle`; other states are left alone.
    pub fn dismiss_error(&self) -> Arc<ExplorerSnapshot> {
        let mut state = self.state.lock();
        if matches!(state.status, LocationStatus::Error(_)) {
            state.status = LocationStatus::Idle;
        }
        self.publish(&state)
    }

    /// Drop every cached collection and return to an empty root.
    pub fn end_session(&self) {
        self.cache.invalidate_all();
        self.update(|state| {
            state.navigation.reset();
            state.search.clear();
            state.folders = Arc::from([]);
            state.images = Arc::from([]);
            state.status = LocationStatus::Idle;
            state.next_token();
        });
        info!(marker = "EXPLORER_COMMAND", operation_type = "end_session", "Explorer session ended");
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create a folder under the current location.
    #[instrument(skip(self))]
    pub async fn create_folder(&self, name: &str) -> ExplorerResult<FolderNode> {
        let name = required("name", name)?;
        let parent = self.current_folder();

        let request = NewFolder {
            name,
            parent: parent.clone(),
        };
        let created = self.client.create_folder(&request).await.inspect_err(|e| {
            warn!(
                marker = "EXPLORER_COMMAND",
                operation_type = e.operation_type(),
                error = %e,
                "Folder creation failed"
            );
        })?;

        info!(
            marker = "EXPLORER_COMMAND",
            operation_type = "create_folder",
            folder_id = %created.id,
            parent = ?parent,
            "Folder created"
        );

        self.cache.invalidate(ResourceKind::Folders, parent.as_ref());
        self.refresh_if_current(parent.as_ref()).await;
        Ok(created)
    }

    /// Upload a binary to the media host, then register it in the current
    /// folder.
    #[instrument(skip(self, file))]
    pub async fn upload_image(&self, file: Option<MediaFile>, name: &str) -> ExplorerResult<ImageLeaf> {
        let name = required("name", name)?;
        let file = file
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ExplorerError::validation("file", "select an image to upload"))?;
        let folder = self.current_folder();

        let asset = self.media.upload(&file).await.map_err(|e| {
            warn!(
                marker = "EXPLORER_COMMAND",
                operation_type = "media_upload",
                error = %e,
                "Media upload failed, nothing registered"
            );
            match e {
                ExplorerError::Upload { .. } => e,
                other => ExplorerError::upload(other),
            }
        })?;

        let request = NewImage {
            name,
            url: asset.secure_url,
            folder: folder.clone(),
            public_id: asset.public_id,
        };
        let image = self.client.register_image(&request).await.map_err(|e| {
            warn!(
                marker = "EXPLORER_COMMAND",
                operation_type = "image_registration",
                public_id = %request.public_id,
                error = %e,
                "Media stored but image not registered"
            );
            ExplorerError::registration(request.public_id.clone(), e)
        })?;

        info!(
            marker = "EXPLORER_COMMAND",
            operation_type = "upload_image",
            image_id = %image.id,
            folder = ?folder,
            "Image uploaded"
        );

        self.cache.invalidate(ResourceKind::Images, folder.as_ref());
        self.refresh_if_current(folder.as_ref()).await;
        Ok(image)
    }
}

impl std::fmt::Debug for ExplorerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerController")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Trimmed, non-empty user input.
fn required(field: &str, value: &str) -> ExplorerResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ExplorerError::validation(field, "must not be empty"));
    }
    Ok(value.to_string())
}
