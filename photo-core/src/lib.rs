pub mod error;

pub mod config;

pub mod cache {
    pub mod query_cache;
    pub use query_cache::{CacheStatsSnapshot, CachedCollection, Listing, QueryCache};
}

pub mod controller {
    pub mod explorer;
    pub use explorer::{ExplorerController, LoadOutcome};

    pub mod modal;
    pub use modal::{CreateFolderModal, ModalPhase, UploadImageModal};
}

pub mod model {
    pub mod navigation;
    pub use navigation::{BreadcrumbEntry, NavigationState};

    pub mod resource;
    pub use resource::{
        CacheKey, FolderId, FolderNode, ImageLeaf, MediaAsset, MediaFile, NewFolder, NewImage,
        ResourceKind,
    };
}

pub mod view {
    pub mod snapshots;
    pub use snapshots::*;
}

pub mod auth {
    pub mod session;
    pub use session::{AuthSession, AuthState};
}

pub mod remote;

pub mod logging;
pub use logging::Logger;

pub use error::{ExplorerError, ExplorerResult};

pub use controller::ExplorerController;
