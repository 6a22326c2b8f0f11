//! ``src/remote/client.rs``
//! ============================================================================
//! # Remote resource client
//!
//! `ResourceClient` and `AuthClient` are the seams the explorer and the auth
//! session depend on. `HttpClient` implements both against the photo-storage
//! backend; the session travels in a cookie jar owned by the reqwest client.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use crate::{
    config::ApiConfig,
    error::{ExplorerError, ExplorerResult},
    model::resource::{FolderId, FolderNode, ImageLeaf, NewFolder, NewImage},
};

/// Folder and image collections plus the two mutations the explorer issues.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn list_folders(&self, parent: Option<&FolderId>) -> ExplorerResult<Vec<FolderNode>>;

    async fn list_images(&self, folder: Option<&FolderId>) -> ExplorerResult<Vec<ImageLeaf>>;

    async fn create_folder(&self, folder: &NewFolder) -> ExplorerResult<FolderNode>;

    async fn register_image(&self, image: &NewImage) -> ExplorerResult<ImageLeaf>;
}

/// Email/password pair sent to the auth endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn signup(&self, credentials: &Credentials) -> ExplorerResult<()>;

    async fn login(&self, credentials: &Credentials) -> ExplorerResult<()>;

    /// Exchange the refresh cookie for a new session.
    async fn refresh(&self) -> ExplorerResult<()>;

    async fn logout(&self) -> ExplorerResult<()>;
}

/// reqwest-backed client for the `/api` routes.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> ExplorerResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExplorerError::Config {
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/api/{route}", self.base_url)
    }

    async fn send(&self, route: &'static str, request: RequestBuilder) -> ExplorerResult<Response> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(
                marker = "REMOTE_CALL",
                route,
                error = %e,
                "Transport failure"
            );
            ExplorerError::network(e)
        })?;

        debug!(
            marker = "REMOTE_CALL",
            route,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis(),
            "Remote call completed"
        );

        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        route: &'static str,
        query: &[(&str, &str)],
    ) -> ExplorerResult<T> {
        let response = self
            .send(route, self.client.get(self.url(route)).query(query))
            .await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        route: &'static str,
        body: &B,
    ) -> ExplorerResult<T> {
        let response = self
            .send(route, self.client.post(self.url(route)).json(body))
            .await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_empty(&self, route: &'static str, request: RequestBuilder) -> ExplorerResult<()> {
        self.send(route, request).await.map(|_| ())
    }
}

/// Map non-success statuses onto the explorer's error taxonomy.
async fn check_status(response: Response) -> ExplorerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ExplorerError::NotAuthenticated);
    }

    let message = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(ExplorerError::network(format!("server error {status}: {message}")))
    } else {
        Err(ExplorerError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Root is expressed by omitting the query parameter.
fn folder_query<'a>(param: &'a str, folder: Option<&'a FolderId>) -> Vec<(&'a str, &'a str)> {
    folder
        .map(|id| vec![(param, id.as_str())])
        .unwrap_or_default()
}

#[async_trait]
impl ResourceClient for HttpClient {
    #[instrument(skip(self))]
    async fn list_folders(&self, parent: Option<&FolderId>) -> ExplorerResult<Vec<FolderNode>> {
        self.get_json("folders", &folder_query("parent", parent))
            .await
    }

    #[instrument(skip(self))]
    async fn list_images(&self, folder: Option<&FolderId>) -> ExplorerResult<Vec<ImageLeaf>> {
        self.get_json("images", &folder_query("folder", folder))
            .await
    }

    #[instrument(skip(self, folder), fields(name = %folder.name))]
    async fn create_folder(&self, folder: &NewFolder) -> ExplorerResult<FolderNode> {
        self.post_json("folders", folder).await
    }

    #[instrument(skip(self, image), fields(name = %image.name, public_id = %image.public_id))]
    async fn register_image(&self, image: &NewImage) -> ExplorerResult<ImageLeaf> {
        self.post_json("images/upload", image).await
    }
}

#[async_trait]
impl AuthClient for HttpClient {
    async fn signup(&self, credentials: &Credentials) -> ExplorerResult<()> {
        let route = "auth/signup";
        self.post_empty(route, self.client.post(self.url(route)).json(credentials))
            .await
    }

    async fn login(&self, credentials: &Credentials) -> ExplorerResult<()> {
        let route = "auth/login";
        self.post_empty(route, self.client.post(self.url(route)).json(credentials))
            .await
    }

    async fn refresh(&self) -> ExplorerResult<()> {
        let route = "auth/refresh";
        self.post_empty(route, self.client.post(self.url(route))).await
    }

    async fn logout(&self) -> ExplorerResult<()> {
        let route = "auth/logout";
        self.post_empty(route, self.client.post(self.url(route))).await
    }
}
