//! ``src/remote/media.rs``
//! Media host collaborator: stores a binary, returns its URL and public id.

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use tracing::{info, instrument, warn};

use crate::{
    config::MediaConfig,
    error::{ExplorerError, ExplorerResult},
    model::resource::{MediaAsset, MediaFile},
};

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, file: &MediaFile) -> ExplorerResult<MediaAsset>;
}

/// Unsigned multipart upload to Cloudinary (`file` + `upload_preset`).
#[derive(Debug, Clone)]
pub struct CloudinaryUploader {
    client: Client,
    endpoint: String,
    preset: String,
}

impl CloudinaryUploader {
    pub fn new(config: &MediaConfig) -> ExplorerResult<Self> {
        if config.cloud_name.is_empty() || config.upload_preset.is_empty() {
            return Err(ExplorerError::Config {
                reason: "media.cloud_name and media.upload_preset must be set".to_string(),
            });
        }

        Ok(Self {
            client: Client::new(),
            endpoint: config.upload_endpoint(),
            preset: config.upload_preset.clone(),
        })
    }

    fn form(&self, file: &MediaFile) -> ExplorerResult<Form> {
        let mut part = Part::stream(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(mime) = &file.content_type {
            part = part.mime_str(mime).map_err(ExplorerError::upload)?;
        }

        Ok(Form::new()
            .part("file", part)
            .text("upload_preset", self.preset.clone()))
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    // Every failure here is an upload failure, including 401s from the host:
    // the backend session is not involved yet.
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn upload(&self, file: &MediaFile) -> ExplorerResult<MediaAsset> {
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(self.form(file)?)
            .send()
            .await
            .map_err(ExplorerError::upload)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                marker = "MEDIA_UPLOAD",
                status = status.as_u16(),
                body = %body,
                "Media host rejected upload"
            );
            return Err(ExplorerError::upload(format!("media host returned {status}")));
        }

        let asset: MediaAsset = response.json().await.map_err(ExplorerError::upload)?;
        info!(
            marker = "MEDIA_UPLOAD",
            public_id = %asset.public_id,
            "Media stored"
        );
        Ok(asset)
    }
}
