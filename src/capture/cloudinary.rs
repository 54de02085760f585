//! Unsigned image uploads to Cloudinary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use super::capabilities::{CaptureError, MediaUploader};
use crate::record::ImageData;
use crate::settings::{fields, Settings};

pub const DEFAULT_CLOUDINARY_ENDPOINT: &str = "https://api.cloudinary.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub upload_preset: String,
}

impl MediaConfig {
    /// None unless both the cloud name and the upload preset are set.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        Some(Self {
            cloud_name: settings.get(fields::CLOUD_NAME)?.to_string(),
            upload_preset: settings.get(fields::UPLOAD_PRESET)?.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Deserialize)]
struct UploadErrorResponse {
    error: UploadErrorBody,
}

#[derive(Deserialize)]
struct UploadErrorBody {
    message: String,
}

pub struct CloudinaryUploader {
    client: Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryUploader {
    pub fn new(
        config: MediaConfig,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, CaptureError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CaptureError::UploadFailed(e.to_string()))?;
        Ok(Self {
            client,
            upload_url: format!(
                "{}/v1_1/{}/image/upload",
                endpoint.trim_end_matches('/'),
                urlencoding::encode(&config.cloud_name)
            ),
            upload_preset: config.upload_preset,
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, image: &ImageData) -> Result<String, CaptureError> {
        let form = [
            ("file", image.to_data_url()),
            ("upload_preset", self.upload_preset.clone()),
        ];
        debug!("Uploading {} bytes to {}", image.bytes.len(), self.upload_url);

        let response = self
            .client
            .post(&self.upload_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| CaptureError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<UploadErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            return Err(CaptureError::UploadFailed(format!(
                "status {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| CaptureError::UploadFailed(e.to_string()))?;
        body.secure_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CaptureError::UploadFailed("response has no secure_url".into()))
    }
}

/// Builds a media uploader out of settings, or nothing if they are incomplete.
pub trait UploaderConnector: Send + Sync {
    fn connect(&self, settings: &Settings) -> Option<Arc<dyn MediaUploader>>;
}

pub struct CloudinaryConnector {
    endpoint: String,
    timeout: Duration,
}

impl CloudinaryConnector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

impl Default for CloudinaryConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CLOUDINARY_ENDPOINT, Duration::from_secs(30))
    }
}

impl UploaderConnector for CloudinaryConnector {
    fn connect(&self, settings: &Settings) -> Option<Arc<dyn MediaUploader>> {
        let config = MediaConfig::from_settings(settings)?;
        match CloudinaryUploader::new(config, &self.endpoint, self.timeout) {
            Ok(uploader) => Some(Arc::new(uploader)),
            Err(e) => {
                error!("Could not set up the media uploader: {}", e);
                None
            }
        }
    }
}
