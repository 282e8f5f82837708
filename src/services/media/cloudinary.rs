//! Cloudinary upload client.
//!
//! Uses the signed upload endpoint `POST /v1_1/{cloud}/auto/upload` so a
//! single call handles both videos and images.

use super::{MediaError, MediaResult, MediaUploader, UploadedMedia};
use crate::config::CloudinaryConfig;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

#[derive(Clone)]
pub struct CloudinaryUploader {
    client: reqwest::Client,
    config: CloudinaryConfig,
    api_base: String,
}

/// Subset of the upload response this service relies on.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    url: String,
    secure_url: String,
    resource_type: String,
    bytes: u64,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Point the client at a different API host (proxies, regional endpoints).
    pub fn with_api_base(config: CloudinaryConfig, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1_1/{}/auto/upload", self.api_base, self.config.cloud_name)
    }
}

/// Hex SHA-256 over the sorted signed parameters followed by the secret.
///
/// `timestamp` is the only signed parameter this client sends.
pub(crate) fn sign(timestamp: i64, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("timestamp={}{}", timestamp, api_secret));
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    #[instrument(skip(self))]
    async fn upload(&self, path: &Path) -> MediaResult<UploadedMedia> {
        let file = File::open(path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                MediaError::NotFound(path.display().to_string())
            } else {
                MediaError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = Utc::now().timestamp();
        let form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", sign(timestamp, &self.config.api_secret))
            .text("signature_algorithm", "sha256")
            .part(
                "file",
                Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(file)), len)
                    .file_name(file_name),
            );

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("upload failed").to_string(),
            };
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response.json().await?;
        debug!("uploaded {} as {}", path.display(), body.public_id);

        Ok(UploadedMedia {
            public_id: body.public_id,
            url: body.url,
            secure_url: body.secure_url,
            resource_type: body.resource_type,
            bytes: body.bytes,
            duration: body.duration,
        })
    }
}
