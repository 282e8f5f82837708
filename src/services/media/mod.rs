//! Media upload service abstraction.
//!
//! Handlers never talk to a concrete store. They hand a spooled local file
//! to a `MediaUploader` and persist whatever URL comes back.

pub mod cloudinary;
pub mod local;
pub mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{io, path::Path};
use thiserror::Error;

pub use cloudinary::CloudinaryUploader;
pub use local::LocalMediaStore;

/// What the media service reports back after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedMedia {
    /// Identifier inside the media service.
    pub public_id: String,
    /// Plain URL.
    pub url: String,
    /// HTTPS URL when the service distinguishes one; otherwise same as `url`.
    pub secure_url: String,
    /// `video`, `image` or `raw`.
    pub resource_type: String,
    /// Stored size in bytes.
    pub bytes: u64,
    /// Length in seconds for time-based media.
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media path `{0}` is invalid")]
    InvalidPath(String),
    #[error("media `{0}` not found")]
    NotFound(String),
    #[error("media service rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Uploads a local file to a media host.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload the file at `path`. The file is left in place; the caller owns it.
    async fn upload(&self, path: &Path) -> MediaResult<UploadedMedia>;
}

/// Classify a file by extension the way media hosts bucket resources.
pub(crate) fn resource_type_for(path: &Path) -> &'static str {
    match mime_guess::from_path(path).first() {
        Some(mime) if mime.type_() == mime_guess::mime::VIDEO => "video",
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => "image",
        _ => "raw",
    }
}
