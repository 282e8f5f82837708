//! Represents an uploaded video and the projections served to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single uploaded video.
///
/// The media itself lives with the media upload service; this record only
/// stores the URLs it handed back plus user-editable metadata.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// User who published the video.
    #[serde(rename = "owner")]
    pub owner_id: Uuid,

    pub title: String,

    pub description: String,

    /// Length in seconds as reported by the media service (0 if unknown).
    pub duration: f64,

    /// Secure URL of the uploaded video file.
    pub video_file: String,

    /// Secure URL of the uploaded thumbnail image.
    pub thumbnail: String,

    /// Whether the video is visible to other users.
    pub is_published: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Listing projection: no file URL, no ownership data.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: f64,
}

/// Detail projection including the view count.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Number of distinct users whose watch history contains this video.
    pub views: i64,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
}
